//! Random names for throwaway records

use rand::distributions::{Alphanumeric, DistString};
use rand::Rng;

/// Random mixed-case alphanumeric string of `len` characters
pub fn gen_alphanumeric(len: usize) -> String {
    Alphanumeric.sample_string(&mut rand::thread_rng(), len)
}

/// `test-<context>-<4 lowercase alphanumerics>`, a valid name on every provider type
pub fn random_vm_name(context: &str) -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..4)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    format!("test-{}-{}", context, suffix)
}
