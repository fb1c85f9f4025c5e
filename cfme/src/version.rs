//! Appliance version parsing and comparison

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Appliance version: a dotted release (`5.9.0.22`) or the upstream build,
/// which compares greater than every release.
#[derive(Debug, Clone, Eq)]
pub enum Version {
    Release(Vec<u32>),
    Upstream,
}

impl Version {
    pub fn release(parts: &[u32]) -> Self {
        Version::Release(parts.to_vec())
    }

    /// Stream name used by blockers: `5.9` for releases, `upstream` otherwise
    pub fn stream(&self) -> String {
        match self {
            Version::Release(parts) => {
                let major = parts.first().copied().unwrap_or(0);
                let minor = parts.get(1).copied().unwrap_or(0);
                format!("{}.{}", major, minor)
            }
            Version::Upstream => "upstream".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid appliance version `{0}`")]
pub struct ParseVersionError(pub String);

impl FromStr for Version {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "master" | "upstream" | "latest" => return Ok(Version::Upstream),
            "" => return Err(ParseVersionError(s.to_string())),
            _ => {}
        }

        // `5.9.0.22-beta1` and `5.10.0.1.20180601` both parse by their leading numeric run
        let numeric = trimmed
            .split(|c: char| !(c.is_ascii_digit() || c == '.'))
            .next()
            .unwrap_or("");
        let parts = numeric
            .split('.')
            .filter(|p| !p.is_empty())
            .map(|p| p.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ParseVersionError(s.to_string()))?;

        if parts.is_empty() {
            return Err(ParseVersionError(s.to_string()));
        }
        Ok(Version::Release(parts))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Release(parts) => {
                let joined = parts
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(".");
                f.write_str(&joined)
            }
            Version::Upstream => f.write_str("master"),
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Version::Upstream, Version::Upstream) => Ordering::Equal,
            (Version::Upstream, _) => Ordering::Greater,
            (_, Version::Upstream) => Ordering::Less,
            (Version::Release(a), Version::Release(b)) => {
                let len = a.len().max(b.len());
                for i in 0..len {
                    let x = a.get(i).copied().unwrap_or(0);
                    let y = b.get(i).copied().unwrap_or(0);
                    match x.cmp(&y) {
                        Ordering::Equal => continue,
                        other => return other,
                    }
                }
                Ordering::Equal
            }
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
