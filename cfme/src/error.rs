use miqapi::ApiError;
use std::path::PathBuf;
use thiserror::Error;

/// Why a single case failed
#[derive(Debug, Error)]
pub enum CaseError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("assertion failed: {0}")]
    Assertion(String),

    #[error("expected HTTP {status} with `{klass}`, but the request succeeded")]
    UnexpectedSuccess { status: u16, klass: String },

    #[error("expected HTTP {status} with `{klass}`, got: {actual}")]
    WrongError {
        status: u16,
        klass: String,
        #[source]
        actual: ApiError,
    },

    #[error("timed out after {seconds}s waiting for {what}")]
    Timeout { what: String, seconds: u64 },

    #[error("fixture unavailable: {0}")]
    Fixture(String),

    #[error("The url {url:?} seems malformed: {reason}")]
    Link { url: String, reason: String },
}

pub type CaseResult<T = ()> = Result<T, CaseError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing configuration value: {0}")]
    Missing(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
