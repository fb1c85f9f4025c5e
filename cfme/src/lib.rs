pub mod assertions;
pub mod cleanup;
pub mod config;
pub mod custom_attributes;
pub mod error;
pub mod fixtures;
pub mod gating;
pub mod generators;
pub mod mgmt;
pub mod rss;
pub mod runner;
pub mod version;

pub use config::HarnessConfig;
pub use error::{CaseError, CaseResult, ConfigError};
pub use mgmt::{ApplianceMgmt, ProviderMgmt};
pub use runner::{Outcome, RunReport, Runner, Suite};
pub use version::Version;
