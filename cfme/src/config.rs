//! Harness configuration: a TOML file with environment overrides

use miqapi::api::{Auth, RetryConfig};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::gating::{default_blockers, Blocker, ProviderKind};
use crate::version::Version;

#[derive(Debug, Clone, Deserialize)]
pub struct HarnessConfig {
    pub appliance: ApplianceConfig,
    pub provider: ProviderConfig,
    #[serde(default)]
    pub waits: WaitConfig,
    #[serde(default)]
    pub rss: RssConfig,
    #[serde(default = "default_blockers")]
    pub blockers: Vec<Blocker>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplianceConfig {
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub insecure: bool,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Skips the entrypoint lookup when set
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    /// Overrides the kind derived from the provider record type
    #[serde(default)]
    pub kind: Option<ProviderKind>,
    /// Template the test VM or instance is provisioned from
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default = "default_owner_email")]
    pub owner_email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaitConfig {
    #[serde(default = "default_delete_timeout")]
    pub delete_timeout_secs: u64,
    #[serde(default = "default_delete_delay")]
    pub delete_delay_secs: u64,
    #[serde(default = "default_provision_timeout")]
    pub provision_timeout_secs: u64,
    #[serde(default = "default_provision_delay")]
    pub provision_delay_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RssConfig {
    #[serde(default = "default_rss_page")]
    pub page_path: String,
    /// Zero-based index of the table column holding the feed link
    #[serde(default = "default_link_column")]
    pub link_column: usize,
}

fn default_timeout_seconds() -> u64 {
    60
}

/// Upper bound on `appliance.max_retries`
pub const MAX_RETRIES: u32 = 10;

fn default_max_retries() -> u32 {
    2
}

fn default_owner_email() -> String {
    "admin@example.com".to_string()
}

fn default_delete_timeout() -> u64 {
    10
}

fn default_delete_delay() -> u64 {
    2
}

fn default_provision_timeout() -> u64 {
    900
}

fn default_provision_delay() -> u64 {
    15
}

fn default_rss_page() -> String {
    "/alert/show_list".to_string()
}

fn default_link_column() -> usize {
    3
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            delete_timeout_secs: default_delete_timeout(),
            delete_delay_secs: default_delete_delay(),
            provision_timeout_secs: default_provision_timeout(),
            provision_delay_secs: default_provision_delay(),
        }
    }
}

impl WaitConfig {
    pub fn delete_timeout(&self) -> Duration {
        Duration::from_secs(self.delete_timeout_secs)
    }

    pub fn delete_delay(&self) -> Duration {
        Duration::from_secs(self.delete_delay_secs)
    }

    pub fn provision_timeout(&self) -> Duration {
        Duration::from_secs(self.provision_timeout_secs)
    }

    pub fn provision_delay(&self) -> Duration {
        Duration::from_secs(self.provision_delay_secs)
    }
}

impl Default for RssConfig {
    fn default() -> Self {
        Self {
            page_path: default_rss_page(),
            link_column: default_link_column(),
        }
    }
}

impl HarnessConfig {
    /// Reads `path` when given, otherwise builds the config from environment
    /// variables alone. Environment variables override file values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::from_env()?,
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    fn from_env() -> Result<Self, ConfigError> {
        let url = std::env::var("CFME_URL").map_err(|_| ConfigError::Missing("CFME_URL"))?;
        let provider =
            std::env::var("CFME_PROVIDER").map_err(|_| ConfigError::Missing("CFME_PROVIDER"))?;

        Ok(Self {
            appliance: ApplianceConfig {
                url,
                username: None,
                password: None,
                token: None,
                insecure: false,
                timeout_seconds: default_timeout_seconds(),
                max_retries: default_max_retries(),
                version: None,
            },
            provider: ProviderConfig {
                name: provider,
                kind: None,
                template: None,
                owner_email: default_owner_email(),
            },
            waits: WaitConfig::default(),
            rss: RssConfig::default(),
            blockers: default_blockers(),
        })
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("CFME_URL") {
            self.appliance.url = url;
        }
        if let Ok(username) = std::env::var("CFME_USERNAME") {
            self.appliance.username = Some(username);
        }
        if let Ok(password) = std::env::var("CFME_PASSWORD") {
            self.appliance.password = Some(password);
        }
        if let Ok(token) = std::env::var("CFME_TOKEN") {
            self.appliance.token = Some(token);
        }
        if let Some(insecure) = std::env::var("CFME_INSECURE")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
        {
            self.appliance.insecure = insecure;
        }
        if let Ok(version) = std::env::var("CFME_VERSION") {
            self.appliance.version = Some(version);
        }
        if let Ok(provider) = std::env::var("CFME_PROVIDER") {
            self.provider.name = provider;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.auth()?;
        self.version_override()?;
        url::Url::parse(&self.appliance.url)
            .map_err(|e| ConfigError::Invalid(format!("appliance.url: {}", e)))?;
        if self.provider.name.trim().is_empty() {
            return Err(ConfigError::Missing("provider.name"));
        }
        if self.appliance.max_retries > MAX_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "appliance.max_retries is {}, at most {} allowed",
                self.appliance.max_retries, MAX_RETRIES
            )));
        }
        Ok(())
    }

    /// Token auth wins over basic auth when both are configured
    pub fn auth(&self) -> Result<Auth, ConfigError> {
        if let Some(token) = &self.appliance.token {
            return Ok(Auth::Token(token.clone()));
        }
        match (&self.appliance.username, &self.appliance.password) {
            (Some(username), Some(password)) => Ok(Auth::Basic {
                username: username.clone(),
                password: password.clone(),
            }),
            (None, _) => Err(ConfigError::Missing("appliance.username")),
            (_, None) => Err(ConfigError::Missing("appliance.password")),
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.appliance.max_retries,
            timeout_seconds: self.appliance.timeout_seconds,
            ..RetryConfig::default()
        }
    }

    pub fn version_override(&self) -> Result<Option<Version>, ConfigError> {
        self.appliance
            .version
            .as_deref()
            .map(|v| {
                v.parse::<Version>()
                    .map_err(|e| ConfigError::Invalid(e.to_string()))
            })
            .transpose()
    }
}
