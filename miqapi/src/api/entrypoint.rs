use serde::{Deserialize, Serialize};

/// `server_info` block of the API entrypoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub version: String,
    #[serde(default)]
    pub build: Option<String>,
    #[serde(default)]
    pub appliance: Option<String>,
    #[serde(default)]
    pub release: Option<String>,
}

/// Response of `GET /api`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryPoint {
    #[serde(default)]
    pub name: Option<String>,
    /// REST API version, distinct from the appliance version in `server_info`
    #[serde(default)]
    pub version: Option<String>,
    pub server_info: ServerInfo,
}

impl super::Client {
    pub async fn get_entrypoint(&self) -> Result<EntryPoint, super::ApiError> {
        self.get("/api").await
    }

    /// Appliance version string, e.g. `5.9.0.22` or `master`
    pub async fn server_version(&self) -> Result<String, super::ApiError> {
        Ok(self.get_entrypoint().await?.server_info.version)
    }
}
