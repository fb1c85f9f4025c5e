//! Provision requests (`/api/provision_requests`)

use serde::{Deserialize, Serialize};

use super::collections::CollectionKind;
use super::common::{id_string, ActionResults};
use super::{ApiError, Client};

#[derive(Debug, Clone, Serialize)]
pub struct TemplateFields {
    pub guid: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VmFields {
    pub vm_name: String,
    pub number_of_vms: u32,
    pub placement_auto: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Requester {
    pub owner_email: String,
    pub auto_approve: bool,
}

/// Body of `POST /api/provision_requests`
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionRequestBody {
    pub version: String,
    pub template_fields: TemplateFields,
    pub vm_fields: VmFields,
    pub requester: Requester,
}

impl ProvisionRequestBody {
    /// Single auto-placed, auto-approved VM from the template with `template_guid`
    pub fn single_vm(template_guid: &str, vm_name: &str, owner_email: &str) -> Self {
        Self {
            version: "1.1".to_string(),
            template_fields: TemplateFields {
                guid: template_guid.to_string(),
            },
            vm_fields: VmFields {
                vm_name: vm_name.to_string(),
                number_of_vms: 1,
                placement_auto: true,
            },
            requester: Requester {
                owner_email: owner_email.to_string(),
                auto_approve: true,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProvisionRequest {
    #[serde(default, deserialize_with = "id_string::deserialize")]
    pub id: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub request_state: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ProvisionRequest {
    pub fn is_finished(&self) -> bool {
        self.request_state.as_deref() == Some("finished")
    }

    pub fn is_error(&self) -> bool {
        matches!(self.status.as_deref(), Some("Error") | Some("error"))
    }
}

pub struct ProvisionRequestsApi<'a> {
    client: &'a Client,
}

impl<'a> ProvisionRequestsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /api/provision_requests
    pub async fn create(&self, body: &ProvisionRequestBody) -> Result<ProvisionRequest, ApiError> {
        let response: ActionResults<ProvisionRequest> = self
            .client
            .post(&CollectionKind::ProvisionRequests.api_path(), body)
            .await?;
        response.results.into_iter().next().ok_or_else(|| {
            ApiError::ParseError("provision request response carried no results".to_string())
        })
    }

    /// GET /api/provision_requests/{id}
    pub async fn get(&self, id: &str) -> Result<ProvisionRequest, ApiError> {
        let path = format!("{}/{}", CollectionKind::ProvisionRequests.api_path(), id);
        self.client.get(&path).await
    }
}
