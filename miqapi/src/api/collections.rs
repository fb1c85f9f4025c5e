//! Top-level resource collections (`/api/providers`, `/api/vms`, ...)

use serde::{Deserialize, Serialize};
use std::fmt;

use super::common::{id_string, ActionRequest, ActionResult, ApiQueryParams, CollectionResponse};
use super::custom_attributes::CustomAttributesApi;
use super::{ApiError, Client};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Providers,
    Instances,
    Vms,
    Templates,
    ProvisionRequests,
}

impl CollectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Providers => "providers",
            CollectionKind::Instances => "instances",
            CollectionKind::Vms => "vms",
            CollectionKind::Templates => "templates",
            CollectionKind::ProvisionRequests => "provision_requests",
        }
    }

    pub fn api_path(&self) -> String {
        format!("/api/{}", self.as_str())
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provider, instance, VM or template record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default, deserialize_with = "id_string::deserialize")]
    pub id: Option<String>,
    pub href: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub guid: Option<String>,
}

impl Resource {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.href)
    }
}

pub struct CollectionApi<'a> {
    client: &'a Client,
    kind: CollectionKind,
}

impl<'a> CollectionApi<'a> {
    pub fn new(client: &'a Client, kind: CollectionKind) -> Self {
        Self { client, kind }
    }

    /// GET /api/{collection}?expand=resources&filter[]=name='{name}'
    pub async fn list_by_name(&self, name: &str) -> Result<Vec<Resource>, ApiError> {
        let params = ApiQueryParams::new()
            .expand_resources()
            .filter_eq("name", name);
        let response: CollectionResponse<Resource> = self
            .client
            .get_with_params(&self.kind.api_path(), &params)
            .await?;
        Ok(response.resources)
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Resource>, ApiError> {
        Ok(self.list_by_name(name).await?.into_iter().next())
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Resource, ApiError> {
        self.find_by_name(name)
            .await?
            .ok_or_else(|| ApiError::NoSuchRecord {
                collection: self.kind.to_string(),
                name: name.to_string(),
            })
    }

    pub fn resource(&self, resource: &Resource) -> ResourceApi<'a> {
        ResourceApi::new(self.client, &resource.href)
    }
}

/// Operations on a single record addressed by its href
pub struct ResourceApi<'a> {
    client: &'a Client,
    href: String,
}

impl<'a> ResourceApi<'a> {
    pub fn new(client: &'a Client, href: &str) -> Self {
        Self {
            client,
            href: href.trim_end_matches('/').to_string(),
        }
    }

    /// `custom_attributes` subcollection of this record
    pub fn custom_attributes(&self) -> CustomAttributesApi<'a> {
        CustomAttributesApi::new(self.client, &format!("{}/custom_attributes", self.href))
    }

    /// POST {href} with `{"action": "<action>"}`
    pub async fn action(&self, action: &str) -> Result<ActionResult, ApiError> {
        self.client
            .post(&self.href, &ActionRequest::bare(action))
            .await
    }

    pub async fn delete(&self) -> Result<ActionResult, ApiError> {
        self.action("delete").await
    }
}
