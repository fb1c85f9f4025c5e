//! `custom_attributes` subcollection of providers, instances and VMs

use serde::{Deserialize, Serialize};
use std::fmt;

use super::common::{
    id_from_href, id_string, ActionEntry, ActionRequest, ActionResult, ActionResults,
    ApiQueryParams, CollectionResponse, HrefRef,
};
use super::{ApiError, Client};

/// Section a custom attribute lives in. Any other literal is kept verbatim so
/// that requests can carry values the server is expected to reject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Default,
    Metadata,
    #[serde(untagged)]
    Other(String),
}

impl Section {
    pub fn as_str(&self) -> &str {
        match self {
            Section::Default => "default",
            Section::Metadata => "metadata",
            Section::Other(s) => s,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomAttribute {
    #[serde(default, deserialize_with = "id_string::deserialize")]
    pub id: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub section: Option<Section>,
    #[serde(default)]
    pub source: Option<String>,
}

impl CustomAttribute {
    /// The record id, falling back to the last segment of its href
    pub fn record_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or_else(|| self.href.as_deref().and_then(id_from_href))
    }
}

/// Fields sent on add and edit; unset fields are omitted from the payload
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CustomAttributeFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<Section>,
}

impl CustomAttributeFields {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            value: Some(value.into()),
            section: None,
        }
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.section = Some(section);
        self
    }

    pub fn section_only(section: Section) -> Self {
        Self {
            section: Some(section),
            ..Default::default()
        }
    }
}

/// Entry of a collection-level edit; `href` points back at the edited record
#[derive(Debug, Clone, Serialize)]
pub struct CustomAttributeEdit {
    pub href: String,
    #[serde(flatten)]
    pub fields: CustomAttributeFields,
}

pub struct CustomAttributesApi<'a> {
    client: &'a Client,
    href: String,
}

impl<'a> CustomAttributesApi<'a> {
    pub fn new(client: &'a Client, href: &str) -> Self {
        Self {
            client,
            href: href.to_string(),
        }
    }

    /// GET {resource}/custom_attributes?expand=resources
    pub async fn list(&self) -> Result<Vec<CustomAttribute>, ApiError> {
        let params = ApiQueryParams::new().expand_resources();
        let response: CollectionResponse<CustomAttribute> =
            self.client.get_with_params(&self.href, &params).await?;
        Ok(response.resources)
    }

    /// GET {resource}/custom_attributes/{id}
    pub async fn get(&self, id: &str) -> Result<CustomAttribute, ApiError> {
        let path = format!("{}/{}", self.href, id);
        self.client.get(&path).await
    }

    /// POST {resource}/custom_attributes `{"action": "add", "resources": [...]}`
    pub async fn add(
        &self,
        attributes: &[CustomAttributeFields],
    ) -> Result<Vec<CustomAttribute>, ApiError> {
        let response: ActionResults<ActionEntry<CustomAttribute>> = self
            .client
            .post(&self.href, &ActionRequest::batch("add", attributes))
            .await?;
        response.into_records("add")
    }

    /// POST {resource}/custom_attributes `{"action": "edit", "resources": [...]}`
    pub async fn edit(
        &self,
        edits: &[CustomAttributeEdit],
    ) -> Result<Vec<CustomAttribute>, ApiError> {
        let response: ActionResults<ActionEntry<CustomAttribute>> = self
            .client
            .post(&self.href, &ActionRequest::batch("edit", edits))
            .await?;
        response.into_records("edit")
    }

    /// POST {resource}/custom_attributes `{"action": "delete", "resources": [{"href": ...}]}`
    pub async fn delete(&self, refs: &[HrefRef]) -> Result<Vec<ActionResult>, ApiError> {
        let response: ActionResults<ActionResult> = self
            .client
            .post(&self.href, &ActionRequest::batch("delete", refs))
            .await?;
        Ok(response.results)
    }

    /// Detail href of `attribute`, derived from its id when the body had no href
    pub fn attribute_href(&self, attribute: &CustomAttribute) -> Result<String, ApiError> {
        if let Some(href) = &attribute.href {
            return Ok(href.clone());
        }
        attribute
            .record_id()
            .map(|id| format!("{}/{}", self.href, id))
            .ok_or_else(|| {
                ApiError::ParseError(format!(
                    "custom attribute `{}` carries neither id nor href",
                    attribute.name
                ))
            })
    }

    pub fn attribute(
        &self,
        attribute: &CustomAttribute,
    ) -> Result<CustomAttributeApi<'a>, ApiError> {
        Ok(CustomAttributeApi {
            client: self.client,
            href: self.attribute_href(attribute)?,
        })
    }
}

/// Detail endpoint of one custom attribute
pub struct CustomAttributeApi<'a> {
    client: &'a Client,
    href: String,
}

impl<'a> CustomAttributeApi<'a> {
    pub fn href(&self) -> &str {
        &self.href
    }

    pub fn reference(&self) -> HrefRef {
        HrefRef::new(self.href.clone())
    }

    pub async fn get(&self) -> Result<CustomAttribute, ApiError> {
        self.client.get(&self.href).await
    }

    /// POST {href} `{"action": "edit", "resource": {...}}`
    pub async fn edit(&self, fields: &CustomAttributeFields) -> Result<CustomAttribute, ApiError> {
        self.client
            .post(&self.href, &ActionRequest::single("edit", fields))
            .await
    }

    /// POST {href} `{"action": "delete"}`
    pub async fn delete_post(&self) -> Result<ActionResult, ApiError> {
        self.client
            .post(&self.href, &ActionRequest::bare("delete"))
            .await
    }

    /// DELETE {href}; the server answers 204 without a body
    pub async fn delete(&self) -> Result<(), ApiError> {
        self.client.delete::<serde_json::Value>(&self.href).await.map(|_| ())
    }
}
