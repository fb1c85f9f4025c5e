//! Common envelopes and helpers shared by the REST API modules

use serde::{Deserialize, Deserializer, Serialize};

use super::ApiError;

/// `{"resources": [...]}` envelope returned by collection and subcollection GETs.
#[derive(Debug, Deserialize)]
pub struct CollectionResponse<T> {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub subcount: Option<u64>,
    #[serde(default = "Vec::new")]
    pub resources: Vec<T>,
}

/// `{"results": [...]}` envelope returned by batched actions.
#[derive(Debug, Deserialize)]
pub struct ActionResults<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

/// Entry of a batched action that returns records. The server reports a
/// rejected entry as `{"success": false, "message": ...}` in place of the record.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ActionEntry<T> {
    Failed(ActionFailure),
    Record(T),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionFailure {
    #[serde(deserialize_with = "failure_flag")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

fn failure_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match bool::deserialize(deserializer)? {
        false => Ok(false),
        true => Err(serde::de::Error::custom("entry reports success")),
    }
}

impl<T> ActionResults<ActionEntry<T>> {
    /// The returned records, or the first entry the server rejected
    pub fn into_records(self, action: &str) -> Result<Vec<T>, ApiError> {
        self.results
            .into_iter()
            .enumerate()
            .map(|(index, entry)| match entry {
                ActionEntry::Record(record) => Ok(record),
                ActionEntry::Failed(failure) => Err(ApiError::ActionFailed {
                    action: action.to_string(),
                    index,
                    message: failure.message.unwrap_or_else(|| "no message".to_string()),
                }),
            })
            .collect()
    }
}

/// Body of an action POST against a collection or a single record.
#[derive(Debug, Serialize)]
pub struct ActionRequest<'a, B: Serialize> {
    pub action: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<&'a B>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<&'a [B]>,
}

impl<'a, B: Serialize> ActionRequest<'a, B> {
    pub fn single(action: &'a str, resource: &'a B) -> Self {
        Self {
            action,
            resource: Some(resource),
            resources: None,
        }
    }

    pub fn batch(action: &'a str, resources: &'a [B]) -> Self {
        Self {
            action,
            resource: None,
            resources: Some(resources),
        }
    }
}

impl<'a> ActionRequest<'a, ()> {
    pub fn bare(action: &'a str) -> Self {
        Self {
            action,
            resource: None,
            resources: None,
        }
    }
}

/// Per-entry outcome of an action that does not return records.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionResult {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default, deserialize_with = "id_string::deserialize")]
    pub id: Option<String>,
}

fn default_success() -> bool {
    true
}

/// Reference to an existing record by its href.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HrefRef {
    pub href: String,
}

impl HrefRef {
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into() }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetails,
}

#[derive(Debug, Clone, Deserialize, thiserror::Error)]
#[error("API error details: kind={kind:?}, klass={klass:?}, message={message:?}")]
pub struct ApiErrorDetails {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub klass: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// `expand=resources`, so collection GETs return full records instead of hrefs.
    pub fn expand_resources(self) -> Self {
        self.add("expand", "resources")
    }

    /// Adds a `filter[]=<attr>='<value>'` clause.
    pub fn filter_eq(self, attr: &str, value: &str) -> Self {
        self.add("filter[]", format!("{}='{}'", attr, value))
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            String::new()
        } else {
            format!(
                "?{}",
                self.params
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&")
            )
        }
    }
}

/// Record ids are strings on current appliances and integers on older ones.
pub mod id_string {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StringOrU64 {
            String(String),
            U64(u64),
        }

        Ok(
            Option::<StringOrU64>::deserialize(deserializer)?.map(|v| match v {
                StringOrU64::String(s) => s,
                StringOrU64::U64(u) => u.to_string(),
            }),
        )
    }
}

/// Last path segment of an href, used as the record id when the body omits it.
pub fn id_from_href(href: &str) -> Option<&str> {
    let path = href.split('?').next().unwrap_or(href);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
}
