pub mod client;
pub mod collections;
pub mod common;
pub mod custom_attributes;
pub mod entrypoint;
pub mod error;
pub mod provision;
pub mod stats;

#[cfg(test)]
mod test_helpers;

pub use client::{Auth, Client, RetryConfig};
pub use collections::{CollectionApi, CollectionKind, Resource, ResourceApi};
pub use common::{
    ActionEntry, ActionFailure, ActionResult, ApiErrorDetails, ApiQueryParams, CollectionResponse,
};
pub use custom_attributes::{
    CustomAttribute, CustomAttributeApi, CustomAttributeEdit, CustomAttributeFields,
    CustomAttributesApi, Section,
};
pub use entrypoint::{EntryPoint, ServerInfo};
pub use error::ApiError;
pub use provision::{ProvisionRequest, ProvisionRequestBody, ProvisionRequestsApi};
pub use stats::RequestStats;
