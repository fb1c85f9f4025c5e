//! Typed async client for the appliance REST API.
//!
//! The client covers the parts of the API the verification harness drives:
//! the entrypoint (server version), resource collections looked up by name,
//! the `custom_attributes` subcollection of a resource, templates, provision
//! requests and resource actions.

pub mod api;

pub use api::{ApiError, Client};
