//! Module-scoped fixtures for the custom-attributes suite

use miqapi::api::{CollectionKind, Resource};
use miqapi::Client;
use std::collections::HashMap;

use crate::cleanup::CleanupOutcome;
use crate::config::ProviderConfig;
use crate::error::{CaseError, CaseResult};
use crate::gating::{CollectionName, ProviderKind};
use crate::generators::random_vm_name;
use crate::mgmt::ProviderMgmt;

/// The test VM or instance owned by the fixture
#[derive(Debug, Clone)]
struct TestVm {
    name: String,
}

/// Collection name to resource, built once and shared by every case of the suite
#[derive(Debug)]
pub struct FixtureContext {
    resources: HashMap<CollectionName, Resource>,
    vm: Option<TestVm>,
}

/// A fixture that could not be built, with the teardown of what it had created
#[derive(Debug)]
pub struct FixtureError {
    pub error: CaseError,
    pub teardown: Vec<CleanupOutcome>,
}

impl From<CaseError> for FixtureError {
    fn from(error: CaseError) -> Self {
        Self {
            error,
            teardown: Vec::new(),
        }
    }
}

impl From<miqapi::ApiError> for FixtureError {
    fn from(error: miqapi::ApiError) -> Self {
        CaseError::from(error).into()
    }
}

impl FixtureContext {
    /// Looks up the provider record and, when `needed` includes the
    /// provider's VM collection, creates a fresh VM or instance for it.
    pub async fn build(
        client: &Client,
        mgmt: &dyn ProviderMgmt,
        provider: &ProviderConfig,
        provider_kind: ProviderKind,
        needed: &[CollectionName],
    ) -> Result<Self, FixtureError> {
        let mut context = Self {
            resources: HashMap::new(),
            vm: None,
        };

        let provider_record = client
            .collection(CollectionKind::Providers)
            .get_by_name(&provider.name)
            .await?;
        context
            .resources
            .insert(CollectionName::Providers, provider_record);

        let vm_collection = provider_kind.vm_collection();
        if !needed.contains(&vm_collection) {
            return Ok(context);
        }

        let template = provider.template.as_deref().ok_or_else(|| {
            CaseError::Fixture(format!(
                "provider.template is required for `{}` cases",
                vm_collection
            ))
        })?;

        let name = random_vm_name("attrs");
        context.vm = Some(TestVm { name: name.clone() });

        match Self::vm_record(client, mgmt, vm_collection, &name, template).await {
            Ok(record) => {
                context.resources.insert(vm_collection, record);
            }
            Err(error) => {
                // a half-provisioned VM still gets torn down
                let teardown = context.teardown(mgmt).await;
                return Err(FixtureError { error, teardown });
            }
        }

        Ok(context)
    }

    async fn vm_record(
        client: &Client,
        mgmt: &dyn ProviderMgmt,
        collection: CollectionName,
        name: &str,
        template: &str,
    ) -> CaseResult<Resource> {
        if mgmt.does_vm_exist(name).await? {
            Ok(client.collection(collection.kind()).get_by_name(name).await?)
        } else {
            mgmt.create_on_provider(name, template).await
        }
    }

    pub fn resource(&self, collection: CollectionName) -> CaseResult<&Resource> {
        self.resources.get(&collection).ok_or_else(|| {
            CaseError::Fixture(format!("no `{}` resource for this provider", collection))
        })
    }

    /// Best-effort removal of the test VM; failures are logged and reported, never raised
    pub async fn teardown(self, mgmt: &dyn ProviderMgmt) -> Vec<CleanupOutcome> {
        let Some(vm) = self.vm else {
            return Vec::new();
        };
        let task = format!("delete vm `{}`", vm.name);
        match mgmt.delete_vm(&vm.name).await {
            Ok(()) => vec![CleanupOutcome::Succeeded { task }],
            Err(e) => {
                tracing::warn!("Failed to delete vm `{}`: {}", vm.name, e);
                vec![CleanupOutcome::Failed {
                    task,
                    reason: e.to_string(),
                }]
            }
        }
    }
}
