//! Provider management layer: creating and removing the test VM or instance

use async_trait::async_trait;
use miqapi::api::{CollectionKind, ProvisionRequestBody, Resource};
use miqapi::Client;
use tokio::time::Instant;

use crate::config::WaitConfig;
use crate::error::{CaseError, CaseResult};
use crate::gating::ProviderKind;

#[async_trait]
pub trait ProviderMgmt: Send + Sync {
    async fn does_vm_exist(&self, name: &str) -> CaseResult<bool>;

    /// Creates `name` from `template` and waits until the appliance inventory shows it
    async fn create_on_provider(&self, name: &str, template: &str) -> CaseResult<Resource>;

    async fn delete_vm(&self, name: &str) -> CaseResult;
}

/// Drives VM lifecycle through the appliance itself: provision requests to
/// create, the `delete` action to remove.
pub struct ApplianceMgmt {
    client: Client,
    kind: ProviderKind,
    owner_email: String,
    waits: WaitConfig,
}

impl ApplianceMgmt {
    pub fn new(client: Client, kind: ProviderKind, owner_email: &str, waits: WaitConfig) -> Self {
        Self {
            client,
            kind,
            owner_email: owner_email.to_string(),
            waits,
        }
    }

    fn vm_collection(&self) -> CollectionKind {
        self.kind.vm_collection().kind()
    }

    async fn wait_for_request(&self, id: &str) -> CaseResult {
        let deadline = Instant::now() + self.waits.provision_timeout();
        loop {
            let request = self.client.provision_requests().get(id).await?;
            if request.is_error() {
                return Err(CaseError::Fixture(format!(
                    "provision request {} failed: {}",
                    id,
                    request.message.as_deref().unwrap_or("no message")
                )));
            }
            if request.is_finished() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(CaseError::Timeout {
                    what: format!("provision request {}", id),
                    seconds: self.waits.provision_timeout_secs,
                });
            }
            tracing::debug!(
                "Provision request {} is {}",
                id,
                request.request_state.as_deref().unwrap_or("unknown")
            );
            tokio::time::sleep(self.waits.provision_delay()).await;
        }
    }

    async fn wait_for_inventory(&self, name: &str) -> CaseResult<Resource> {
        let deadline = Instant::now() + self.waits.provision_timeout();
        loop {
            if let Some(found) = self
                .client
                .collection(self.vm_collection())
                .find_by_name(name)
                .await?
            {
                return Ok(found);
            }
            if Instant::now() >= deadline {
                return Err(CaseError::Timeout {
                    what: format!("{} to appear in {}", name, self.vm_collection()),
                    seconds: self.waits.provision_timeout_secs,
                });
            }
            tokio::time::sleep(self.waits.provision_delay()).await;
        }
    }
}

#[async_trait]
impl ProviderMgmt for ApplianceMgmt {
    async fn does_vm_exist(&self, name: &str) -> CaseResult<bool> {
        Ok(self
            .client
            .collection(self.vm_collection())
            .find_by_name(name)
            .await?
            .is_some())
    }

    async fn create_on_provider(&self, name: &str, template: &str) -> CaseResult<Resource> {
        let template_record = self
            .client
            .collection(CollectionKind::Templates)
            .get_by_name(template)
            .await?;
        let guid = template_record.guid.as_deref().ok_or_else(|| {
            CaseError::Fixture(format!("template `{}` has no guid", template))
        })?;

        tracing::info!("Provisioning {} `{}` from `{}`", self.vm_collection(), name, template);
        let body = ProvisionRequestBody::single_vm(guid, name, &self.owner_email);
        let request = self.client.provision_requests().create(&body).await?;
        let id = request
            .id
            .ok_or_else(|| CaseError::Fixture("provision request carried no id".to_string()))?;

        self.wait_for_request(&id).await?;
        self.wait_for_inventory(name).await
    }

    async fn delete_vm(&self, name: &str) -> CaseResult {
        let collection = self.client.collection(self.vm_collection());
        let record = collection.get_by_name(name).await?;
        let result = collection.resource(&record).delete().await?;
        if !result.success {
            return Err(CaseError::Assertion(format!(
                "deleting `{}` was refused: {}",
                name,
                result.message.as_deref().unwrap_or("no message")
            )));
        }
        Ok(())
    }
}
