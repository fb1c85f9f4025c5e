//! Per-case cleanup registrar, drained after every case whatever its outcome

use miqapi::api::common::HrefRef;
use miqapi::api::{Resource, ResourceApi};
use miqapi::Client;
use std::fmt;

use crate::assertions::assert_action_results;
use crate::error::CaseResult;

#[derive(Debug, Clone)]
pub enum CleanupTask {
    /// Delete the listed custom attributes of `parent` that still exist
    DeleteCustomAttributes { parent: Resource, ids: Vec<String> },
}

impl fmt::Display for CleanupTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupTask::DeleteCustomAttributes { parent, ids } => write!(
                f,
                "delete custom attributes [{}] of {}",
                ids.join(", "),
                parent.display_name()
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    Succeeded { task: String },
    /// Nothing was left to clean up
    Skipped { task: String },
    Failed { task: String, reason: String },
}

impl CleanupOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, CleanupOutcome::Failed { .. })
    }
}

#[derive(Debug, Default)]
pub struct Cleanup {
    tasks: Vec<CleanupTask>,
}

impl Cleanup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, task: CleanupTask) {
        self.tasks.push(task);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Runs registered tasks last-in first-out. Failures are logged, never returned.
    pub async fn run(&mut self, client: &Client) -> Vec<CleanupOutcome> {
        let mut outcomes = Vec::with_capacity(self.tasks.len());
        while let Some(task) = self.tasks.pop() {
            let name = task.to_string();
            let outcome = match run_task(client, &task).await {
                Ok(true) => CleanupOutcome::Succeeded { task: name },
                Ok(false) => CleanupOutcome::Skipped { task: name },
                Err(e) => {
                    tracing::warn!("Cleanup `{}` failed: {}", name, e);
                    CleanupOutcome::Failed {
                        task: name,
                        reason: e.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }
}

async fn run_task(client: &Client, task: &CleanupTask) -> CaseResult<bool> {
    match task {
        CleanupTask::DeleteCustomAttributes { parent, ids } => {
            let attributes = ResourceApi::new(client, &parent.href).custom_attributes();
            let remaining = attributes
                .list()
                .await?
                .into_iter()
                .filter(|attr| attr.record_id().is_some_and(|id| ids.iter().any(|i| i == id)))
                .map(|attr| attributes.attribute_href(&attr).map(HrefRef::new))
                .collect::<Result<Vec<_>, _>>()?;

            if remaining.is_empty() {
                return Ok(false);
            }
            tracing::debug!(
                "Deleting {} leftover custom attributes of {}",
                remaining.len(),
                parent.display_name()
            );
            let results = attributes.delete(&remaining).await?;
            assert_action_results(&results, remaining.len())?;
            Ok(true)
        }
    }
}
