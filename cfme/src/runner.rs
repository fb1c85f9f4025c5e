//! Expands, gates and runs the suites against one appliance

use miqapi::api::CollectionKind;
use miqapi::Client;
use std::fmt;

use crate::cleanup::{Cleanup, CleanupOutcome};
use crate::config::HarnessConfig;
use crate::custom_attributes::{self, CaseContext, CaseId};
use crate::error::{CaseError, CaseResult};
use crate::fixtures::FixtureContext;
use crate::gating::{CollectionName, ProviderKind};
use crate::mgmt::{ApplianceMgmt, ProviderMgmt};
use crate::rss::{self, LinkChecker, RssView, UiRssView};
use crate::version::Version;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suite {
    CustomAttributes,
    Rss,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed(String),
    Skipped(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Passed => f.write_str("PASSED"),
            Outcome::Failed(reason) => write!(f, "FAILED ({})", reason),
            Outcome::Skipped(reason) => write!(f, "SKIPPED ({})", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CaseReport {
    pub id: String,
    pub outcome: Outcome,
    pub cleanup: Vec<CleanupOutcome>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub cases: Vec<CaseReport>,
    /// Suite-level teardown, e.g. removing the test VM
    pub teardown: Vec<CleanupOutcome>,
}

impl RunReport {
    fn push(&mut self, id: impl Into<String>, outcome: Outcome, cleanup: Vec<CleanupOutcome>) {
        let id = id.into();
        match &outcome {
            Outcome::Passed => tracing::info!("{} PASSED", id),
            Outcome::Failed(reason) => tracing::error!("{} FAILED: {}", id, reason),
            Outcome::Skipped(reason) => tracing::info!("{} SKIPPED: {}", id, reason),
        }
        self.cases.push(CaseReport {
            id,
            outcome,
            cleanup,
        });
    }

    pub fn merge(&mut self, other: RunReport) {
        self.cases.extend(other.cases);
        self.teardown.extend(other.teardown);
    }

    pub fn passed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Passed))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped(_)))
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    pub fn outcome_of(&self, id: &str) -> Option<&Outcome> {
        self.cases.iter().find(|c| c.id == id).map(|c| &c.outcome)
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.cases.iter().filter(|c| pred(&c.outcome)).count()
    }
}

pub struct Runner {
    config: HarnessConfig,
    client: Client,
    filter: Option<String>,
}

impl Runner {
    pub fn new(config: HarnessConfig, filter: Option<String>) -> CaseResult<Self> {
        let auth = config.auth()?;
        let client = Client::with_config(
            &config.appliance.url,
            auth,
            config.appliance.insecure,
            config.retry_config(),
        )?;
        Ok(Self {
            config,
            client,
            filter,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn selected(&self, id: &str) -> bool {
        self.filter.as_deref().map_or(true, |f| id.contains(f))
    }

    pub async fn run(&self, suite: Suite) -> RunReport {
        let mut report = RunReport::default();
        if matches!(suite, Suite::CustomAttributes | Suite::All) {
            report.merge(self.run_custom_attributes().await);
        }
        if matches!(suite, Suite::Rss | Suite::All) {
            report.merge(self.run_rss().await);
        }
        let stats = self.client.get_request_stats().await;
        tracing::info!(
            "{} passed, {} failed, {} skipped; {} API requests ({} failed, {} retried)",
            report.passed(),
            report.failed(),
            report.skipped(),
            stats.total_requests,
            stats.failed_requests,
            stats.retried_requests
        );
        report
    }

    async fn appliance_version(&self) -> CaseResult<Version> {
        if let Some(version) = self.config.version_override()? {
            return Ok(version);
        }
        let raw = self.client.server_version().await?;
        raw.parse()
            .map_err(|e: crate::version::ParseVersionError| CaseError::Fixture(e.to_string()))
    }

    async fn provider_kind(&self) -> CaseResult<ProviderKind> {
        if let Some(kind) = self.config.provider.kind {
            return Ok(kind);
        }
        let provider = self
            .client
            .collection(CollectionKind::Providers)
            .get_by_name(&self.config.provider.name)
            .await?;
        provider
            .resource_type
            .as_deref()
            .and_then(ProviderKind::from_provider_type)
            .ok_or_else(|| {
                CaseError::Fixture(format!(
                    "cannot tell whether provider `{}` is cloud or infra; set provider.kind",
                    self.config.provider.name
                ))
            })
    }

    pub async fn run_custom_attributes(&self) -> RunReport {
        let (version, kind) = match self.discover().await {
            Ok(found) => found,
            Err(e) => return self.fail_all(&e),
        };
        let mgmt = ApplianceMgmt::new(
            self.client.clone(),
            kind,
            &self.config.provider.owner_email,
            self.config.waits.clone(),
        );
        self.run_custom_attributes_with(&version, kind, &mgmt).await
    }

    async fn discover(&self) -> CaseResult<(Version, ProviderKind)> {
        let version = self.appliance_version().await?;
        let kind = self.provider_kind().await?;
        tracing::info!(
            "Appliance {} with {} provider `{}`",
            version,
            kind,
            self.config.provider.name
        );
        Ok((version, kind))
    }

    fn fail_all(&self, error: &CaseError) -> RunReport {
        let mut report = RunReport::default();
        for case in custom_attributes::matrix() {
            let id = case.to_string();
            if self.selected(&id) {
                report.push(id, Outcome::Failed(error.to_string()), Vec::new());
            }
        }
        report
    }

    /// Runs the gated matrix with an explicit version, provider kind and management layer
    pub async fn run_custom_attributes_with(
        &self,
        version: &Version,
        kind: ProviderKind,
        mgmt: &dyn ProviderMgmt,
    ) -> RunReport {
        let mut report = RunReport::default();
        let mut runnable: Vec<CaseId> = Vec::new();

        for case in custom_attributes::matrix() {
            let id = case.to_string();
            if !self.selected(&id) {
                continue;
            }
            match custom_attributes::skip_reason(&case, version, kind, &self.config.blockers) {
                Some(reason) => report.push(id, Outcome::Skipped(reason.to_string()), Vec::new()),
                None => runnable.push(case),
            }
        }

        if runnable.is_empty() {
            return report;
        }

        let mut needed: Vec<CollectionName> = Vec::new();
        for case in &runnable {
            if !needed.contains(&case.collection) {
                needed.push(case.collection);
            }
        }

        let fixtures =
            match FixtureContext::build(&self.client, mgmt, &self.config.provider, kind, &needed)
                .await
            {
                Ok(fixtures) => fixtures,
                Err(failure) => {
                    let reason = failure.error.to_string();
                    for case in runnable {
                        report.push(case.to_string(), Outcome::Failed(reason.clone()), Vec::new());
                    }
                    report.teardown = failure.teardown;
                    return report;
                }
            };

        for case in &runnable {
            let mut cleanup = Cleanup::new();
            let result = match fixtures.resource(case.collection) {
                Ok(resource) => {
                    let mut ctx = CaseContext {
                        client: &self.client,
                        resource,
                        waits: &self.config.waits,
                        cleanup: &mut cleanup,
                    };
                    custom_attributes::run_case(case, &mut ctx).await
                }
                Err(e) => Err(e),
            };
            let cleanup_outcomes = cleanup.run(&self.client).await;
            let outcome = match result {
                Ok(()) => Outcome::Passed,
                Err(e) => Outcome::Failed(e.to_string()),
            };
            report.push(case.to_string(), outcome, cleanup_outcomes);
        }

        report.teardown = fixtures.teardown(mgmt).await;
        report
    }

    pub async fn run_rss(&self) -> RunReport {
        if !self.selected(rss::CASE_NAME) {
            return RunReport::default();
        }
        let view = match (&self.config.appliance.username, &self.config.appliance.password) {
            (Some(username), Some(password)) => UiRssView::new(
                &self.config.appliance.url,
                username,
                password,
                self.config.appliance.insecure,
                &self.config.rss,
            ),
            _ => Err(CaseError::Fixture(
                "the RSS view needs appliance.username and appliance.password".to_string(),
            )),
        };
        let checker = LinkChecker::new();
        match (view, checker) {
            (Ok(view), Ok(checker)) => self.run_rss_with(&view, &checker).await,
            (Err(e), _) | (_, Err(e)) => {
                let mut report = RunReport::default();
                report.push(rss::CASE_NAME, Outcome::Failed(e.to_string()), Vec::new());
                report
            }
        }
    }

    pub async fn run_rss_with(&self, view: &dyn RssView, checker: &LinkChecker) -> RunReport {
        let mut report = RunReport::default();
        let outcome =
            match rss::test_verify_rss_links(view, checker, self.config.rss.link_column).await {
                Ok(()) => Outcome::Passed,
                Err(e) => Outcome::Failed(e.to_string()),
            };
        report.push(rss::CASE_NAME, outcome, Vec::new());
        report
    }
}
