//! RSS link suite: every feed listed in the RSS view must resolve

use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;

use crate::config::RssConfig;
use crate::error::{CaseError, CaseResult};

/// One row of the RSS listing table, cells as plain text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RssRow {
    pub cells: Vec<String>,
}

impl RssRow {
    pub fn cell(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(String::as_str)
    }
}

#[async_trait]
pub trait RssView: Send + Sync {
    async fn rows(&self) -> CaseResult<Vec<RssRow>>;
}

fn row_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr>").expect("valid regex"))
}

fn cell_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<td\b[^>]*>(.*?)</td>").expect("valid regex"))
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"))
}

fn csrf_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"<meta\s+name="csrf-token"\s+content="([^"]+)""#).expect("valid regex")
    })
}

fn cell_text(html: &str) -> String {
    let text = tag_re().replace_all(html, "");
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Body rows of every table in `html`; header rows (no `<td>`) are dropped
pub fn parse_table_rows(html: &str) -> Vec<RssRow> {
    row_re()
        .captures_iter(html)
        .filter_map(|row| {
            let cells: Vec<String> = cell_re()
                .captures_iter(&row[1])
                .map(|cell| cell_text(&cell[1]))
                .collect();
            (!cells.is_empty()).then_some(RssRow { cells })
        })
        .collect()
}

/// The RSS list page of the web UI, read with a logged-in session
pub struct UiRssView {
    http: reqwest::Client,
    base_url: url::Url,
    username: String,
    password: String,
    page_path: String,
}

impl UiRssView {
    pub fn new(
        base_url: &str,
        username: &str,
        password: &str,
        insecure: bool,
        rss: &RssConfig,
    ) -> CaseResult<Self> {
        let base_url = url::Url::parse(base_url)
            .map_err(|e| CaseError::Fixture(format!("invalid appliance url: {}", e)))?;
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(miqapi::ApiError::from)?;
        Ok(Self {
            http,
            base_url,
            username: username.to_string(),
            password: password.to_string(),
            page_path: rss.page_path.clone(),
        })
    }

    fn url(&self, path: &str) -> CaseResult<url::Url> {
        self.base_url
            .join(path)
            .map_err(|e| CaseError::Fixture(format!("invalid UI path `{}`: {}", path, e)))
    }

    async fn get_text(&self, path: &str) -> CaseResult<String> {
        let response = self
            .http
            .get(self.url(path)?)
            .send()
            .await
            .map_err(miqapi::ApiError::from)?;
        let status = response.status();
        if !status.is_success() {
            return Err(CaseError::Fixture(format!("GET {} returned {}", path, status)));
        }
        Ok(response.text().await.map_err(miqapi::ApiError::from)?)
    }

    async fn login(&self) -> CaseResult {
        let login_page = self.get_text("/").await?;
        let token = csrf_re()
            .captures(&login_page)
            .map(|c| c[1].to_string())
            .ok_or_else(|| CaseError::Fixture("login page carries no CSRF token".to_string()))?;

        let response = self
            .http
            .post(self.url("/dashboard/authenticate?button=login")?)
            .header("X-CSRF-Token", &token)
            .form(&[
                ("user_name", self.username.as_str()),
                ("user_password", self.password.as_str()),
                ("authenticity_token", token.as_str()),
            ])
            .send()
            .await
            .map_err(miqapi::ApiError::from)?;

        if !response.status().is_success() {
            return Err(CaseError::Fixture(format!(
                "UI login as `{}` returned {}",
                self.username,
                response.status()
            )));
        }
        tracing::debug!("Logged into the web UI as {}", self.username);
        Ok(())
    }
}

#[async_trait]
impl RssView for UiRssView {
    async fn rows(&self) -> CaseResult<Vec<RssRow>> {
        self.login().await?;
        let page = self.get_text(&self.page_path).await?;
        Ok(parse_table_rows(&page))
    }
}

/// Plain GET checks with certificate validation disabled and no retry
pub struct LinkChecker {
    http: reqwest::Client,
}

impl LinkChecker {
    pub fn new() -> CaseResult<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(miqapi::ApiError::from)?;
        Ok(Self { http })
    }

    /// Passes when the final status is in [200, 400)
    pub async fn check(&self, url: &str) -> CaseResult<u16> {
        let response = self.http.get(url).send().await.map_err(|e| CaseError::Link {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let status = response.status().as_u16();
        if (200..400).contains(&status) {
            Ok(status)
        } else {
            Err(CaseError::Link {
                url: url.to_string(),
                reason: format!("HTTP {}", status),
            })
        }
    }
}

pub const CASE_NAME: &str = "test_verify_rss_links";

/// Fetches every link in column `link_column` of the RSS view, failing on the first bad one
pub async fn test_verify_rss_links(
    view: &dyn RssView,
    checker: &LinkChecker,
    link_column: usize,
) -> CaseResult {
    let rows = view.rows().await?;
    tracing::debug!("RSS view lists {} feeds", rows.len());
    for row in &rows {
        let url = row.cell(link_column).ok_or_else(|| {
            CaseError::Assertion(format!(
                "RSS row has {} cells, no link in column {}",
                row.cells.len(),
                link_column
            ))
        })?;
        let status = checker.check(url).await?;
        tracing::debug!("{} -> {}", url, status);
    }
    Ok(())
}
