//! Structured data extraction pipeline.
//!
//! One extractor per data domain. Each navigates an authenticated context to
//! its page, waits (boundedly) for the template engine to settle, then walks
//! an ordered list of named strategies until one yields parseable data:
//!
//! 1. `backend-json` — replay the JSON endpoint the page calls internally,
//!    using the context's own cookies. Preferred: typed values, immune to
//!    DOM layout drift.
//! 2. `dom-table` / `dom-fields` — structural access to known element ids.
//!
//! Field-level parse failures are absorbed (empty/zero), junk rows are
//! filtered, and the caller can always tell "no data" from "could not read
//! the page" from "data there, unparseable — look at the screenshot".

pub mod attendance;
pub mod clean;
pub mod exam;
pub mod fees;
pub mod profile;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::browser::waits::{deadline, wait_for_templates_settled};
use crate::config::Config;
use crate::error::{PortalError, Result};

pub use attendance::{AttendanceExtractor, AttendanceReport, MonthAttendance};
pub use exam::{ExamExtractor, ExamResults, ExamRow};
pub use fees::{FeeLedger, FeeRow, FeesExtractor};
pub use profile::{ProfileExtractor, ProfileField, StudentProfile};

/// The four data domains the portal exposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    Attendance,
    Fees,
    Exam,
    Profile,
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Domain::Attendance => "attendance",
            Domain::Fees => "fees",
            Domain::Exam => "exam",
            Domain::Profile => "profile",
        };
        write!(f, "{name}")
    }
}

/// Normalized payload, one variant per domain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RecordPayload {
    Attendance(AttendanceReport),
    Fees(FeeLedger),
    Exam(ExamResults),
    Profile(StudentProfile),
}

/// What one extraction produced. `NoData` is a valid empty result;
/// `Unparsed` means content was there but could not be read into shape.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ExtractOutcome {
    Data(RecordPayload),
    NoData,
    Unparsed { screenshot: Option<PathBuf> },
}

/// A point-in-time extraction result. Immutable once produced; safe to
/// cache and to persist as a snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub domain: Domain,
    pub captured_at: DateTime<Utc>,
    pub outcome: ExtractOutcome,
}

impl ExtractedRecord {
    pub fn data(domain: Domain, payload: RecordPayload) -> Self {
        Self { domain, captured_at: Utc::now(), outcome: ExtractOutcome::Data(payload) }
    }

    pub fn no_data(domain: Domain) -> Self {
        Self { domain, captured_at: Utc::now(), outcome: ExtractOutcome::NoData }
    }

    pub fn unparsed(domain: Domain, screenshot: Option<PathBuf>) -> Self {
        Self { domain, captured_at: Utc::now(), outcome: ExtractOutcome::Unparsed { screenshot } }
    }
}

/// Extractor seam. Production extractors run over a
/// [`crate::browser::PortalContext`]; tests substitute scripted fakes.
#[async_trait]
pub trait Extract<C>: Send + Sync + 'static {
    fn domain(&self) -> Domain;

    /// Convert the domain's page into a record. Infrastructure failure
    /// (page unreachable after one retry, selector machinery gone) is the
    /// only `Err`; everything content-shaped lands in the record itself.
    async fn extract(&self, ctx: &C) -> Result<ExtractedRecord>;
}

// ---------- backend JSON helpers ----------

/// Accept a backend payload as a bare array or wrapped under `data`/`rows`.
pub(crate) fn json_rows(value: &JsonValue) -> Option<&Vec<JsonValue>> {
    if let Some(array) = value.as_array() {
        return Some(array);
    }
    for key in ["data", "rows", "result"] {
        if let Some(array) = value.get(key).and_then(|v| v.as_array()) {
            return Some(array);
        }
    }
    None
}

/// Pull a numeric field the backend may send as number or display string.
pub(crate) fn num_field(item: &JsonValue, keys: &[&str]) -> Option<f64> {
    for key in keys {
        match item.get(*key) {
            Some(JsonValue::Number(n)) => return n.as_f64(),
            Some(JsonValue::String(s)) => return Some(clean::normalize_number(s)),
            _ => {}
        }
    }
    None
}

/// Pull a non-junk string field under the first matching key.
pub(crate) fn str_field(item: &JsonValue, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(s) = item.get(*key).and_then(|v| v.as_str()) {
            let s = s.trim();
            if !clean::is_junk(s) {
                return Some(s.to_string());
            }
        }
    }
    None
}

// ---------- strategy plumbing ----------

/// One named way of getting a page's data out.
pub(crate) struct Strategy {
    pub name: &'static str,
    pub kind: StrategyKind,
}

pub(crate) enum StrategyKind {
    /// Replay the page's internal JSON endpoint with the session's cookies.
    BackendJson { api_path: String },
    /// Collect a table's cell texts, row by row.
    DomTable { table_selector: &'static str },
    /// Read labelled single fields by element id.
    DomFields { fields: &'static [(&'static str, &'static str)] },
}

/// Raw material a strategy produced, before domain parsing.
pub(crate) enum StrategyData {
    Json(JsonValue),
    Rows(Vec<Vec<String>>),
}

/// Domain-parse verdict over one strategy's data.
pub(crate) enum Parsed<T> {
    Data(T),
    NoData,
    Unparsed,
}

/// Final verdict after walking the strategy list.
pub(crate) enum Verdict<T> {
    Data(T),
    NoData,
    Unparsed,
}

/// Navigate to `url`, retrying once on a transient failure. A second
/// failure is an extraction error; the page state is then unknown.
pub(crate) async fn navigate_with_retry(config: &Config, page: &Page, url: &str) -> Result<()> {
    let bound = Duration::from_secs(config.nav_timeout_secs);
    let goto = || async {
        deadline(bound, "navigating", async {
            page.goto(url).await.map_err(|e| {
                crate::error::BrowserError::NavigationFailed {
                    url: url.to_string(),
                    source: e,
                }
            })?;
            Ok(())
        })
        .await
    };

    if let Err(first) = goto().await {
        warn!("navigation to {} failed ({}), retrying once", url, first);
        goto().await.map_err(|e| {
            PortalError::Extraction(format!("page {url} unreachable after retry: {e}"))
        })?;
    }
    Ok(())
}

/// Bounded wait for client-side template rendering, then proceed either way.
pub(crate) async fn settle_templates(config: &Config, page: &Page) {
    wait_for_templates_settled(
        page,
        Duration::from_millis(config.render_settle_ms),
        Duration::from_millis(config.poll_interval_ms),
    )
    .await;
}

/// Fetch one strategy's raw data.
async fn fetch_strategy(
    config: &Config,
    http: &reqwest::Client,
    page: &Page,
    strategy: &Strategy,
) -> Result<StrategyData> {
    match &strategy.kind {
        StrategyKind::BackendJson { api_path } => {
            let cookies = page.get_cookies().await?;
            let cookie_header = cookies
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; ");
            let url = config.url(api_path);
            let response = http
                .get(&url)
                .header(reqwest::header::COOKIE, cookie_header)
                .header(reqwest::header::ACCEPT, "application/json")
                .timeout(Duration::from_secs(config.nav_timeout_secs))
                .send()
                .await
                .map_err(|e| PortalError::Extraction(format!("backend endpoint {url}: {e}")))?;
            if !response.status().is_success() {
                return Err(PortalError::Extraction(format!(
                    "backend endpoint {url} returned {}",
                    response.status()
                )));
            }
            let value = response
                .json::<JsonValue>()
                .await
                .map_err(|e| PortalError::Extraction(format!("backend endpoint {url}: {e}")))?;
            Ok(StrategyData::Json(value))
        }
        StrategyKind::DomTable { table_selector } => {
            let js = format!(
                r#"
                (() => {{
                    const table = document.querySelector('{table_selector}');
                    if (!table) return [];
                    return Array.from(table.querySelectorAll('tr')).map(tr =>
                        Array.from(tr.querySelectorAll('td,th')).map(cell => cell.innerText));
                }})()
                "#
            );
            let rows: Vec<Vec<String>> = page.evaluate(js).await?.into_value()?;
            Ok(StrategyData::Rows(rows))
        }
        StrategyKind::DomFields { fields } => {
            let entries: Vec<String> = fields
                .iter()
                .map(|(label, selector)| {
                    format!("{}: get('{selector}')", serde_json::Value::from(*label))
                })
                .collect();
            let js = format!(
                r#"
                (() => {{
                    const get = s => {{
                        const el = document.querySelector(s);
                        return el ? el.innerText : "";
                    }};
                    return {{ {} }};
                }})()
                "#,
                entries.join(", ")
            );
            let value: JsonValue = page.evaluate(js).await?.into_value()?;
            Ok(StrategyData::Json(value))
        }
    }
}

/// Walk the strategy list in order; the first strategy whose data parses
/// wins. Strategies that error are logged and skipped. Precedence of the
/// fallback verdicts: unparseable content outranks a clean empty, and only
/// every-strategy-failing is an extraction error.
pub(crate) async fn run_strategies<T>(
    config: &Config,
    http: &reqwest::Client,
    page: &Page,
    domain: Domain,
    strategies: &[Strategy],
    parse: impl Fn(&StrategyData) -> Parsed<T>,
) -> Result<Verdict<T>> {
    let mut saw_unparsed = false;
    let mut saw_empty = false;
    let mut failures = 0usize;

    for strategy in strategies {
        match fetch_strategy(config, http, page, strategy).await {
            Ok(data) => match parse(&data) {
                Parsed::Data(value) => {
                    info!("📥 {domain}: strategy '{}' succeeded", strategy.name);
                    return Ok(Verdict::Data(value));
                }
                Parsed::NoData => {
                    debug!("{domain}: strategy '{}' found no rows", strategy.name);
                    saw_empty = true;
                }
                Parsed::Unparsed => {
                    warn!("{domain}: strategy '{}' found content it could not parse", strategy.name);
                    saw_unparsed = true;
                }
            },
            Err(e) => {
                warn!("{domain}: strategy '{}' failed: {}", strategy.name, e);
                failures += 1;
            }
        }
    }

    if saw_unparsed {
        Ok(Verdict::Unparsed)
    } else if saw_empty {
        Ok(Verdict::NoData)
    } else {
        Err(PortalError::Extraction(format!(
            "{domain}: all {failures} strategies failed"
        )))
    }
}
