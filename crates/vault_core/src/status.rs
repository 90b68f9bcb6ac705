//! Completion rules for a vault analysis
//!
//! The remote service reports progress through two tools whose payloads do
//! not always share a shape: sometimes the interesting fields sit under an
//! `analysis`/`report` key, sometimes at the top level. This module folds
//! both into a single [`StatusRecord`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Version whose completion is signalled by the snapshot report
pub const SNAPSHOT_VERSION: &str = "1.0.0";

/// Status value the remote analysis uses for a terminal failure
pub const FAILED_STATUS: &str = "failed";

/// Status used when neither payload carries one
pub const UNKNOWN_STATUS: &str = "unknown";

/// Normalized view of a vault's analysis progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: String,
    pub version: Option<String>,
    pub snapshot_url: Option<String>,
    pub comparison_url: Option<String>,
    pub complete: bool,
}

impl StatusRecord {
    /// Whether the remote analysis gave up
    pub fn is_failed(&self) -> bool {
        self.status == FAILED_STATUS
    }

    pub fn snapshot_ready(&self) -> bool {
        non_empty(self.snapshot_url.as_deref())
    }

    pub fn comparison_ready(&self) -> bool {
        non_empty(self.comparison_url.as_deref())
    }
}

/// Derive a [`StatusRecord`] from the summary and reports tool payloads.
///
/// Completion depends on the analysis version: `1.0.0` vaults are done once a
/// snapshot report exists, any later version once a comparison report exists.
/// Without a version the vault is never complete.
pub fn extract_report_status(
    summary: &Map<String, Value>,
    reports: &Map<String, Value>,
) -> StatusRecord {
    let analysis = nested_object(summary, "analysis");
    let report = nested_object(reports, "report");

    let status = first_truthy(analysis, report, "status")
        .map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| UNKNOWN_STATUS.to_string());

    let version = first_truthy(analysis, report, "version")
        .and_then(Value::as_str)
        .map(str::to_string);

    let snapshot_url = report_url(report, "snapshot_report");
    let comparison_url = report_url(report, "comparison_report");

    let complete = match version.as_deref() {
        Some(SNAPSHOT_VERSION) => non_empty(snapshot_url.as_deref()),
        Some(v) if !v.is_empty() => non_empty(comparison_url.as_deref()),
        _ => false,
    };

    StatusRecord {
        status,
        version,
        snapshot_url,
        comparison_url,
        complete,
    }
}

/// `payload[key]` when it is an object, otherwise the payload itself
fn nested_object<'a>(payload: &'a Map<String, Value>, key: &str) -> &'a Map<String, Value> {
    payload
        .get(key)
        .and_then(Value::as_object)
        .unwrap_or(payload)
}

fn first_truthy<'a>(
    primary: &'a Map<String, Value>,
    fallback: &'a Map<String, Value>,
    key: &str,
) -> Option<&'a Value> {
    primary
        .get(key)
        .filter(|v| is_truthy(v))
        .or_else(|| fallback.get(key).filter(|v| is_truthy(v)))
}

fn report_url(report: &Map<String, Value>, key: &str) -> Option<String> {
    report
        .get(key)
        .and_then(Value::as_object)
        .and_then(|artifact| artifact.get("url"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Null, false, zero and empty containers count as missing
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn non_empty(s: Option<&str>) -> bool {
    s.is_some_and(|s| !s.is_empty())
}
