use std::collections::BTreeMap;
use std::time::Duration;

use owo_colors::{OwoColorize, Stream};
use vault_core::{PollObserver, StatusRecord};

/// Terminal output for a poll run.
///
/// Progress and results go to stdout, retries and failures to stderr.
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// Print the final record after completion criteria are met
    pub fn completed(&self, status: &StatusRecord) -> miette::Result<()> {
        println!(
            "{}",
            "Completion criteria met.".if_supports_color(Stream::Stdout, |t| t.bright_green())
        );
        if let Some(url) = status.snapshot_url.as_deref().filter(|u| !u.is_empty()) {
            println!("Snapshot report: {}", url);
        }
        if let Some(url) = status.comparison_url.as_deref().filter(|u| !u.is_empty()) {
            println!("Comparison report: {}", url);
        }
        if self.json {
            println!("{}", format_status_json(status)?);
        }
        Ok(())
    }

    pub fn analysis_failed(&self) {
        eprintln!(
            "{}",
            "Analysis failed. Stop polling and inspect vault details."
                .if_supports_color(Stream::Stderr, |t| t.bright_red())
        );
    }
}

impl PollObserver for Output {
    fn on_status(&mut self, attempt: u32, status: &StatusRecord) {
        println!("{}", format_progress(attempt, status));
    }

    fn on_request_failed(
        &mut self,
        attempt: u32,
        error: &(dyn std::error::Error + 'static),
        retry_in: Duration,
    ) {
        eprintln!("Attempt {}: request failed: {}", attempt, error);
        eprintln!("Retrying in {}s...", retry_in.as_secs());
    }

    fn on_waiting(&mut self, _attempt: u32, wait: Duration) {
        println!("Not complete yet, waiting {}s...", wait.as_secs());
    }

    fn on_timeout(&mut self, _attempts: u32, _elapsed: Duration) {
        eprintln!(
            "{}",
            "Timed out before completion criteria were met."
                .if_supports_color(Stream::Stderr, |t| t.yellow())
        );
    }
}

/// One-line progress summary for an attempt
pub fn format_progress(attempt: u32, status: &StatusRecord) -> String {
    format!(
        "Attempt {}: status={} version={} snapshot_ready={} comparison_ready={}",
        attempt,
        status.status,
        status.version.as_deref().unwrap_or("None"),
        status.snapshot_ready(),
        status.comparison_ready()
    )
}

/// Pretty JSON with keys in sorted order
pub fn format_status_json(status: &StatusRecord) -> miette::Result<String> {
    use miette::IntoDiagnostic;

    let value = serde_json::to_value(status).into_diagnostic()?;
    let sorted: BTreeMap<String, serde_json::Value> =
        serde_json::from_value(value).into_diagnostic()?;
    serde_json::to_string_pretty(&sorted).into_diagnostic()
}
