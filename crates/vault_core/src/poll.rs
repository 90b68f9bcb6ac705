//! Poll driver
//!
//! Repeatedly fetches the vault summary and reports, classifies them with
//! [`extract_report_status`], and decides whether to stop or wait. Failed
//! tool calls and incomplete results share the same backoff; the loop is
//! bounded only by the overall timeout.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    config::PollConfig,
    status::{StatusRecord, extract_report_status},
    tool::{REPORTS_TOOL, SUMMARY_TOOL, ToolCaller, vault_arguments},
};

/// How a poll run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Completion criteria were met
    Completed(StatusRecord),
    /// The remote analysis reported `failed`
    AnalysisFailed(StatusRecord),
    /// The overall timeout elapsed first
    TimedOut { elapsed: Duration, attempts: u32 },
}

impl PollOutcome {
    /// Process exit code for this outcome
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Completed(_) => 0,
            Self::TimedOut { .. } => 1,
            Self::AnalysisFailed(_) => 2,
        }
    }
}

/// Receives progress from a poll run. All methods default to doing nothing.
pub trait PollObserver {
    /// A status record was derived on `attempt`
    fn on_status(&mut self, _attempt: u32, _status: &StatusRecord) {}

    /// A tool call failed; the driver sleeps `retry_in` before trying again
    fn on_request_failed(
        &mut self,
        _attempt: u32,
        _error: &(dyn std::error::Error + 'static),
        _retry_in: Duration,
    ) {
    }

    /// The vault is not complete yet; the driver sleeps `wait`
    fn on_waiting(&mut self, _attempt: u32, _wait: Duration) {}

    /// The overall timeout elapsed before the next attempt could start
    fn on_timeout(&mut self, _attempts: u32, _elapsed: Duration) {}
}

impl PollObserver for () {}

/// Drives the poll loop for a single vault
pub struct VaultPoller<T> {
    tools: T,
    config: PollConfig,
    attempt: u32,
}

impl<T: ToolCaller> VaultPoller<T> {
    pub fn new(tools: T, config: PollConfig) -> Self {
        Self {
            tools,
            config,
            attempt: 1,
        }
    }

    /// Current attempt number, starting at 1
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn into_inner(self) -> T {
        self.tools
    }

    /// Poll until the vault completes, fails, or the timeout elapses
    pub async fn run<O: PollObserver>(
        &mut self,
        vault_id: &str,
        observer: &mut O,
    ) -> PollOutcome {
        let start = Instant::now();
        let backoff = self.config.backoff();
        let timeout_secs = self.config.timeout_secs;

        info!(vault_id, timeout_secs, "Polling vault");

        loop {
            let elapsed = start.elapsed();
            if elapsed.as_secs() > timeout_secs {
                warn!(vault_id, attempts = self.attempt, "Timed out waiting for vault");
                observer.on_timeout(self.attempt, elapsed);
                return PollOutcome::TimedOut {
                    elapsed,
                    attempts: self.attempt,
                };
            }

            let status = match self.fetch_status(vault_id).await {
                Ok(status) => status,
                Err(e) => {
                    let wait = backoff.delay_for(self.attempt);
                    warn!(attempt = self.attempt, "Request failed: {}", e);
                    observer.on_request_failed(self.attempt, &e, wait);
                    tokio::time::sleep(wait).await;
                    self.attempt = self.attempt.saturating_add(1);
                    continue;
                }
            };

            debug!(attempt = self.attempt, ?status, "Derived vault status");
            observer.on_status(self.attempt, &status);

            if status.is_failed() {
                info!(vault_id, "Analysis reported failure");
                return PollOutcome::AnalysisFailed(status);
            }

            if status.complete {
                info!(vault_id, attempts = self.attempt, "Completion criteria met");
                return PollOutcome::Completed(status);
            }

            let wait = backoff.delay_for(self.attempt);
            observer.on_waiting(self.attempt, wait);
            tokio::time::sleep(wait).await;
            self.attempt = self.attempt.saturating_add(1);
        }
    }

    async fn fetch_status(
        &mut self,
        vault_id: &str,
    ) -> std::result::Result<StatusRecord, T::Error> {
        let summary = self
            .tools
            .call_tool(SUMMARY_TOOL, vault_arguments(vault_id))
            .await?;
        let reports = self
            .tools
            .call_tool(REPORTS_TOOL, vault_arguments(vault_id))
            .await?;

        Ok(extract_report_status(&summary, &reports))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::{Map, Value, json};
    use std::collections::VecDeque;

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct FakeError(String);

    type Reply = std::result::Result<Map<String, Value>, FakeError>;

    /// Replays canned replies in order, then fails every call
    struct ScriptedTools {
        replies: VecDeque<Reply>,
        calls: Vec<(String, Map<String, Value>)>,
    }

    impl ScriptedTools {
        fn new(replies: Vec<Reply>) -> Self {
            Self {
                replies: replies.into(),
                calls: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl ToolCaller for ScriptedTools {
        type Error = FakeError;

        async fn call_tool(&mut self, name: &str, arguments: Map<String, Value>) -> Reply {
            self.calls.push((name.to_string(), arguments));
            self.replies
                .pop_front()
                .unwrap_or_else(|| Err(FakeError("connection refused".to_string())))
        }
    }

    #[derive(Debug, PartialEq)]
    enum Event {
        Status(u32, StatusRecord),
        Failed(u32, String, Duration),
        Waiting(u32, Duration),
        TimedOut(u32, u64),
    }

    #[derive(Default)]
    struct Recorder(Vec<Event>);

    impl PollObserver for Recorder {
        fn on_status(&mut self, attempt: u32, status: &StatusRecord) {
            self.0.push(Event::Status(attempt, status.clone()));
        }

        fn on_request_failed(
            &mut self,
            attempt: u32,
            error: &(dyn std::error::Error + 'static),
            retry_in: Duration,
        ) {
            self.0.push(Event::Failed(attempt, error.to_string(), retry_in));
        }

        fn on_waiting(&mut self, attempt: u32, wait: Duration) {
            self.0.push(Event::Waiting(attempt, wait));
        }

        fn on_timeout(&mut self, attempts: u32, elapsed: Duration) {
            self.0.push(Event::TimedOut(attempts, elapsed.as_secs()));
        }
    }

    fn ok(value: Value) -> Reply {
        match value {
            Value::Object(map) => Ok(map),
            other => panic!("expected object, got {other}"),
        }
    }

    fn config(timeout_secs: u64) -> PollConfig {
        PollConfig {
            initial_delay_secs: 5,
            max_delay_secs: 60,
            timeout_secs,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_ready_completes_immediately() {
        let tools = ScriptedTools::new(vec![
            ok(json!({"analysis": {"status": "running", "version": "1.0.0"}})),
            ok(json!({"report": {"snapshot_report": {"url": "https://x/s"}}})),
        ]);
        let mut poller = VaultPoller::new(tools, config(3600));

        let outcome = poller.run("vault-1", &mut ()).await;

        let expected = StatusRecord {
            status: "running".to_string(),
            version: Some("1.0.0".to_string()),
            snapshot_url: Some("https://x/s".to_string()),
            comparison_url: None,
            complete: true,
        };
        assert_eq!(outcome, PollOutcome::Completed(expected));
        assert_eq!(outcome.exit_code(), 0);

        let tools = poller.into_inner();
        let names: Vec<&str> = tools.calls.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec![SUMMARY_TOOL, REPORTS_TOOL]);
        for (_, args) in &tools.calls {
            assert_eq!(args.get("vault_id"), Some(&json!("vault-1")));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_status_stops_polling() {
        let tools = ScriptedTools::new(vec![
            ok(json!({"analysis": {"status": "failed"}})),
            ok(json!({})),
        ]);
        let mut poller = VaultPoller::new(tools, config(3600));

        let outcome = poller.run("vault-1", &mut ()).await;

        assert!(matches!(outcome, PollOutcome::AnalysisFailed(ref s) if s.status == "failed"));
        assert_eq!(outcome.exit_code(), 2);
        assert_eq!(poller.attempt(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_status_wins_over_completion() {
        let tools = ScriptedTools::new(vec![
            ok(json!({"analysis": {"status": "failed", "version": "2.0.0"}})),
            ok(json!({"report": {"comparison_report": {"url": "https://x/c"}}})),
        ]);
        let mut poller = VaultPoller::new(tools, config(3600));

        let outcome = poller.run("vault-1", &mut ()).await;
        assert_eq!(outcome.exit_code(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_failures_end_in_timeout() {
        let tools = ScriptedTools::new(Vec::new());
        let mut poller = VaultPoller::new(tools, config(30));
        let mut recorder = Recorder::default();

        let started = Instant::now();
        let outcome = poller.run("vault-1", &mut recorder).await;

        // 5 + 10 + 20 seconds of backoff crosses the 30 second limit
        let PollOutcome::TimedOut { elapsed, attempts } = outcome else {
            panic!("expected timeout, got {outcome:?}");
        };
        assert_eq!(attempts, 4);
        assert_eq!(elapsed.as_secs(), 35);
        assert_eq!(started.elapsed().as_secs(), 35);
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(
            recorder.0,
            vec![
                Event::Failed(1, "connection refused".to_string(), Duration::from_secs(5)),
                Event::Failed(2, "connection refused".to_string(), Duration::from_secs(10)),
                Event::Failed(3, "connection refused".to_string(), Duration::from_secs(20)),
                Event::TimedOut(4, 35),
            ]
        );
        assert_eq!(poller.into_inner().calls.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_exactly_at_timeout_still_polls() {
        let tools = ScriptedTools::new(Vec::new());
        let mut poller = VaultPoller::new(tools, config(35));
        let mut recorder = Recorder::default();

        let outcome = poller.run("vault-1", &mut recorder).await;

        // The fourth attempt starts at exactly 35s and is still made
        let PollOutcome::TimedOut { elapsed, attempts } = outcome else {
            panic!("expected timeout, got {outcome:?}");
        };
        assert_eq!(attempts, 5);
        assert_eq!(elapsed.as_secs(), 75);
        assert_eq!(recorder.0.last(), Some(&Event::TimedOut(5, 75)));
        assert_eq!(
            recorder.0[3],
            Event::Failed(4, "connection refused".to_string(), Duration::from_secs(40))
        );
        assert_eq!(poller.into_inner().calls.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_with_backoff_until_complete() {
        let pending = json!({"analysis": {"status": "running", "version": "2.0.0"}});
        let tools = ScriptedTools::new(vec![
            ok(pending.clone()),
            ok(json!({"report": {}})),
            Err(FakeError("gateway timeout".to_string())),
            ok(pending.clone()),
            ok(json!({"report": {"comparison_report": {"url": "https://x/c"}}})),
        ]);
        let mut poller = VaultPoller::new(tools, config(3600));
        let mut recorder = Recorder::default();

        let outcome = poller.run("vault-1", &mut recorder).await;

        let PollOutcome::Completed(record) = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(record.comparison_url.as_deref(), Some("https://x/c"));
        assert_eq!(poller.attempt(), 3);

        let pending_record = StatusRecord {
            status: "running".to_string(),
            version: Some("2.0.0".to_string()),
            snapshot_url: None,
            comparison_url: None,
            complete: false,
        };
        assert_eq!(
            recorder.0,
            vec![
                Event::Status(1, pending_record),
                Event::Waiting(1, Duration::from_secs(5)),
                Event::Failed(2, "gateway timeout".to_string(), Duration::from_secs(10)),
                Event::Status(3, record),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_urls_poll_until_timeout() {
        let mut replies = Vec::new();
        for _ in 0..10 {
            replies.push(ok(json!({"analysis": {"status": "completed", "version": "2.0.0"}})));
            replies.push(ok(json!({"report": {}})));
        }
        let mut poller = VaultPoller::new(ScriptedTools::new(replies), config(100));

        let outcome = poller.run("vault-1", &mut ()).await;

        // 5 + 10 + 20 + 40 + 60 = 135 seconds elapsed at the sixth check
        let PollOutcome::TimedOut { elapsed, attempts } = outcome else {
            panic!("expected timeout, got {outcome:?}");
        };
        assert_eq!(attempts, 6);
        assert_eq!(elapsed.as_secs(), 135);
    }
}
