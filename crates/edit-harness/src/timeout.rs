//! Wall-clock limits for test case runs.

use crate::log::{Outcome, TestLog};
use crate::{TestError, TestResult};
use chrono::Utc;
use std::time::Duration;
use tokio::time::timeout;

/// Runs a case on a blocking task and gives up after a time limit.
///
/// The sequencer has no notion of time, so a hung control would hang the
/// whole run. The runner converts an overrun into an [`Outcome`] with
/// status `TimedOut`. The overrunning thread cannot be stopped and is
/// abandoned.
#[derive(Debug, Clone)]
pub struct TimeoutRunner {
    limit: Duration,
}

impl TimeoutRunner {
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// Run `job` for the case named `case`.
    pub async fn run<F>(&self, case: &str, job: F) -> Outcome
    where
        F: FnOnce() -> Outcome + Send + 'static,
    {
        let started = Utc::now();
        let handle = tokio::task::spawn_blocking(job);

        match timeout(self.limit, handle).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                let mut log = TestLog::new(case);
                log.record_error(&TestError::StepPanicked(e.to_string()));
                log.finish()
            }
            Err(_) => {
                tracing::error!(case, limit_ms = self.limit.as_millis() as u64, "case timed out");
                Outcome::timed_out(
                    case,
                    started,
                    format!("{}: {}", TestError::Timeout, humanize(self.limit)),
                )
            }
        }
    }

    /// Synchronous wrapper owning a private runtime.
    pub fn run_blocking<F>(&self, case: &str, job: F) -> TestResult<Outcome>
    where
        F: FnOnce() -> Outcome + Send + 'static,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        let outcome = runtime.block_on(self.run(case, job));
        // Do not wait for an abandoned case thread.
        runtime.shutdown_background();
        Ok(outcome)
    }
}

impl Default for TimeoutRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

fn humanize(limit: Duration) -> String {
    if limit.subsec_millis() == 0 {
        format!("exceeded {}s", limit.as_secs())
    } else {
        format!("exceeded {}ms", limit.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::OutcomeStatus;

    fn passing(case: &'static str) -> impl FnOnce() -> Outcome + Send + 'static {
        move || TestLog::new(case).finish()
    }

    #[tokio::test]
    async fn test_completes_within_limit() {
        let runner = TimeoutRunner::new(Duration::from_secs(5));
        let outcome = runner.run("quick", passing("quick")).await;
        assert_eq!(outcome.status, OutcomeStatus::Passed);
    }

    #[tokio::test]
    async fn test_overrun_times_out() {
        let runner = TimeoutRunner::new(Duration::from_millis(50));
        let outcome = runner
            .run("slow", || {
                std::thread::sleep(Duration::from_millis(500));
                TestLog::new("slow").finish()
            })
            .await;

        assert_eq!(outcome.status, OutcomeStatus::TimedOut);
        assert_eq!(outcome.case, "slow");
        assert_eq!(outcome.failures[0].message, "Timeout waiting for test case: exceeded 50ms");
    }

    #[tokio::test]
    async fn test_panicking_job_fails() {
        let runner = TimeoutRunner::new(Duration::from_secs(5));
        let outcome = runner
            .run("boom", || -> Outcome { panic!("case exploded") })
            .await;
        assert_eq!(outcome.status, OutcomeStatus::Failed);
    }

    #[test]
    fn test_run_blocking() {
        let runner = TimeoutRunner::new(Duration::from_secs(5));
        let outcome = runner.run_blocking("sync", passing("sync")).unwrap();
        assert!(outcome.passed());
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize(Duration::from_secs(3)), "exceeded 3s");
        assert_eq!(humanize(Duration::from_millis(1500)), "exceeded 1500ms");
    }
}
