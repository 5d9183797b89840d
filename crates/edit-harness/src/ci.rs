//! CI integration utilities.

use crate::log::{Outcome, OutcomeStatus};
use crate::{TestResult, UPDATE_MASTERS};
use std::env;
use std::path::Path;

/// Environment variable for CI detection.
pub const CI_VAR: &str = "CI";

/// Check if running in a CI environment.
pub fn is_ci() -> bool {
    env::var(CI_VAR).is_ok()
        || env::var("CONTINUOUS_INTEGRATION").is_ok()
        || env::var("GITHUB_ACTIONS").is_ok()
        || env::var("GITLAB_CI").is_ok()
        || env::var("TRAVIS").is_ok()
        || env::var("CIRCLECI").is_ok()
        || env::var("JENKINS_URL").is_ok()
}

/// Check if master images should be rewritten from samples.
pub fn should_update_masters() -> bool {
    env::var(UPDATE_MASTERS).is_ok()
}

/// Configuration for CI-specific behavior.
#[derive(Debug, Clone)]
pub struct CiConfig {
    /// Whether to use colored output.
    pub colored_output: bool,
    /// Whether to list every failure in the summary.
    pub verbose_failures: bool,
    /// Whether to stop a case at its first failing combination.
    pub fail_fast: bool,
    /// Failures listed per case when not verbose.
    pub max_failures_shown: usize,
    /// Whether to emit GitHub Actions annotations.
    pub annotations: bool,
    /// Whether running in CI.
    pub is_ci: bool,
}

impl CiConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Self {
        let is_ci = is_ci();

        Self {
            // No colours in CI unless forced
            colored_output: !is_ci || env::var("FORCE_COLOR").is_ok(),
            verbose_failures: is_ci || env::var("VERBOSE_FAILURES").is_ok(),
            fail_fast: is_ci && env::var("NO_FAIL_FAST").is_err(),
            max_failures_shown: if is_ci { 100 } else { 10 },
            annotations: env::var("GITHUB_ACTIONS").is_ok(),
            is_ci,
        }
    }

    /// Create local development configuration.
    pub fn local() -> Self {
        Self {
            colored_output: true,
            verbose_failures: false,
            fail_fast: false,
            max_failures_shown: 10,
            annotations: false,
            is_ci: false,
        }
    }

    /// Create CI-specific configuration.
    pub fn ci() -> Self {
        Self {
            colored_output: false,
            verbose_failures: true,
            fail_fast: true,
            max_failures_shown: 100,
            annotations: false,
            is_ci: true,
        }
    }

    pub fn with_colors(mut self, enabled: bool) -> Self {
        self.colored_output = enabled;
        self
    }

    pub fn with_fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = enabled;
        self
    }

    pub fn with_max_failures_shown(mut self, count: usize) -> Self {
        self.max_failures_shown = count;
        self
    }
}

impl Default for CiConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Aggregates case outcomes for the end-of-run report.
#[derive(Debug, Default)]
pub struct TestReporter {
    outcomes: Vec<Outcome>,
    max_failures_shown: Option<usize>,
}

impl TestReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reporter honouring the failure listing limit of `config`.
    pub fn with_config(config: &CiConfig) -> Self {
        Self {
            outcomes: Vec::new(),
            max_failures_shown: (!config.verbose_failures).then_some(config.max_failures_shown),
        }
    }

    /// Record a finished case.
    pub fn record(&mut self, outcome: Outcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn passed(&self) -> usize {
        self.count(OutcomeStatus::Passed)
    }

    pub fn failed(&self) -> usize {
        self.count(OutcomeStatus::Failed)
    }

    pub fn timed_out(&self) -> usize {
        self.count(OutcomeStatus::TimedOut)
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(Outcome::passed)
    }

    fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Generate a summary report.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Test Results:".to_string(),
            format!("  Passed:    {}", self.passed()),
            format!("  Failed:    {}", self.failed()),
            format!("  Timed out: {}", self.timed_out()),
            format!("  Total:     {}", self.total()),
        ];

        let failing: Vec<&Outcome> = self.outcomes.iter().filter(|o| !o.passed()).collect();
        if !failing.is_empty() {
            lines.push(String::new());
            lines.push("Failures:".to_string());

            for outcome in failing {
                lines.push(format!("  {}", outcome.summary()));
                let limit = self.max_failures_shown.unwrap_or(usize::MAX);
                for failure in outcome.failures.iter().take(limit) {
                    lines.push(format!("    {}", failure));
                }
                if outcome.failures.len() > limit {
                    lines.push(format!("    ... {} more", outcome.failures.len() - limit));
                }
            }
        }

        lines.join("\n")
    }

    /// Write all outcomes as a JSON array.
    pub fn write_json(&self, path: impl AsRef<Path>) -> TestResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&self.outcomes)?)?;
        Ok(())
    }

    /// Process exit code: 0 when everything passed.
    pub fn exit_code(&self) -> i32 {
        if self.all_passed() {
            0
        } else {
            1
        }
    }
}

/// Utilities for GitHub Actions.
pub mod github_actions {
    use crate::log::Outcome;

    /// Output an error annotation.
    pub fn error(message: &str) {
        println!("::error::{}", escape(message));
    }

    /// Output a warning annotation.
    pub fn warning(message: &str) {
        println!("::warning::{}", escape(message));
    }

    /// Start a group in the log.
    pub fn group(name: &str) {
        println!("::group::{}", name);
    }

    /// End a group in the log.
    pub fn endgroup() {
        println!("::endgroup::");
    }

    /// One error annotation per failure of a case.
    pub fn annotate(outcome: &Outcome) {
        for failure in &outcome.failures {
            error(&format!("{}: {}", outcome.case, failure));
        }
    }

    /// Annotation messages cannot contain raw newlines.
    pub fn escape(message: &str) -> String {
        message
            .replace('%', "%25")
            .replace('\r', "%0D")
            .replace('\n', "%0A")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::TestLog;

    #[test]
    fn test_ci_config_local() {
        let config = CiConfig::local();
        assert!(config.colored_output);
        assert!(!config.verbose_failures);
        assert!(!config.fail_fast);
        assert!(!config.is_ci);
    }

    #[test]
    fn test_ci_config_ci() {
        let config = CiConfig::ci();
        assert!(!config.colored_output);
        assert!(config.verbose_failures);
        assert!(config.fail_fast);
        assert!(config.is_ci);
    }

    fn outcome(case: &str, failures: &[&str]) -> Outcome {
        let mut log = TestLog::new(case);
        for (i, message) in failures.iter().enumerate() {
            log.begin_combination(i, format!("N={}", i));
            log.fail(*message);
            log.end_combination();
        }
        log.finish()
    }

    #[test]
    fn test_reporter_counts() {
        let mut reporter = TestReporter::new();
        reporter.record(outcome("a", &[]));
        reporter.record(outcome("b", &["bad"]));
        reporter.record(Outcome::timed_out("c", chrono::Utc::now(), "too slow"));

        assert_eq!(reporter.total(), 3);
        assert_eq!(reporter.passed(), 1);
        assert_eq!(reporter.failed(), 1);
        assert_eq!(reporter.timed_out(), 1);
        assert!(!reporter.all_passed());
        assert_eq!(reporter.exit_code(), 1);
    }

    #[test]
    fn test_reporter_summary() {
        let mut reporter = TestReporter::with_config(&CiConfig::local().with_max_failures_shown(1));
        reporter.record(outcome("accepts-tab", &[]));
        reporter.record(outcome("max-length", &["Text length: expected 3, actual 4", "second"]));

        insta::assert_snapshot!(reporter.summary(), @r"
        Test Results:
          Passed:    1
          Failed:    1
          Timed out: 0
          Total:     2

        Failures:
          max-length: FAILED (2 combinations, 2 failed)
            [#0 N=0] Text length: expected 3, actual 4
            ... 1 more
        ");
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report/outcomes.json");
        let mut reporter = TestReporter::new();
        reporter.record(outcome("a", &[]));
        reporter.write_json(&path).unwrap();

        let back: Vec<Outcome> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].case, "a");
    }

    #[test]
    fn test_escape_annotation() {
        assert_eq!(github_actions::escape("a\nb 100%"), "a%0Ab 100%25");
    }
}
