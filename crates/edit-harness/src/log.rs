//! Per-run test log and verification.

use crate::bitmap::Bitmap;
use crate::{TestError, TestResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Final status of a test case run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Passed,
    Failed,
    TimedOut,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => f.write_str("PASSED"),
            Self::Failed => f.write_str("FAILED"),
            Self::TimedOut => f.write_str("TIMED OUT"),
        }
    }
}

/// A recorded verification failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    /// Ordinal of the combination the failure occurred in.
    pub combination: Option<usize>,
    /// Short description of that combination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub message: String,
    /// Whether the failure aborted its combination.
    pub fatal: bool,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.combination, &self.description) {
            (Some(n), Some(d)) => write!(f, "[#{} {}] {}", n, d, self.message),
            (Some(n), None) => write!(f, "[#{}] {}", n, self.message),
            _ => f.write_str(&self.message),
        }
    }
}

/// Result of running one test case over all its combinations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub case: String,
    pub status: OutcomeStatus,
    pub failures: Vec<Failure>,
    pub combinations_run: usize,
    /// Ordinals of combinations with at least one failure.
    pub combinations_failed: Vec<usize>,
    /// Combinations the case declined to run.
    #[serde(default)]
    pub combinations_skipped: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<PathBuf>,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
}

impl Outcome {
    /// Outcome for a case that exceeded its time limit.
    pub fn timed_out(case: impl Into<String>, started: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            case: case.into(),
            status: OutcomeStatus::TimedOut,
            failures: vec![Failure {
                combination: None,
                description: None,
                message: message.into(),
                fatal: true,
            }],
            combinations_run: 0,
            combinations_failed: Vec::new(),
            combinations_skipped: 0,
            images: Vec::new(),
            started,
            finished: Utc::now(),
        }
    }

    pub fn passed(&self) -> bool {
        self.status == OutcomeStatus::Passed
    }

    /// Wall-clock duration of the run.
    pub fn duration(&self) -> chrono::Duration {
        self.finished - self.started
    }

    /// One-line summary, e.g. `accepts-tab: FAILED (12 combinations, 1 failed)`.
    pub fn summary(&self) -> String {
        format!(
            "{}: {} ({} combinations, {} failed)",
            self.case,
            self.status,
            self.combinations_run,
            self.combinations_failed.len()
        )
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> TestResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone)]
struct Current {
    ordinal: usize,
    description: String,
    failures_at_start: usize,
}

/// Collects verification results for one test case run.
///
/// Created with [`TestLog::new`], bracketed per combination with
/// [`begin_combination`](Self::begin_combination) and
/// [`end_combination`](Self::end_combination), and closed with
/// [`finish`](Self::finish).
#[derive(Debug)]
pub struct TestLog {
    case: String,
    artifacts_dir: Option<PathBuf>,
    started: DateTime<Utc>,
    current: Option<Current>,
    failures: Vec<Failure>,
    messages: Vec<String>,
    images: Vec<PathBuf>,
    combinations_run: usize,
    combinations_failed: Vec<usize>,
    combinations_skipped: usize,
}

impl TestLog {
    pub fn new(case: impl Into<String>) -> Self {
        Self {
            case: case.into(),
            artifacts_dir: None,
            started: Utc::now(),
            current: None,
            failures: Vec::new(),
            messages: Vec::new(),
            images: Vec::new(),
            combinations_run: 0,
            combinations_failed: Vec::new(),
            combinations_skipped: 0,
        }
    }

    /// Write logged images below `dir`.
    pub fn with_artifacts(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = Some(dir.into());
        self
    }

    pub fn set_artifacts_dir(&mut self, dir: Option<PathBuf>) {
        self.artifacts_dir = dir;
    }

    pub fn case(&self) -> &str {
        &self.case
    }

    pub fn artifacts_dir(&self) -> Option<&Path> {
        self.artifacts_dir.as_deref()
    }

    /// Ordinal of the combination being run, if any.
    pub fn current_combination(&self) -> Option<usize> {
        self.current.as_ref().map(|c| c.ordinal)
    }

    /// Start recording a combination.
    pub fn begin_combination(&mut self, ordinal: usize, description: impl Into<String>) {
        let description = description.into();
        tracing::debug!(case = %self.case, combination = ordinal, %description, "combination started");
        self.current = Some(Current {
            ordinal,
            description,
            failures_at_start: self.failures.len(),
        });
    }

    /// Finish the current combination; returns true when it recorded failures.
    pub fn end_combination(&mut self) -> bool {
        let Some(current) = self.current.take() else {
            return false;
        };
        self.combinations_run += 1;
        let failed = self.failures.len() > current.failures_at_start;
        if failed {
            self.combinations_failed.push(current.ordinal);
        }
        failed
    }

    /// Drop the current combination without counting it as run.
    pub fn skip_combination(&mut self) {
        if let Some(current) = self.current.take() {
            tracing::debug!(case = %self.case, combination = current.ordinal, "combination skipped");
            self.combinations_skipped += 1;
        }
    }

    /// Whether the current combination has failed so far.
    pub fn current_failed(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|c| self.failures.len() > c.failures_at_start)
    }

    /// Check a condition.
    ///
    /// A false condition is recorded as a failure. When `fatal` it also
    /// returns [`TestError::VerificationFailed`] so the step chain stops.
    pub fn verify(&mut self, condition: bool, message: impl Into<String>, fatal: bool) -> TestResult<()> {
        if condition {
            return Ok(());
        }
        let message = message.into();
        self.record_failure(message.clone(), fatal);
        if fatal {
            Err(TestError::VerificationFailed(message))
        } else {
            Ok(())
        }
    }

    /// Check equality; the failure message names both values.
    pub fn verify_eq<T>(&mut self, expected: T, actual: T, message: &str, fatal: bool) -> TestResult<()>
    where
        T: PartialEq + fmt::Debug,
    {
        let condition = expected == actual;
        self.verify(
            condition,
            format!("{}: expected {:?}, actual {:?}", message, expected, actual),
            fatal,
        )
    }

    /// Expect `result` to be an error accepted by `predicate`.
    ///
    /// Success, or an error of the wrong kind, is a fatal failure.
    pub fn expect_err<T, E, P>(&mut self, result: Result<T, E>, predicate: P, message: &str) -> TestResult<()>
    where
        E: fmt::Debug,
        P: FnOnce(&E) -> bool,
    {
        match result {
            Err(e) if predicate(&e) => {
                self.log(format!("{}: got expected error {:?}", message, e));
                Ok(())
            }
            Err(e) => self.verify(false, format!("{}: wrong error {:?}", message, e), true),
            Ok(_) => self.verify(false, format!("{}: expected an error, got success", message), true),
        }
    }

    /// Record a non-fatal failure.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.record_failure(message.into(), false);
    }

    /// Record a failure for an error that ended the combination.
    ///
    /// A verification error raised by [`verify`](Self::verify) is already
    /// recorded and is not counted twice; one built anywhere else is.
    pub fn record_error(&mut self, error: &TestError) {
        if let TestError::VerificationFailed(message) = error {
            if self.recorded_fatal(message) {
                return;
            }
        }
        self.record_failure(error.to_string(), true);
    }

    /// Whether the current combination already holds this fatal failure.
    fn recorded_fatal(&self, message: &str) -> bool {
        let start = self.current.as_ref().map_or(0, |c| c.failures_at_start);
        self.failures[start..]
            .iter()
            .any(|f| f.fatal && f.message == message)
    }

    /// Free-form diagnostic message.
    pub fn log(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(case = %self.case, combination = ?self.current_combination(), "{}", message);
        self.messages.push(message);
    }

    /// Attach a bitmap, writing it to the artifacts directory when one is set.
    ///
    /// Returns the written path.
    pub fn log_image(&mut self, bitmap: &Bitmap, name: &str) -> TestResult<Option<PathBuf>> {
        let Some(dir) = &self.artifacts_dir else {
            self.log(format!("image {} ({}x{}) not saved", name, bitmap.width(), bitmap.height()));
            return Ok(None);
        };

        let file = match self.current_combination() {
            Some(n) => format!("{}-{}-{}.png", self.case, n, name),
            None => format!("{}-{}.png", self.case, name),
        };
        let path = dir.join(file);
        bitmap.save_png(&path)?;
        self.log(format!("image {} saved to {}", name, path.display()));
        self.images.push(path.clone());
        Ok(Some(path))
    }

    /// All failures recorded so far.
    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Close the log and produce the outcome.
    pub fn finish(mut self) -> Outcome {
        if self.current.is_some() {
            self.end_combination();
        }
        let status = if self.failures.is_empty() {
            OutcomeStatus::Passed
        } else {
            OutcomeStatus::Failed
        };
        tracing::info!(
            case = %self.case,
            %status,
            run = self.combinations_run,
            failed = self.combinations_failed.len(),
            "case finished"
        );

        Outcome {
            case: self.case,
            status,
            failures: self.failures,
            combinations_run: self.combinations_run,
            combinations_failed: self.combinations_failed,
            combinations_skipped: self.combinations_skipped,
            images: self.images,
            started: self.started,
            finished: Utc::now(),
        }
    }

    fn record_failure(&mut self, message: String, fatal: bool) {
        let (combination, description) = match &self.current {
            Some(c) => (Some(c.ordinal), Some(c.description.clone())),
            None => (None, None),
        };
        if fatal {
            tracing::error!(case = %self.case, combination = ?combination, "{}", message);
        } else {
            tracing::warn!(case = %self.case, combination = ?combination, "{}", message);
        }
        self.failures.push(Failure {
            combination,
            description,
            message,
            fatal,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passing_verify() {
        let mut log = TestLog::new("case");
        log.verify(true, "fine", true).unwrap();
        assert!(!log.has_failures());
        assert!(log.finish().passed());
    }

    #[test]
    fn test_non_fatal_continues() {
        let mut log = TestLog::new("case");
        log.begin_combination(0, "A=true");
        assert!(log.verify(false, "soft", false).is_ok());
        assert!(log.current_failed());
        assert!(log.end_combination());

        let outcome = log.finish();
        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert_eq!(outcome.failures.len(), 1);
        assert!(!outcome.failures[0].fatal);
        assert_eq!(outcome.failures[0].combination, Some(0));
        assert_eq!(outcome.combinations_failed, vec![0]);
    }

    #[test]
    fn test_fatal_returns_error() {
        let mut log = TestLog::new("case");
        let err = log.verify(false, "hard", true).unwrap_err();
        assert!(matches!(err, TestError::VerificationFailed(ref m) if m == "hard"));
        assert_eq!(log.failures().len(), 1);

        // Already recorded; not duplicated.
        log.record_error(&err);
        assert_eq!(log.failures().len(), 1);

        log.record_error(&TestError::Host("gone".into()));
        assert_eq!(log.failures().len(), 2);
    }

    #[test]
    fn test_verification_error_from_elsewhere_is_recorded() {
        let mut log = TestLog::new("case");
        log.begin_combination(0, "Kind=TextBox");
        log.record_error(&TestError::VerificationFailed("Bitmap 'a' does not match".into()));
        assert!(log.current_failed());
        assert!(log.end_combination());

        // Same message in a later combination is a new failure.
        log.begin_combination(1, "Kind=PasswordBox");
        let err = log.verify(false, "Bitmap 'a' does not match", true).unwrap_err();
        log.record_error(&err);
        log.end_combination();

        let outcome = log.finish();
        assert_eq!(outcome.failures.len(), 2);
        assert_eq!(outcome.combinations_failed, vec![0, 1]);
    }

    #[test]
    fn test_verify_eq_message() {
        let mut log = TestLog::new("case");
        log.verify_eq("\t", "", "Text after Tab", false).unwrap();
        assert_eq!(
            log.failures()[0].message,
            r#"Text after Tab: expected "\t", actual """#
        );
    }

    #[test]
    fn test_expect_err() {
        #[derive(Debug, PartialEq)]
        enum Kind {
            OutOfRange,
            Other,
        }

        let mut log = TestLog::new("case");
        log.expect_err(Err::<(), _>(Kind::OutOfRange), |e| *e == Kind::OutOfRange, "select(-1)")
            .unwrap();
        assert!(!log.has_failures());

        assert!(log
            .expect_err(Err::<(), _>(Kind::Other), |e| *e == Kind::OutOfRange, "select(-1)")
            .is_err());
        assert!(log
            .expect_err(Ok::<(), Kind>(()), |_| true, "select(-1)")
            .is_err());
        assert_eq!(log.failures().len(), 2);
    }

    #[test]
    fn test_combination_counters() {
        let mut log = TestLog::new("case");
        for ordinal in 0..3 {
            log.begin_combination(ordinal, format!("N={}", ordinal));
            if ordinal == 1 {
                log.fail("bad");
            }
            log.end_combination();
        }
        let outcome = log.finish();
        assert_eq!(outcome.combinations_run, 3);
        assert_eq!(outcome.combinations_failed, vec![1]);
        assert_eq!(outcome.summary(), "case: FAILED (3 combinations, 1 failed)");
    }

    #[test]
    fn test_failure_display() {
        let failure = Failure {
            combination: Some(4),
            description: Some("A=true".into()),
            message: "oops".into(),
            fatal: true,
        };
        assert_eq!(failure.to_string(), "[#4 A=true] oops");
    }

    #[test]
    fn test_outcome_json() {
        let mut log = TestLog::new("json-case");
        log.fail("bad");
        let outcome = log.finish();
        let json = outcome.to_json().unwrap();
        assert!(json.contains("\"status\": \"failed\""));

        let back: Outcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back, outcome);
    }

    #[test]
    fn test_timed_out_outcome() {
        let outcome = Outcome::timed_out("slow", Utc::now(), "exceeded 1s");
        assert_eq!(outcome.status, OutcomeStatus::TimedOut);
        assert!(!outcome.passed());
        assert_eq!(outcome.failures.len(), 1);
    }
}
