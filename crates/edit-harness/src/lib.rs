//! Combinatorial test harness for text-editing controls.
//!
//! This crate provides the pieces a scripted editing test is built from:
//! - Dimensions and a combinatorial engine enumerating their cartesian product
//! - Filter expressions that prune combinations
//! - A cooperative step sequencer that drains host work between steps
//! - A per-run test log with fatal and non-fatal verification
//! - Bitmap capture and tolerance-based comparison
//! - Keyboard input scripts, CI reporting and a timeout runner

pub mod bitmap;
pub mod case;
pub mod ci;
pub mod dimension;
pub mod engine;
pub mod filter;
pub mod fixtures;
pub mod input;
pub mod log;
pub mod master;
pub mod matrix;
pub mod sequencer;
pub mod value;

#[cfg(feature = "tokio-harness")]
pub mod timeout;

#[cfg(feature = "proptest-support")]
pub mod generators;

// Re-exports
pub use bitmap::{Bitmap, ComparisonCriteria, ComparisonResult};
pub use case::{run_case, CombinatorialCase, FailurePolicy};
pub use ci::{is_ci, should_update_masters, CiConfig, TestReporter};
pub use dimension::Dimension;
pub use engine::{Combination, CombinatorialEngine};
pub use fixtures::Fixtures;
pub use input::InputSequence;
pub use log::{Failure, Outcome, OutcomeStatus, TestLog};
pub use master::MasterImages;
pub use matrix::{CombinationFile, Overrides};
pub use sequencer::{Host, Sequencer, StepQueue};
pub use value::Value;

#[cfg(feature = "tokio-harness")]
pub use timeout::TimeoutRunner;

/// Environment variable to update master images.
pub const UPDATE_MASTERS: &str = "UPDATE_MASTERS";

/// Error types for harness operations.
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid filter: {0}")]
    Filter(String),

    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    #[error("Step panicked: {0}")]
    StepPanicked(String),

    #[error("Host error: {0}")]
    Host(String),

    #[error("Master image not found: {0}")]
    MasterNotFound(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Timeout waiting for test case")]
    Timeout,
}

impl From<toml::de::Error> for TestError {
    fn from(e: toml::de::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for TestError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<image::ImageError> for TestError {
    fn from(e: image::ImageError) -> Self {
        Self::Image(e.to_string())
    }
}

/// Result type for harness operations.
pub type TestResult<T> = Result<T, TestError>;
