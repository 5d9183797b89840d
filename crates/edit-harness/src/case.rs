//! The combinatorial test case pattern.
//!
//! A case declares its dimensions, reads each combination into its own
//! typed fields, and queues a chain of steps that exercise the control and
//! verify the results through its [`TestLog`].

use crate::dimension::Dimension;
use crate::engine::{Combination, CombinatorialEngine};
use crate::log::{Outcome, TestLog};
use crate::matrix::Overrides;
use crate::sequencer::{Host, Sequencer, StepQueue};
use crate::TestResult;
use serde::{Deserialize, Serialize};

/// What to do after a combination fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop at the first failing combination.
    #[default]
    FailFast,
    /// Record the failure and keep going.
    CollectAll,
}

/// A test case run once per combination of its dimensions.
pub trait CombinatorialCase: Host + Sized + 'static {
    /// Name used in logs and reports.
    fn name(&self) -> &str;

    /// The dimensions to combine.
    fn dimensions(&self) -> TestResult<Vec<Dimension>>;

    /// Load a combination into the case; return `false` to skip it.
    fn read_combination(&mut self, combination: &Combination) -> TestResult<bool>;

    /// Queue the first step for the current combination.
    fn start_combination(&mut self, queue: &mut StepQueue<Self>) -> TestResult<()>;

    fn log(&mut self) -> &mut TestLog;

    /// Cases opt into collecting all failures; the default stops early.
    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::FailFast
    }

    /// Hook for installing an engine-wide filter.
    fn configure_engine(&self, _engine: &mut CombinatorialEngine) {}
}

/// Run `case` over every combination of its (overridden) dimensions.
///
/// Errors building the engine are returned; failures inside combinations
/// are recorded in the outcome.
pub fn run_case<C: CombinatorialCase>(case: &mut C, overrides: &Overrides) -> TestResult<Outcome> {
    let dimensions = overrides.apply(case.dimensions()?)?;
    let mut engine = CombinatorialEngine::from_dimensions(dimensions)?;
    case.configure_engine(&mut engine);

    let policy = case.failure_policy();
    let name = case.name().to_string();
    tracing::info!(case = %name, total = engine.total_combinations(), ?policy, "case started");

    let mut combination = Combination::new();
    while engine.next_into(&mut combination) {
        case.log()
            .begin_combination(combination.ordinal(), combination.describe());

        match case.read_combination(&combination) {
            Ok(false) => {
                case.log().skip_combination();
                continue;
            }
            Ok(true) => {
                let mut queue = StepQueue::new();
                let result = case
                    .start_combination(&mut queue)
                    .and_then(|()| Sequencer::run_queue(case, queue));
                if let Err(e) = result {
                    case.log().record_error(&e);
                }
            }
            Err(e) => case.log().record_error(&e),
        }

        if case.log().end_combination() && policy == FailurePolicy::FailFast {
            tracing::warn!(case = %name, combination = combination.ordinal(), "stopping at first failure");
            break;
        }
    }

    let log = std::mem::replace(case.log(), TestLog::new(name));
    Ok(log.finish())
}
