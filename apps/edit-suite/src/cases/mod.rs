//! The editing test cases.
//!
//! Every case owns a headless [`Window`] and drives it through the step
//! sequencer: a step changes control state or injects input, the sequencer
//! lets the window process it, and the next step verifies the result.

mod accepts_tab;
mod key_navigation;
mod max_length;
mod rendering;
mod selection_args;
mod text_events;

use edit_controls::{ControlError, ControlResult, TextControl, TextEditableType, Window};
use edit_harness::{
    run_case, ComparisonCriteria, Dimension, FailurePolicy, InputSequence, Outcome, Overrides,
    TestError, TestLog, TestResult, Value,
};
use std::path::PathBuf;
use std::str::FromStr;

/// Settings shared by every case in a run.
#[derive(Debug, Clone, Default)]
pub struct CaseContext {
    /// Forces a policy on every case when set.
    pub policy: Option<FailurePolicy>,
    pub artifacts: Option<PathBuf>,
    pub masters: Option<PathBuf>,
    pub criteria: ComparisonCriteria,
}

impl CaseContext {
    fn new_log(&self, case: &str) -> TestLog {
        let mut log = TestLog::new(case);
        log.set_artifacts_dir(self.artifacts.clone());
        log
    }

    fn policy_or(&self, default: FailurePolicy) -> FailurePolicy {
        self.policy.unwrap_or(default)
    }
}

/// Name and one-line description of a case.
#[derive(Debug, Clone, Copy)]
pub struct CaseInfo {
    pub name: &'static str,
    pub description: &'static str,
}

pub const CASES: &[CaseInfo] = &[
    CaseInfo {
        name: accepts_tab::NAME,
        description: "Tab and Shift+Tab insert a tab or move focus",
    },
    CaseInfo {
        name: max_length::NAME,
        description: "Typing stops at the maximum length",
    },
    CaseInfo {
        name: selection_args::NAME,
        description: "Selection arguments are validated and clamped",
    },
    CaseInfo {
        name: text_events::NAME,
        description: "Change events fire once per edit",
    },
    CaseInfo {
        name: key_navigation::NAME,
        description: "Navigation keys move the caret and extend the selection",
    },
    CaseInfo {
        name: rendering::NAME,
        description: "Edits change the rendering and passwords render masked",
    },
];

/// Run the case called `name` over all its combinations.
pub fn run_named(name: &str, ctx: &CaseContext, overrides: &Overrides) -> TestResult<Outcome> {
    match name {
        accepts_tab::NAME => run_case(&mut accepts_tab::AcceptsTabCase::new(ctx)?, overrides),
        max_length::NAME => run_case(&mut max_length::MaxLengthCase::new(ctx)?, overrides),
        selection_args::NAME => {
            run_case(&mut selection_args::SelectionArgsCase::new(ctx)?, overrides)
        }
        text_events::NAME => run_case(&mut text_events::TextEventsCase::new(ctx)?, overrides),
        key_navigation::NAME => {
            run_case(&mut key_navigation::KeyNavigationCase::new(ctx)?, overrides)
        }
        rendering::NAME => run_case(&mut rendering::RenderingCase::new(ctx)?, overrides),
        _ => Err(TestError::InvalidArgument(format!("Unknown test case {}", name))),
    }
}

// ---- helpers shared by the cases ----

pub(crate) fn host_error(e: ControlError) -> TestError {
    TestError::Host(e.to_string())
}

/// Let the window process everything queued for it.
pub(crate) fn pump(window: &mut Window) -> TestResult<()> {
    window.do_events().map(|_| ()).map_err(host_error)
}

/// Queue a key script on the window.
pub(crate) fn type_keys(window: &mut Window, script: &str) -> TestResult<()> {
    let input = InputSequence::parse(script)?;
    window.inject(input.events());
    Ok(())
}

pub(crate) fn new_window() -> TestResult<Window> {
    Window::new(40, 8).map_err(host_error)
}

/// A dimension over every control type.
pub(crate) fn editable_types() -> TestResult<Dimension> {
    Dimension::new(
        "EditableType",
        TextEditableType::values().iter().map(|k| Value::ident(k.name())),
    )
}

/// Where the caret or selection is placed before an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SelectionState {
    Start,
    Middle,
    End,
    SelectAll,
}

impl SelectionState {
    pub(crate) fn dimension() -> TestResult<Dimension> {
        Dimension::new(
            "SelectionState",
            ["start", "middle", "end", "selectall"].map(Value::ident),
        )
    }

    pub(crate) fn apply(self, control: &mut TextControl) -> ControlResult<()> {
        let len = control.len() as i64;
        match self {
            SelectionState::Start => control.set_caret_index(0),
            SelectionState::Middle => control.set_caret_index(len / 2),
            SelectionState::End => control.set_caret_index(len),
            SelectionState::SelectAll => {
                control.select_all();
                Ok(())
            }
        }
    }
}

impl FromStr for SelectionState {
    type Err = TestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "middle" => Ok(Self::Middle),
            "end" => Ok(Self::End),
            "selectall" => Ok(Self::SelectAll),
            other => Err(TestError::InvalidArgument(format!("Unknown selection state {}", other))),
        }
    }
}
