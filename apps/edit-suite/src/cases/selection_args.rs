//! Selection arguments are validated.
//!
//! Negative starts or lengths raise `ArgumentOutOfRange` and leave the
//! selection untouched; values past the end are clamped to the text.

use super::{editable_types, host_error, new_window, pump, CaseContext};
use edit_controls::{ElementId, TextEditableType, Window};
use edit_harness::{
    Combination, CombinatorialCase, Dimension, FailurePolicy, Host, StepQueue, TestLog,
    TestResult,
};

pub const NAME: &str = "selection-args";

pub struct SelectionArgsCase {
    log: TestLog,
    policy: FailurePolicy,
    window: Window,
    control: ElementId,

    kind: TextEditableType,
    text: String,
    start: i64,
    length: i64,
}

impl SelectionArgsCase {
    pub fn new(ctx: &CaseContext) -> TestResult<Self> {
        Ok(Self {
            log: ctx.new_log(NAME),
            policy: ctx.policy_or(FailurePolicy::CollectAll),
            window: new_window()?,
            control: 0,
            kind: TextEditableType::TextBox,
            text: String::new(),
            start: 0,
            length: 0,
        })
    }

    /// Caret placement is validated the same way as the selection.
    fn check_caret(case: &mut Self, _queue: &mut StepQueue<Self>) -> TestResult<()> {
        let start = case.start;
        let result = case
            .window
            .control_mut(case.control)
            .map_err(host_error)?
            .set_caret_index(start);
        if start < 0 {
            case.log.expect_err(
                result,
                |e| e.is_argument_out_of_range(),
                "Negative caret index is rejected",
            )
        } else {
            result.map_err(host_error)
        }
    }

    fn selection(&self) -> TestResult<(usize, usize)> {
        let control = self.window.control(self.control).map_err(host_error)?;
        Ok((control.selection_start(), control.selection_length()))
    }
}

impl Host for SelectionArgsCase {
    fn do_events(&mut self) -> TestResult<()> {
        pump(&mut self.window)
    }
}

impl CombinatorialCase for SelectionArgsCase {
    fn name(&self) -> &str {
        NAME
    }

    fn dimensions(&self) -> TestResult<Vec<Dimension>> {
        Ok(vec![
            editable_types()?,
            Dimension::new("Text", ["", "Hello world"])?,
            Dimension::new("Start", [-1, 0, 3, 100])?,
            Dimension::new("Length", [-1, 0, 2, 100])?,
        ])
    }

    fn read_combination(&mut self, combination: &Combination) -> TestResult<bool> {
        self.kind = combination.parse("EditableType")?;
        self.text = combination.get_str("Text")?.to_string();
        self.start = combination.get_int("Start")?;
        self.length = combination.get_int("Length")?;
        Ok(true)
    }

    fn start_combination(&mut self, queue: &mut StepQueue<Self>) -> TestResult<()> {
        let mut control = self.kind.create_instance();
        control.set_text(&self.text);
        // A known selection to check untouched after a rejected call.
        control.select_all();

        self.window.clear();
        self.control = self.window.add_control(control, 3);

        queue.queue_step(|case: &mut Self, queue| {
            let before = case.selection()?;
            let (start, length) = (case.start, case.length);
            let result = case
                .window
                .control_mut(case.control)
                .map_err(host_error)?
                .select(start, length);

            if start < 0 || length < 0 {
                case.log.expect_err(
                    result,
                    |e| e.is_argument_out_of_range(),
                    &format!("Select({}, {}) is rejected", start, length),
                )?;
                queue.queue_step(move |case: &mut Self, queue| {
                    let after = case.selection()?;
                    case.log
                        .verify_eq(before, after, "Rejected Select leaves the selection", true)?;
                    queue.queue_step(Self::check_caret);
                    Ok(())
                });
            } else {
                result.map_err(host_error)?;
                queue.queue_step(|case: &mut Self, queue| {
                    let len = case.text.chars().count();
                    let start = usize::try_from(case.start).unwrap_or(0).min(len);
                    let length = usize::try_from(case.length).unwrap_or(0).min(len - start);
                    let after = case.selection()?;
                    case.log
                        .verify_eq((start, length), after, "Select clamps to the text", true)?;
                    queue.queue_step(Self::check_caret);
                    Ok(())
                });
            }
            Ok(())
        });

        Ok(())
    }

    fn log(&mut self) -> &mut TestLog {
        &mut self.log
    }

    fn failure_policy(&self) -> FailurePolicy {
        self.policy
    }
}
