//! Typed input is truncated at `MaxLength`.

use super::{editable_types, host_error, new_window, pump, type_keys, CaseContext};
use edit_controls::{ElementId, TextEditableType, Window};
use edit_harness::{
    Combination, CombinatorialCase, Dimension, FailurePolicy, Host, StepQueue, TestLog,
    TestResult,
};

pub const NAME: &str = "max-length";

pub struct MaxLengthCase {
    log: TestLog,
    policy: FailurePolicy,
    window: Window,
    control: ElementId,

    kind: TextEditableType,
    max_length: i64,
    initial: String,
    typed: String,
}

impl MaxLengthCase {
    pub fn new(ctx: &CaseContext) -> TestResult<Self> {
        Ok(Self {
            log: ctx.new_log(NAME),
            policy: ctx.policy_or(FailurePolicy::CollectAll),
            window: new_window()?,
            control: 0,
            kind: TextEditableType::TextBox,
            max_length: 0,
            initial: String::new(),
            typed: String::new(),
        })
    }

    /// The limit in force: invalid values leave the default of 0.
    fn effective_limit(&self) -> usize {
        usize::try_from(self.max_length).unwrap_or(0)
    }

    /// `base` followed by as much of the typed text as the limit allows.
    fn expected_after_typing(&self, base: &str) -> String {
        let limit = self.effective_limit();
        let room = if limit == 0 {
            usize::MAX
        } else {
            limit.saturating_sub(base.chars().count())
        };
        base.chars().chain(self.typed.chars().take(room)).collect()
    }

    fn current_text(&self) -> TestResult<String> {
        Ok(self.window.control(self.control).map_err(host_error)?.text())
    }
}

impl Host for MaxLengthCase {
    fn do_events(&mut self) -> TestResult<()> {
        pump(&mut self.window)
    }
}

impl CombinatorialCase for MaxLengthCase {
    fn name(&self) -> &str {
        NAME
    }

    fn dimensions(&self) -> TestResult<Vec<Dimension>> {
        Ok(vec![
            editable_types()?,
            Dimension::new("MaxLength", [-1, 0, 1, 5])?,
            Dimension::new("InitialText", ["", "abc"])?,
            Dimension::new("TypedText", ["x", "Hello world"])?,
        ])
    }

    fn read_combination(&mut self, combination: &Combination) -> TestResult<bool> {
        self.kind = combination.parse("EditableType")?;
        self.max_length = combination.get_int("MaxLength")?;
        self.initial = combination.get_str("InitialText")?.to_string();
        self.typed = combination.get_str("TypedText")?.to_string();
        Ok(true)
    }

    fn start_combination(&mut self, queue: &mut StepQueue<Self>) -> TestResult<()> {
        let mut control = self.kind.create_instance();
        control.set_text(&self.initial);

        let result = control.set_max_length(self.max_length);
        if self.max_length < 0 {
            self.log.expect_err(
                result,
                |e| e.is_argument_out_of_range(),
                "Negative MaxLength is rejected",
            )?;
        } else {
            result.map_err(host_error)?;
        }
        self.log
            .verify_eq(self.effective_limit(), control.max_length(), "MaxLength", true)?;

        self.window.clear();
        self.control = self.window.add_control(control, 3);
        self.window.focus(self.control).map_err(host_error)?;

        queue.queue_step(|case: &mut Self, queue| {
            let end = case.initial.chars().count() as i64;
            case.window
                .control_mut(case.control)
                .and_then(|c| c.set_caret_index(end))
                .map_err(host_error)?;
            let typed = case.typed.clone();
            type_keys(&mut case.window, &typed)?;

            queue.queue_step(|case: &mut Self, queue| {
                let expected = case.expected_after_typing(&case.initial);
                let actual = case.current_text()?;
                case.log.verify_eq(
                    expected.as_str(),
                    actual.as_str(),
                    "Typing at the end respects MaxLength",
                    true,
                )?;

                case.window
                    .control_mut(case.control)
                    .map_err(host_error)?
                    .select_all();
                let typed = case.typed.clone();
                type_keys(&mut case.window, &typed)?;

                queue.queue_step(|case: &mut Self, _| {
                    let expected = case.expected_after_typing("");
                    let actual = case.current_text()?;
                    case.log.verify_eq(
                        expected.as_str(),
                        actual.as_str(),
                        "Typing over a full selection respects MaxLength",
                        true,
                    )
                });
                Ok(())
            });
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
