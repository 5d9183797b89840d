//! Navigation keys move the caret; with Shift they extend the selection.

use super::{editable_types, host_error, new_window, pump, type_keys, CaseContext, SelectionState};
use edit_controls::{ElementId, TextEditableType, Window};
use edit_harness::{
    Combination, CombinatorialCase, Dimension, FailurePolicy, Host, StepQueue, TestLog,
    TestResult, Value,
};

pub const NAME: &str = "key-navigation";

const TEXT: &str = "Hello world";

pub struct KeyNavigationCase {
    log: TestLog,
    policy: FailurePolicy,
    window: Window,
    control: ElementId,

    kind: TextEditableType,
    key: String,
    shift: bool,
    selection: SelectionState,
    caret_before: usize,
}

impl KeyNavigationCase {
    pub fn new(ctx: &CaseContext) -> TestResult<Self> {
        Ok(Self {
            log: ctx.new_log(NAME),
            policy: ctx.policy_or(FailurePolicy::FailFast),
            window: new_window()?,
            control: 0,
            kind: TextEditableType::TextBox,
            key: String::new(),
            shift: false,
            selection: SelectionState::Start,
            caret_before: 0,
        })
    }

    /// Where the caret lands after pressing the key from `from`.
    fn expected_caret(&self, from: usize) -> usize {
        let len = TEXT.chars().count();
        match self.key.as_str() {
            "HOME" => 0,
            "END" => len,
            "LEFT" => from.saturating_sub(1),
            _ => (from + 1).min(len),
        }
    }
}

impl Host for KeyNavigationCase {
    fn do_events(&mut self) -> TestResult<()> {
        pump(&mut self.window)
    }
}

impl CombinatorialCase for KeyNavigationCase {
    fn name(&self) -> &str {
        NAME
    }

    fn dimensions(&self) -> TestResult<Vec<Dimension>> {
        Ok(vec![
            editable_types()?,
            Dimension::new("Key", ["HOME", "END", "LEFT", "RIGHT"].map(Value::ident))?,
            Dimension::new("Shift", [false, true])?,
            // Collapsed starting points only; select-all is covered elsewhere.
            Dimension::new("SelectionState", ["start", "middle", "end"].map(Value::ident))?,
        ])
    }

    fn read_combination(&mut self, combination: &Combination) -> TestResult<bool> {
        self.kind = combination.parse("EditableType")?;
        self.key = combination.get_str("Key")?.to_string();
        self.shift = combination.get_bool("Shift")?;
        self.selection = combination.parse("SelectionState")?;
        Ok(self.selection != SelectionState::SelectAll)
    }

    fn start_combination(&mut self, queue: &mut StepQueue<Self>) -> TestResult<()> {
        let mut control = self.kind.create_instance();
        control.set_text(TEXT);
        self.selection.apply(&mut control).map_err(host_error)?;
        self.caret_before = control.caret_index();

        self.window.clear();
        self.control = self.window.add_control(control, 3);
        self.window.focus(self.control).map_err(host_error)?;

        queue.queue_step(|case: &mut Self, queue| {
            let script = format!("{}{{{}}}", if case.shift { "+" } else { "" }, case.key);
            case.log.log(format!("pressing {} from {}", script, case.caret_before));
            type_keys(&mut case.window, &script)?;

            queue.queue_step(|case: &mut Self, _| {
                let from = case.caret_before;
                let caret = case.expected_caret(from);
                let expected = if case.shift {
                    (from.min(caret), from.abs_diff(caret))
                } else {
                    (caret, 0)
                };

                let control = case.window.control(case.control).map_err(host_error)?;
                let actual_caret = control.caret_index();
                let actual = (control.selection_start(), control.selection_length());

                case.log.verify_eq(caret, actual_caret, "Caret position", true)?;
                case.log.verify_eq(expected, actual, "Selection (start, length)", true)
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
