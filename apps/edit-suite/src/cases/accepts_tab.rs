//! Tab handling follows `AcceptsTab`.
//!
//! With `AcceptsTab` off, Tab and Shift+Tab move focus to the neighbouring
//! buttons and leave the text alone. With it on, both keys replace the
//! selection with a tab character and focus stays put.

use super::{editable_types, host_error, new_window, pump, type_keys, CaseContext, SelectionState};
use edit_controls::{ElementId, TextEditableType, Window};
use edit_harness::{
    Combination, CombinatorialCase, Dimension, FailurePolicy, Host, StepQueue, TestLog,
    TestResult,
};

pub const NAME: &str = "accepts-tab";

pub struct AcceptsTabCase {
    log: TestLog,
    policy: FailurePolicy,
    window: Window,

    kind: TextEditableType,
    selection: SelectionState,
    text: String,
    accepts_tab: bool,

    control: ElementId,
    before_button: ElementId,
    after_button: ElementId,
    text_before_caret: String,
    text_after_caret: String,
    state_before: String,
}

impl AcceptsTabCase {
    pub fn new(ctx: &CaseContext) -> TestResult<Self> {
        Ok(Self {
            log: ctx.new_log(NAME),
            policy: ctx.policy_or(FailurePolicy::FailFast),
            window: new_window()?,
            kind: TextEditableType::TextBox,
            selection: SelectionState::Start,
            text: String::new(),
            accepts_tab: false,
            control: 0,
            before_button: 0,
            after_button: 0,
            text_before_caret: String::new(),
            text_after_caret: String::new(),
            state_before: String::new(),
        })
    }

    fn build_window(&mut self) -> TestResult<()> {
        let mut control = self.kind.create_instance();
        self.log
            .verify(!control.accepts_tab(), "AcceptsTab defaults to false", true)?;
        control.set_accepts_tab(self.accepts_tab).map_err(host_error)?;

        self.window.clear();
        self.before_button = self.window.add_button("Before");
        self.control = self.window.add_control(control, 5);
        self.after_button = self.window.add_button("After");
        self.log.log(format!(
            "---- {} SelectionState: {:?} ---- Text: {:?}",
            self.kind, self.selection, self.text
        ));
        Ok(())
    }

    /// Reset text and selection and focus the control.
    fn set_selection(&mut self) -> TestResult<()> {
        let control = self.window.control_mut(self.control).map_err(host_error)?;
        control.set_text(&self.text);
        self.selection.apply(control).map_err(host_error)?;
        self.window.focus(self.control).map_err(host_error)
    }

    /// Remember the content around the selection, then press `keys`.
    fn press(&mut self, keys: &str) -> TestResult<()> {
        let control = self.window.control(self.control).map_err(host_error)?;
        self.state_before = control.text();
        self.text_before_caret = control.text_before_selection();
        self.text_after_caret = control.text_after_selection();
        type_keys(&mut self.window, keys)
    }

    fn verify_result(&mut self, expected_focus: ElementId, key_name: &str) -> TestResult<()> {
        let text = self.window.control(self.control).map_err(host_error)?.text();

        if self.accepts_tab {
            let focused = self.window.is_focused(self.control);
            self.log.verify(
                focused,
                format!("Focus stays on the control for {}", key_name),
                true,
            )?;
            let expected = format!("{}\t{}", self.text_before_caret, self.text_after_caret);
            self.log.verify_eq(
                expected.as_str(),
                text.as_str(),
                &format!("{} is accepted when AcceptsTab is true", key_name),
                true,
            )
        } else {
            let focused = self.window.is_focused(expected_focus);
            self.log
                .verify(focused, format!("Focus moves for {}", key_name), true)?;
            self.log.verify_eq(
                self.state_before.as_str(),
                text.as_str(),
                &format!("{} is not accepted when AcceptsTab is false", key_name),
                true,
            )
        }
    }
}

impl Host for AcceptsTabCase {
    fn do_events(&mut self) -> TestResult<()> {
        pump(&mut self.window)
    }
}

impl CombinatorialCase for AcceptsTabCase {
    fn name(&self) -> &str {
        NAME
    }

    fn dimensions(&self) -> TestResult<Vec<Dimension>> {
        Ok(vec![
            editable_types()?,
            SelectionState::dimension()?,
            Dimension::new("Text", ["", "Hello world"])?,
            // Password boxes never accept tabs.
            Dimension::with_filters(
                "AcceptsTab",
                [true, false],
                vec![Some("EditableType!=2".to_string()), None],
            )?,
        ])
    }

    fn read_combination(&mut self, combination: &Combination) -> TestResult<bool> {
        self.kind = combination.parse("EditableType")?;
        self.selection = combination.parse("SelectionState")?;
        self.text = combination.get_str("Text")?.to_string();
        self.accepts_tab = combination.get_bool("AcceptsTab")?;
        Ok(!(self.kind.is_password() && self.accepts_tab))
    }

    fn start_combination(&mut self, queue: &mut StepQueue<Self>) -> TestResult<()> {
        self.build_window()?;
        queue.queue_step(|case: &mut Self, queue| {
            case.set_selection()?;
            queue.queue_step(|case: &mut Self, queue| {
                case.press("{TAB}")?;
                queue.queue_step(|case: &mut Self, queue| {
                    let after = case.after_button;
                    case.verify_result(after, "Tab")?;
                    case.set_selection()?;
                    queue.queue_step(|case: &mut Self, queue| {
                        case.press("+{TAB}")?;
                        queue.queue_step(|case: &mut Self, _| {
                            let before = case.before_button;
                            case.verify_result(before, "Shift+Tab")
                        });
                        Ok(())
                    });
                    Ok(())
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
