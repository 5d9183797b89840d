//! Change events fire once per edit.

use super::{editable_types, host_error, new_window, pump, type_keys, CaseContext};
use edit_controls::{ControlEvent, ElementId, TextEditableType, Window};
use edit_harness::{
    Combination, CombinatorialCase, Dimension, FailurePolicy, Host, StepQueue, TestError,
    TestLog, TestResult, Value,
};
use std::str::FromStr;

pub const NAME: &str = "text-events";

const INITIAL_TEXT: &str = "Hello world";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Type,
    Backspace,
    Delete,
    Paste,
    SetText,
}

impl Edit {
    const ALL: [&'static str; 5] = ["type", "backspace", "delete", "paste", "settext"];

    /// Expected (TextChanged, SelectionChanged) counts with the caret
    /// collapsed in the middle of the text.
    fn expected_events(self, read_only: bool) -> (usize, usize) {
        match (self, read_only) {
            // Programmatic assignment ignores read-only and resets the caret.
            (Edit::SetText, _) => (1, 1),
            (_, true) => (0, 0),
            (Edit::Delete, false) => (1, 0),
            (_, false) => (1, 1),
        }
    }
}

impl FromStr for Edit {
    type Err = TestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "type" => Ok(Edit::Type),
            "backspace" => Ok(Edit::Backspace),
            "delete" => Ok(Edit::Delete),
            "paste" => Ok(Edit::Paste),
            "settext" => Ok(Edit::SetText),
            other => Err(TestError::InvalidArgument(format!("Unknown edit {}", other))),
        }
    }
}

pub struct TextEventsCase {
    log: TestLog,
    policy: FailurePolicy,
    window: Window,
    control: ElementId,

    kind: TextEditableType,
    read_only: bool,
    edit: Edit,
    text_before: String,
}

impl TextEventsCase {
    pub fn new(ctx: &CaseContext) -> TestResult<Self> {
        Ok(Self {
            log: ctx.new_log(NAME),
            policy: ctx.policy_or(FailurePolicy::FailFast),
            window: new_window()?,
            control: 0,
            kind: TextEditableType::TextBox,
            read_only: false,
            edit: Edit::Type,
            text_before: String::new(),
        })
    }

    fn perform_edit(&mut self) -> TestResult<()> {
        let control = self.window.control_mut(self.control).map_err(host_error)?;
        self.text_before = control.text();
        control.events_mut().clear();

        match self.edit {
            Edit::Type => type_keys(&mut self.window, "x"),
            Edit::Backspace => type_keys(&mut self.window, "{BS}"),
            Edit::Delete => type_keys(&mut self.window, "{DEL}"),
            Edit::Paste => {
                control.insert_text("abc");
                Ok(())
            }
            Edit::SetText => {
                control.set_text("changed");
                Ok(())
            }
        }
    }

    fn verify_events(&mut self) -> TestResult<()> {
        let control = self.window.control(self.control).map_err(host_error)?;
        let actual = (
            control.events().count(ControlEvent::TextChanged),
            control.events().count(ControlEvent::SelectionChanged),
        );
        let changed = control.text() != self.text_before;
        let (text_changed, _) = self.edit.expected_events(self.read_only);

        self.log.verify_eq(
            self.edit.expected_events(self.read_only),
            actual,
            &format!("(TextChanged, SelectionChanged) after {:?}", self.edit),
            true,
        )?;
        self.log.verify(
            changed == (text_changed > 0),
            "TextChanged fires exactly when the text changes",
            true,
        )
    }
}

impl Host for TextEventsCase {
    fn do_events(&mut self) -> TestResult<()> {
        pump(&mut self.window)
    }
}

impl CombinatorialCase for TextEventsCase {
    fn name(&self) -> &str {
        NAME
    }

    fn dimensions(&self) -> TestResult<Vec<Dimension>> {
        Ok(vec![
            editable_types()?,
            Dimension::new("ReadOnly", [false, true])?,
            Dimension::new("Edit", Edit::ALL.map(Value::ident))?,
        ])
    }

    fn read_combination(&mut self, combination: &Combination) -> TestResult<bool> {
        self.kind = combination.parse("EditableType")?;
        self.read_only = combination.get_bool("ReadOnly")?;
        self.edit = combination.parse("Edit")?;
        Ok(true)
    }

    fn start_combination(&mut self, queue: &mut StepQueue<Self>) -> TestResult<()> {
        let mut control = self.kind.create_instance();
        control.set_text(INITIAL_TEXT);
        control.set_read_only(self.read_only);
        control.set_caret_index(5).map_err(host_error)?;

        self.window.clear();
        self.control = self.window.add_control(control, 3);
        self.window.focus(self.control).map_err(host_error)?;

        queue.queue_step(|case: &mut Self, queue| {
            case.perform_edit()?;
            queue.queue_step(|case: &mut Self, _| case.verify_events());
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_events_table() {
        assert_eq!(Edit::Delete.expected_events(false), (1, 0));
        assert_eq!(Edit::Type.expected_events(true), (0, 0));
        assert_eq!(Edit::SetText.expected_events(true), (1, 1));
        assert_eq!("paste".parse::<Edit>().unwrap(), Edit::Paste);
    }
}
