//! Rendering reacts to edits, and password boxes render masked.
//!
//! Renderings are compared as bitmaps: typing must change the picture, a
//! password box must look exactly like a text box showing its mask glyphs
//! and must not look like a text box showing the clear text.

use super::{editable_types, host_error, new_window, pump, type_keys, CaseContext};
use edit_controls::{ElementId, TextControl, TextEditableType, Window};
use edit_harness::{
    Bitmap, Combination, CombinatorialCase, ComparisonCriteria, Dimension, FailurePolicy,
    Fixtures, Host, MasterImages, StepQueue, TestLog, TestResult,
};
use std::path::PathBuf;

pub const NAME: &str = "rendering";

pub struct RenderingCase {
    log: TestLog,
    policy: FailurePolicy,
    criteria: ComparisonCriteria,
    masters: Option<PathBuf>,
    window: Window,
    control: ElementId,

    kind: TextEditableType,
    text: String,
    text_id: String,
    before: Option<Bitmap>,
}

impl RenderingCase {
    pub fn new(ctx: &CaseContext) -> TestResult<Self> {
        Ok(Self {
            log: ctx.new_log(NAME),
            policy: ctx.policy_or(FailurePolicy::CollectAll),
            criteria: ctx.criteria,
            masters: ctx.masters.clone(),
            window: new_window()?,
            control: 0,
            kind: TextEditableType::TextBox,
            text: String::new(),
            text_id: String::new(),
            before: None,
        })
    }

    fn capture(window: &mut Window, id: ElementId) -> TestResult<Bitmap> {
        let buffer = window.capture(id).map_err(host_error)?;
        Ok(Bitmap::from_buffer(&buffer, buffer.area))
    }

    /// Render a focused text box holding `text` with the caret at `caret`.
    fn render_text_box(text: &str, caret: usize) -> TestResult<Bitmap> {
        let mut window = new_window()?;
        let mut control = TextControl::new(TextEditableType::TextBox);
        control.set_text(text);
        control.set_caret_index(caret as i64).map_err(host_error)?;
        let id = window.add_control(control, 3);
        window.focus(id).map_err(host_error)?;
        pump(&mut window)?;
        Self::capture(&mut window, id)
    }

    fn verify_after_typing(&mut self) -> TestResult<()> {
        let after = Self::capture(&mut self.window, self.control)?;
        self.log_image(&after, "after")?;

        if let Some(before) = &self.before {
            let changed = !before.compare(&after, &ComparisonCriteria::exact()).criteria_met;
            self.log.verify(changed, "Typing changes the rendering", true)?;
        }

        let control = self.window.control(self.control).map_err(host_error)?;
        let (shown, clear, caret) = (control.display_text(), control.text(), control.caret_index());

        let reference = Self::render_text_box(&shown, caret)?;
        let result = reference.compare(&after, &self.criteria);
        self.log.verify(
            result.criteria_met,
            format!(
                "{} renders like a TextBox showing {:?}: {}",
                self.kind,
                shown,
                result.describe()
            ),
            true,
        )?;

        if self.kind.is_password() {
            let unmasked = Self::render_text_box(&clear, caret)?;
            let same = unmasked.compare(&after, &ComparisonCriteria::exact()).criteria_met;
            self.log
                .verify(!same, "Password content is not rendered in clear", true)?;
        }

        if let Some(dir) = &self.masters {
            let name = format!("{}-{}", self.kind, self.text_id);
            MasterImages::new(dir).assert_matches(&name, &after, &self.criteria)?;
        }
        Ok(())
    }

    fn log_image(&mut self, bitmap: &Bitmap, stage: &str) -> TestResult<()> {
        let name = format!("{}-{}-{}", self.kind, self.text_id, stage);
        self.log.log_image(bitmap, &name).map(|_| ())
    }
}

impl Host for RenderingCase {
    fn do_events(&mut self) -> TestResult<()> {
        pump(&mut self.window)
    }
}

impl CombinatorialCase for RenderingCase {
    fn name(&self) -> &str {
        NAME
    }

    fn dimensions(&self) -> TestResult<Vec<Dimension>> {
        Ok(vec![
            editable_types()?,
            Fixtures::text_dimension("Text", &["empty", "latin", "surrogate-pair", "mixed-scripts"])?,
        ])
    }

    fn read_combination(&mut self, combination: &Combination) -> TestResult<bool> {
        self.kind = combination.parse("EditableType")?;
        self.text = combination.get_str("Text")?.to_string();
        self.text_id = combination.value("Text")?.identifier();
        self.before = None;
        Ok(true)
    }

    fn start_combination(&mut self, queue: &mut StepQueue<Self>) -> TestResult<()> {
        let mut control = self.kind.create_instance();
        control.set_text(&self.text);
        control.set_caret_index(control.len() as i64).map_err(host_error)?;

        self.window.clear();
        self.control = self.window.add_control(control, 3);
        self.window.focus(self.control).map_err(host_error)?;

        queue.queue_step(|case: &mut Self, queue| {
            let before = Self::capture(&mut case.window, case.control)?;
            case.log_image(&before, "before")?;
            case.before = Some(before);
            type_keys(&mut case.window, "X")?;

            queue.queue_step(|case: &mut Self, _| case.verify_after_typing());
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
