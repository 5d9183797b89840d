//! The headless text-editing control.

use crate::error::{ControlError, ControlResult};
use crate::events::{ControlEvent, EventLog};
use crate::kind::TextEditableType;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Mask glyph used by password controls unless overridden.
pub const DEFAULT_PASSWORD_CHAR: char = '\u{2022}';

/// A text-editing control.
///
/// Text is held as characters so that every index (caret, selection start,
/// max length) counts characters rather than bytes. The selection is the
/// range between `anchor` and `caret`; the caret is its active end.
#[derive(Debug, Clone)]
pub struct TextControl {
    kind: TextEditableType,
    chars: Vec<char>,
    anchor: usize,
    caret: usize,
    accepts_tab: bool,
    accepts_return: bool,
    read_only: bool,
    max_length: usize,
    password_char: char,
    enabled: bool,
    text_version: u64,
    events: EventLog,
}

impl TextControl {
    pub fn new(kind: TextEditableType) -> Self {
        Self {
            kind,
            chars: Vec::new(),
            anchor: 0,
            caret: 0,
            accepts_tab: false,
            accepts_return: matches!(kind, TextEditableType::RichTextBox),
            read_only: false,
            max_length: 0,
            password_char: DEFAULT_PASSWORD_CHAR,
            enabled: true,
            text_version: 0,
            events: EventLog::new(),
        }
    }

    pub fn kind(&self) -> TextEditableType {
        self.kind
    }

    // ---- content ----

    /// The content. For password controls this is the clear password.
    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// What the control shows: the text, or one mask glyph per character.
    pub fn display_text(&self) -> String {
        if self.kind.is_password() {
            std::iter::repeat(self.password_char).take(self.chars.len()).collect()
        } else {
            self.text()
        }
    }

    /// Replace the content and put the caret at the start.
    ///
    /// Programmatic assignment ignores `max_length` and `is_read_only`.
    pub fn set_text(&mut self, text: &str) {
        self.track(|c| {
            let new: Vec<char> = c.filter_line_breaks(text.chars()).collect();
            if new != c.chars {
                c.chars = new;
                c.text_version += 1;
            }
            c.anchor = 0;
            c.caret = 0;
        });
    }

    pub fn clear(&mut self) {
        self.set_text("");
    }

    /// Type `text` over the selection, as keyboard input would.
    ///
    /// Respects `is_read_only` and truncates to `max_length`. Returns
    /// whether the content changed.
    pub fn insert_text(&mut self, text: &str) -> bool {
        self.track(|c| c.replace_selection(text))
    }

    // ---- selection ----

    pub fn selection_start(&self) -> usize {
        self.anchor.min(self.caret)
    }

    pub fn selection_length(&self) -> usize {
        self.anchor.abs_diff(self.caret)
    }

    pub fn caret_index(&self) -> usize {
        self.caret
    }

    pub fn selected_text(&self) -> String {
        let start = self.selection_start();
        self.chars[start..start + self.selection_length()].iter().collect()
    }

    /// Text before the selection.
    pub fn text_before_selection(&self) -> String {
        self.chars[..self.selection_start()].iter().collect()
    }

    /// Text after the selection.
    pub fn text_after_selection(&self) -> String {
        let end = self.selection_start() + self.selection_length();
        self.chars[end..].iter().collect()
    }

    /// Select `length` characters from `start`.
    ///
    /// Negative arguments are rejected. Arguments past the end of the text
    /// are clamped to it.
    pub fn select(&mut self, start: i64, length: i64) -> ControlResult<()> {
        if start < 0 {
            return Err(ControlError::out_of_range("start", start));
        }
        if length < 0 {
            return Err(ControlError::out_of_range("length", length));
        }
        let len = self.chars.len();
        let start = clamp_index(start, len);
        let end = start + clamp_index(length, len - start);
        self.track(|c| {
            c.anchor = start;
            c.caret = end;
        });
        Ok(())
    }

    /// Collapse the selection at `index`.
    pub fn set_caret_index(&mut self, index: i64) -> ControlResult<()> {
        if index < 0 {
            return Err(ControlError::out_of_range("caret index", index));
        }
        let index = clamp_index(index, self.chars.len());
        self.track(|c| {
            c.anchor = index;
            c.caret = index;
        });
        Ok(())
    }

    pub fn select_all(&mut self) {
        self.track(|c| {
            c.anchor = 0;
            c.caret = c.chars.len();
        });
    }

    // ---- properties ----

    pub fn accepts_tab(&self) -> bool {
        self.accepts_tab
    }

    pub fn set_accepts_tab(&mut self, accepts: bool) -> ControlResult<()> {
        if accepts && self.kind.is_password() {
            return Err(ControlError::InvalidOperation(format!(
                "{} does not accept tabs",
                self.kind
            )));
        }
        self.accepts_tab = accepts;
        Ok(())
    }

    pub fn accepts_return(&self) -> bool {
        self.accepts_return
    }

    pub fn set_accepts_return(&mut self, accepts: bool) -> ControlResult<()> {
        if accepts && !self.kind.supports_multiline() {
            return Err(ControlError::InvalidOperation(format!(
                "{} does not accept returns",
                self.kind
            )));
        }
        self.accepts_return = accepts;
        Ok(())
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Maximum number of characters user input may produce; 0 is unlimited.
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Lowering the limit does not truncate existing text.
    pub fn set_max_length(&mut self, max_length: i64) -> ControlResult<()> {
        if max_length < 0 {
            return Err(ControlError::out_of_range("max length", max_length));
        }
        self.max_length = clamp_index(max_length, usize::MAX);
        Ok(())
    }

    pub fn password_char(&self) -> char {
        self.password_char
    }

    pub fn set_password_char(&mut self, c: char) -> ControlResult<()> {
        if c.is_control() {
            return Err(ControlError::InvalidOperation(format!(
                "{:?} cannot be used as a password mask",
                c
            )));
        }
        self.password_char = c;
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventLog {
        &mut self.events
    }

    // ---- keyboard ----

    /// Apply a key press. Returns `false` when the control does not consume
    /// the key, so the host can route it (Tab to focus navigation, for one).
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        if !self.enabled || key.kind == KeyEventKind::Release {
            return false;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        let alt = key.modifiers.contains(KeyModifiers::ALT);

        match key.code {
            KeyCode::Char('a') | KeyCode::Char('A') if ctrl => {
                self.select_all();
                true
            }
            KeyCode::Char(_) if ctrl || alt => false,
            KeyCode::Char(c) => {
                self.insert_text(c.encode_utf8(&mut [0; 4]));
                true
            }
            KeyCode::Tab | KeyCode::BackTab if !ctrl && self.accepts_tab => {
                self.insert_text("\t");
                true
            }
            KeyCode::Enter if self.accepts_return => {
                self.insert_text("\n");
                true
            }
            KeyCode::Backspace => {
                self.track(|c| c.delete_backward(ctrl));
                true
            }
            KeyCode::Delete => {
                self.track(|c| c.delete_forward(ctrl));
                true
            }
            KeyCode::Left => {
                self.track(|c| c.move_left(shift, ctrl));
                true
            }
            KeyCode::Right => {
                self.track(|c| c.move_right(shift, ctrl));
                true
            }
            KeyCode::Home => {
                self.track(|c| {
                    let to = if ctrl { 0 } else { c.line_start(c.caret) };
                    c.move_caret(to, shift);
                });
                true
            }
            KeyCode::End => {
                self.track(|c| {
                    let to = if ctrl { c.chars.len() } else { c.line_end(c.caret) };
                    c.move_caret(to, shift);
                });
                true
            }
            KeyCode::Up if self.kind.supports_multiline() => {
                self.track(|c| c.move_vertical(-1, shift));
                true
            }
            KeyCode::Down if self.kind.supports_multiline() => {
                self.track(|c| c.move_vertical(1, shift));
                true
            }
            _ => false,
        }
    }

    // ---- internals ----

    /// Run `f` and raise change events for whatever it changed.
    fn track<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let version = self.text_version;
        let selection = (self.selection_start(), self.selection_length());
        let result = f(self);
        if self.text_version != version {
            self.events.record(ControlEvent::TextChanged);
        }
        if (self.selection_start(), self.selection_length()) != selection {
            self.events.record(ControlEvent::SelectionChanged);
        }
        result
    }

    fn filter_line_breaks<'a>(&self, chars: impl Iterator<Item = char> + 'a) -> impl Iterator<Item = char> + 'a {
        let multiline = self.kind.supports_multiline();
        chars.filter(move |c| multiline || (*c != '\n' && *c != '\r'))
    }

    fn replace_selection(&mut self, text: &str) -> bool {
        if self.read_only {
            return false;
        }
        let start = self.selection_start();
        let end = start + self.selection_length();

        let mut inserted: Vec<char> = self.filter_line_breaks(text.chars()).collect();
        if self.max_length > 0 {
            let kept = self.chars.len() - (end - start);
            inserted.truncate(self.max_length.saturating_sub(kept));
        }
        if inserted.is_empty() && start == end {
            return false;
        }

        let caret = start + inserted.len();
        self.chars.splice(start..end, inserted);
        self.anchor = caret;
        self.caret = caret;
        self.text_version += 1;
        true
    }

    fn delete_backward(&mut self, word: bool) {
        if self.read_only {
            return;
        }
        if self.selection_length() == 0 {
            if self.caret == 0 {
                return;
            }
            self.anchor = if word { self.previous_word_start(self.caret) } else { self.caret - 1 };
        }
        self.replace_selection("");
    }

    fn delete_forward(&mut self, word: bool) {
        if self.read_only {
            return;
        }
        if self.selection_length() == 0 {
            if self.caret == self.chars.len() {
                return;
            }
            self.anchor = if word { self.next_word_start(self.caret) } else { self.caret + 1 };
        }
        self.replace_selection("");
    }

    fn move_caret(&mut self, to: usize, extend: bool) {
        self.caret = to.min(self.chars.len());
        if !extend {
            self.anchor = self.caret;
        }
    }

    fn move_left(&mut self, extend: bool, word: bool) {
        if !extend && self.selection_length() > 0 && !word {
            let start = self.selection_start();
            self.move_caret(start, false);
            return;
        }
        let to = if word {
            self.previous_word_start(self.caret)
        } else {
            self.caret.saturating_sub(1)
        };
        self.move_caret(to, extend);
    }

    fn move_right(&mut self, extend: bool, word: bool) {
        if !extend && self.selection_length() > 0 && !word {
            let end = self.selection_start() + self.selection_length();
            self.move_caret(end, false);
            return;
        }
        let to = if word {
            self.next_word_start(self.caret)
        } else {
            self.caret + 1
        };
        self.move_caret(to, extend);
    }

    fn move_vertical(&mut self, direction: i32, extend: bool) {
        let start = self.line_start(self.caret);
        let column = self.caret - start;
        let target = if direction < 0 {
            if start == 0 {
                0
            } else {
                let prev_start = self.line_start(start - 1);
                (prev_start + column).min(start - 1)
            }
        } else {
            let end = self.line_end(self.caret);
            if end == self.chars.len() {
                end
            } else {
                let next_start = end + 1;
                (next_start + column).min(self.line_end(next_start))
            }
        };
        self.move_caret(target, extend);
    }

    fn line_start(&self, pos: usize) -> usize {
        self.chars[..pos]
            .iter()
            .rposition(|c| *c == '\n')
            .map_or(0, |i| i + 1)
    }

    fn line_end(&self, pos: usize) -> usize {
        self.chars[pos..]
            .iter()
            .position(|c| *c == '\n')
            .map_or(self.chars.len(), |i| pos + i)
    }

    fn previous_word_start(&self, pos: usize) -> usize {
        let mut i = pos;
        while i > 0 && self.chars[i - 1].is_whitespace() {
            i -= 1;
        }
        while i > 0 && !self.chars[i - 1].is_whitespace() {
            i -= 1;
        }
        i
    }

    fn next_word_start(&self, pos: usize) -> usize {
        let len = self.chars.len();
        let mut i = pos;
        while i < len && !self.chars[i].is_whitespace() {
            i += 1;
        }
        while i < len && self.chars[i].is_whitespace() {
            i += 1;
        }
        i
    }
}

fn clamp_index(value: i64, max: usize) -> usize {
    usize::try_from(value).map_or(max, |v| v.min(max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use edit_harness::generators;
    use proptest::prelude::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn key_mod(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    fn text_box(text: &str) -> TextControl {
        let mut tb = TextControl::new(TextEditableType::TextBox);
        tb.set_text(text);
        tb
    }

    #[test]
    fn test_defaults_per_kind() {
        let tb = TextControl::new(TextEditableType::TextBox);
        assert!(!tb.accepts_tab());
        assert!(!tb.accepts_return());
        assert_eq!(tb.max_length(), 0);
        assert!(tb.is_enabled());

        let rtb = TextControl::new(TextEditableType::RichTextBox);
        assert!(rtb.accepts_return());

        let pb = TextControl::new(TextEditableType::PasswordBox);
        assert_eq!(pb.password_char(), DEFAULT_PASSWORD_CHAR);
    }

    #[test]
    fn test_typing_replaces_selection() {
        let mut tb = text_box("Hello world");
        tb.select(6, 5).unwrap();
        assert_eq!(tb.selected_text(), "world");

        for c in "there".chars() {
            assert!(tb.handle_key(&key(KeyCode::Char(c))));
        }
        assert_eq!(tb.text(), "Hello there");
        assert_eq!(tb.caret_index(), 11);
        assert_eq!(tb.selection_length(), 0);
    }

    #[test]
    fn test_select_rejects_negative_arguments() {
        let mut tb = text_box("abc");
        assert!(tb.select(-1, 0).unwrap_err().is_argument_out_of_range());
        assert!(tb.select(0, -1).unwrap_err().is_argument_out_of_range());
        assert!(tb.set_caret_index(-5).unwrap_err().is_argument_out_of_range());
        assert!(tb.set_max_length(-1).unwrap_err().is_argument_out_of_range());
    }

    #[test]
    fn test_select_clamps_past_end() {
        let mut tb = text_box("abc");
        tb.select(2, 10).unwrap();
        assert_eq!((tb.selection_start(), tb.selection_length()), (2, 1));
        tb.select(10, 10).unwrap();
        assert_eq!((tb.selection_start(), tb.selection_length()), (3, 0));
    }

    #[test]
    fn test_max_length_truncates_typing_only() {
        let mut tb = text_box("");
        tb.set_max_length(3).unwrap();
        assert!(tb.insert_text("abcdef"));
        assert_eq!(tb.text(), "abc");
        assert!(!tb.insert_text("x"));

        tb.set_text("longer than three");
        assert_eq!(tb.len(), 17);
    }

    #[test]
    fn test_max_length_counts_replaced_selection() {
        let mut tb = text_box("abc");
        tb.set_max_length(3).unwrap();
        tb.select(1, 1).unwrap();
        tb.insert_text("XYZ");
        assert_eq!(tb.text(), "aXc");
    }

    #[test]
    fn test_tab_routing() {
        let mut tb = text_box("ab");
        tb.set_caret_index(1).unwrap();
        assert!(!tb.handle_key(&key(KeyCode::Tab)));
        assert_eq!(tb.text(), "ab");

        tb.set_accepts_tab(true).unwrap();
        assert!(tb.handle_key(&key(KeyCode::Tab)));
        assert!(tb.handle_key(&key_mod(KeyCode::BackTab, KeyModifiers::SHIFT)));
        assert_eq!(tb.text(), "a\t\tb");
    }

    #[test]
    fn test_password_box_restrictions() {
        let mut pb = TextControl::new(TextEditableType::PasswordBox);
        assert!(matches!(pb.set_accepts_tab(true), Err(ControlError::InvalidOperation(_))));
        assert!(matches!(pb.set_accepts_return(true), Err(ControlError::InvalidOperation(_))));
        pb.set_text("se\ncret");
        assert_eq!(pb.text(), "secret");
        assert_eq!(pb.display_text(), "\u{2022}".repeat(6));
    }

    #[test]
    fn test_enter_needs_accepts_return() {
        let mut tb = text_box("ab");
        assert!(!tb.handle_key(&key(KeyCode::Enter)));
        tb.set_accepts_return(true).unwrap();
        tb.set_caret_index(1).unwrap();
        assert!(tb.handle_key(&key(KeyCode::Enter)));
        assert_eq!(tb.text(), "a\nb");
    }

    #[test]
    fn test_backspace_and_delete() {
        let mut tb = text_box("abcd");
        tb.set_caret_index(2).unwrap();
        tb.handle_key(&key(KeyCode::Backspace));
        assert_eq!(tb.text(), "acd");
        tb.handle_key(&key(KeyCode::Delete));
        assert_eq!(tb.text(), "ad");
        assert_eq!(tb.caret_index(), 1);

        tb.set_caret_index(0).unwrap();
        tb.handle_key(&key(KeyCode::Backspace));
        assert_eq!(tb.text(), "ad");
    }

    #[test]
    fn test_word_deletion() {
        let mut tb = text_box("one two three");
        tb.set_caret_index(7).unwrap();
        tb.handle_key(&key_mod(KeyCode::Backspace, KeyModifiers::CONTROL));
        assert_eq!(tb.text(), "one  three");
    }

    #[test]
    fn test_shift_navigation_extends() {
        let mut tb = text_box("Hello world");
        tb.set_caret_index(5).unwrap();
        tb.handle_key(&key_mod(KeyCode::Home, KeyModifiers::SHIFT));
        assert_eq!(tb.selected_text(), "Hello");
        assert_eq!(tb.caret_index(), 0);

        tb.handle_key(&key(KeyCode::Right));
        assert_eq!((tb.caret_index(), tb.selection_length()), (5, 0));

        tb.handle_key(&key_mod(KeyCode::Right, KeyModifiers::CONTROL | KeyModifiers::SHIFT));
        assert_eq!(tb.selected_text(), " ");
        tb.handle_key(&key_mod(KeyCode::End, KeyModifiers::SHIFT));
        assert_eq!(tb.selected_text(), " world");
    }

    #[test]
    fn test_line_navigation() {
        let mut tb = text_box("first\nsecond\nx");
        tb.set_caret_index(8).unwrap();
        tb.handle_key(&key(KeyCode::Home));
        assert_eq!(tb.caret_index(), 6);
        tb.handle_key(&key(KeyCode::End));
        assert_eq!(tb.caret_index(), 12);
        tb.handle_key(&key(KeyCode::Down));
        assert_eq!(tb.caret_index(), 14);
        tb.handle_key(&key(KeyCode::Up));
        assert_eq!(tb.caret_index(), 7);
        tb.handle_key(&key_mod(KeyCode::End, KeyModifiers::CONTROL));
        assert_eq!(tb.caret_index(), 14);
    }

    #[test]
    fn test_read_only_consumes_without_editing() {
        let mut tb = text_box("abc");
        tb.set_read_only(true);
        tb.events_mut().clear();
        assert!(tb.handle_key(&key(KeyCode::Char('x'))));
        assert!(tb.handle_key(&key(KeyCode::Backspace)));
        assert_eq!(tb.text(), "abc");
        assert_eq!(tb.events().count(ControlEvent::TextChanged), 0);
    }

    #[test]
    fn test_events_once_per_edit() {
        let mut tb = text_box("");
        tb.events_mut().clear();
        tb.handle_key(&key(KeyCode::Char('a')));
        assert_eq!(tb.events().count(ControlEvent::TextChanged), 1);
        assert_eq!(tb.events().count(ControlEvent::SelectionChanged), 1);

        tb.handle_key(&key(KeyCode::Right));
        assert_eq!(tb.events().count(ControlEvent::SelectionChanged), 1);
    }

    #[test]
    fn test_disabled_ignores_keys() {
        let mut tb = text_box("a");
        tb.set_enabled(false);
        assert!(!tb.handle_key(&key(KeyCode::Char('b'))));
        assert_eq!(tb.text(), "a");
    }

    #[test]
    fn test_ctrl_a_selects_all() {
        let mut tb = text_box("a\u{1D11E}b");
        assert!(tb.handle_key(&key_mod(KeyCode::Char('a'), KeyModifiers::CONTROL)));
        assert_eq!(tb.selection_length(), 3);
    }

    proptest! {
        #[test]
        fn prop_selection_stays_in_bounds(
            text in "[a-z ]{0,12}",
            keys in prop::collection::vec(
                prop::sample::select(vec![
                    KeyCode::Left, KeyCode::Right, KeyCode::Home, KeyCode::End,
                    KeyCode::Backspace, KeyCode::Delete, KeyCode::Char('q'),
                ]),
                0..30,
            ),
            shift in any::<bool>(),
        ) {
            let mut tb = text_box(&text);
            let modifiers = if shift { KeyModifiers::SHIFT } else { KeyModifiers::NONE };
            for code in keys {
                tb.handle_key(&KeyEvent::new(code, modifiers));
                prop_assert!(tb.selection_start() + tb.selection_length() <= tb.len());
                prop_assert!(tb.caret_index() <= tb.len());
            }
        }

        #[test]
        fn prop_edit_keys_keep_caret_in_text(
            text in generators::single_line_text(12),
            keys in generators::edit_sequence(0..40),
        ) {
            let mut tb = text_box(&text);
            for key in &keys {
                tb.handle_key(key);
                prop_assert!(tb.selection_start() + tb.selection_length() <= tb.len());
                prop_assert!(tb.caret_index() <= tb.len());
            }
            // Tab and Enter are not generated; a single-line box stays single-line.
            prop_assert!(!tb.text().contains('\n'));
        }

        #[test]
        fn prop_password_mask_tracks_length(keys in generators::edit_sequence(0..30)) {
            let mut pb = TextControl::new(TextEditableType::PasswordBox);
            for key in &keys {
                pb.handle_key(key);
            }
            prop_assert_eq!(pb.display_text().chars().count(), pb.len());
            prop_assert!(pb.display_text().chars().all(|c| c == pb.password_char()));
        }

        #[test]
        fn prop_max_length_holds(limit in 1i64..8, typed in "[a-z]{0,20}") {
            let mut tb = text_box("");
            tb.set_max_length(limit).unwrap();
            tb.insert_text(&typed);
            prop_assert!(tb.len() as i64 <= limit);
        }
    }
}
