//! Keyboard input scripts for driving controls.

use crate::{TestError, TestResult};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};

/// An ordered list of key presses to inject into a window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSequence {
    keys: Vec<KeyEvent>,
}

impl InputSequence {
    /// Create a new empty input sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a key script.
    ///
    /// Plain characters are typed as-is. `{NAME}` names a special key and
    /// `{NAME n}` repeats it `n` times. A `+`, `^` or `%` prefix adds Shift,
    /// Ctrl or Alt to the following key; prefixes combine. The literal
    /// characters `+ ^ % { }` are written `{+}`, `{^}`, `{%}`, `{{}`, `{}}`.
    ///
    /// ```
    /// # use edit_harness::InputSequence;
    /// let keys = InputSequence::parse("ab{TAB}+{TAB}^{END}{LEFT 3}").unwrap();
    /// assert_eq!(keys.len(), 8);
    /// ```
    pub fn parse(script: &str) -> TestResult<Self> {
        let mut seq = Self::new();
        let mut modifiers = KeyModifiers::NONE;
        let mut chars = script.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '+' => modifiers |= KeyModifiers::SHIFT,
                '^' => modifiers |= KeyModifiers::CONTROL,
                '%' => modifiers |= KeyModifiers::ALT,
                '{' => {
                    let mut body = String::new();
                    // `{}}` is a literal closing brace
                    if chars.peek() == Some(&'}') {
                        chars.next();
                        if chars.peek() == Some(&'}') {
                            chars.next();
                            body.push('}');
                        } else {
                            return Err(script_error(script, "Empty key name"));
                        }
                    } else {
                        loop {
                            match chars.next() {
                                Some('}') => break,
                                Some(ch) => body.push(ch),
                                None => return Err(script_error(script, "Unterminated '{'")),
                            }
                        }
                    }

                    let (code, count) = parse_braced(&body).map_err(|msg| script_error(script, &msg))?;
                    for _ in 0..count {
                        seq.push(code, modifiers);
                    }
                    modifiers = KeyModifiers::NONE;
                }
                '}' => return Err(script_error(script, "Unmatched '}'")),
                ch => {
                    seq.push(KeyCode::Char(ch), modifiers);
                    modifiers = KeyModifiers::NONE;
                }
            }
        }

        if modifiers != KeyModifiers::NONE {
            return Err(script_error(script, "Modifier without a key"));
        }
        Ok(seq)
    }

    fn push(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        // Terminals report Shift+Tab as BackTab.
        let code = if code == KeyCode::Tab && modifiers.contains(KeyModifiers::SHIFT) {
            KeyCode::BackTab
        } else {
            code
        };
        self.keys.push(KeyEvent::new(code, modifiers));
    }

    /// All key presses as crossterm events.
    pub fn events(&self) -> Vec<Event> {
        self.keys.iter().copied().map(Event::Key).collect()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyEvent> {
        self.keys.iter()
    }
}

fn script_error(script: &str, msg: &str) -> TestError {
    TestError::InvalidArgument(format!("{} in key script: {}", msg, script))
}

fn parse_braced(body: &str) -> Result<(KeyCode, usize), String> {
    // Single-character bodies are literals, including `{ }` for space.
    let mut chars = body.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Ok((KeyCode::Char(c), 1));
    }

    let (name, count) = match body.rsplit_once(' ') {
        Some((name, count)) if !name.is_empty() => {
            let count = count
                .parse::<usize>()
                .map_err(|_| format!("Invalid repeat count '{}'", count))?;
            (name, count)
        }
        _ => (body, 1),
    };

    let code = match name.to_ascii_uppercase().as_str() {
        "TAB" => KeyCode::Tab,
        "ENTER" | "RETURN" => KeyCode::Enter,
        "ESC" | "ESCAPE" => KeyCode::Esc,
        "BACKSPACE" | "BS" | "BKSP" => KeyCode::Backspace,
        "DELETE" | "DEL" => KeyCode::Delete,
        "INSERT" | "INS" => KeyCode::Insert,
        "LEFT" => KeyCode::Left,
        "RIGHT" => KeyCode::Right,
        "UP" => KeyCode::Up,
        "DOWN" => KeyCode::Down,
        "HOME" => KeyCode::Home,
        "END" => KeyCode::End,
        "PGUP" => KeyCode::PageUp,
        "PGDN" => KeyCode::PageDown,
        "SPACE" => KeyCode::Char(' '),
        other => match other.strip_prefix('F').and_then(|n| n.parse::<u8>().ok()) {
            Some(n) if (1..=24).contains(&n) => KeyCode::F(n),
            _ => return Err(format!("Unknown key name '{}'", name)),
        },
    };
    Ok((code, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(seq: &InputSequence) -> Vec<(KeyCode, KeyModifiers)> {
        seq.iter().map(|k| (k.code, k.modifiers)).collect()
    }

    #[test]
    fn test_parse_script() {
        let seq = InputSequence::parse("ab{TAB}+{TAB}^{END}{LEFT 3}").unwrap();
        assert_eq!(
            codes(&seq),
            vec![
                (KeyCode::Char('a'), KeyModifiers::NONE),
                (KeyCode::Char('b'), KeyModifiers::NONE),
                (KeyCode::Tab, KeyModifiers::NONE),
                (KeyCode::BackTab, KeyModifiers::SHIFT),
                (KeyCode::End, KeyModifiers::CONTROL),
                (KeyCode::Left, KeyModifiers::NONE),
                (KeyCode::Left, KeyModifiers::NONE),
                (KeyCode::Left, KeyModifiers::NONE),
            ]
        );
    }

    #[test]
    fn test_parse_combined_modifiers() {
        let seq = InputSequence::parse("+^{HOME}%x").unwrap();
        assert_eq!(
            codes(&seq),
            vec![
                (KeyCode::Home, KeyModifiers::SHIFT | KeyModifiers::CONTROL),
                (KeyCode::Char('x'), KeyModifiers::ALT),
            ]
        );
    }

    #[test]
    fn test_parse_literals() {
        let seq = InputSequence::parse("{+}{^}{%}{{}{}}{ }").unwrap();
        let chars: Vec<KeyCode> = seq.iter().map(|k| k.code).collect();
        assert_eq!(
            chars,
            vec![
                KeyCode::Char('+'),
                KeyCode::Char('^'),
                KeyCode::Char('%'),
                KeyCode::Char('{'),
                KeyCode::Char('}'),
                KeyCode::Char(' '),
            ]
        );
    }

    #[test]
    fn test_parse_errors() {
        for script in ["{TAB", "}", "{NOPE}", "{LEFT x}", "abc+", "{}", "{F99}"] {
            assert!(
                matches!(InputSequence::parse(script), Err(TestError::InvalidArgument(_))),
                "expected error for {:?}",
                script
            );
        }
    }

    #[test]
    fn test_function_keys() {
        let seq = InputSequence::parse("{F5}{f12}").unwrap();
        let keys: Vec<KeyCode> = seq.iter().map(|k| k.code).collect();
        assert_eq!(keys, vec![KeyCode::F(5), KeyCode::F(12)]);
    }

    #[test]
    fn test_events_wrap_keys() {
        let seq = InputSequence::parse("x{DEL}").unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(
            seq.events(),
            vec![
                Event::Key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE)),
                Event::Key(KeyEvent::new(KeyCode::Delete, KeyModifiers::NONE)),
            ]
        );
        assert!(InputSequence::parse("").unwrap().is_empty());
    }
}
