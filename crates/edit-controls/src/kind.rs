//! The family of text-editable control types.

use crate::control::TextControl;
use crate::error::ControlError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A kind of text-editing control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextEditableType {
    /// Plain single- or multi-line text.
    TextBox,
    /// Rich text; accepts returns by default.
    RichTextBox,
    /// Masked single-line input.
    PasswordBox,
}

impl TextEditableType {
    /// Every control type, in a fixed order.
    pub fn values() -> &'static [TextEditableType] {
        &[Self::TextBox, Self::RichTextBox, Self::PasswordBox]
    }

    /// A fresh control of this type with default properties.
    pub fn create_instance(self) -> TextControl {
        TextControl::new(self)
    }

    pub fn is_password(self) -> bool {
        matches!(self, Self::PasswordBox)
    }

    /// Whether the control can hold line breaks.
    pub fn supports_multiline(self) -> bool {
        !self.is_password()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::TextBox => "TextBox",
            Self::RichTextBox => "RichTextBox",
            Self::PasswordBox => "PasswordBox",
        }
    }
}

impl fmt::Display for TextEditableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TextEditableType {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::values()
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ControlError::UnknownType(s.to_string()))
    }
}
