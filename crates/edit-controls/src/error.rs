//! Control error types.

use thiserror::Error;

/// Errors raised by controls and the window that hosts them.
#[derive(Debug, Error)]
pub enum ControlError {
    /// An argument was outside the accepted range.
    #[error("Argument out of range: {name} = {value}")]
    ArgumentOutOfRange { name: &'static str, value: i64 },

    /// The operation is not supported by this kind of control.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Unknown control type name.
    #[error("Unknown control type: {0}")]
    UnknownType(String),

    /// No element with this id in the window.
    #[error("Element not found: {0}")]
    ElementNotFound(usize),

    /// Drawing into the surface failed.
    #[error("Render error: {0}")]
    Render(#[from] std::io::Error),
}

impl ControlError {
    pub(crate) fn out_of_range(name: &'static str, value: i64) -> Self {
        Self::ArgumentOutOfRange { name, value }
    }

    /// True for [`ControlError::ArgumentOutOfRange`].
    pub fn is_argument_out_of_range(&self) -> bool {
        matches!(self, Self::ArgumentOutOfRange { .. })
    }
}

/// Result type for control operations.
pub type ControlResult<T> = Result<T, ControlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let messages = [
            ControlError::out_of_range("start", -1),
            ControlError::InvalidOperation("PasswordBox does not accept tabs".into()),
            ControlError::UnknownType("ComboBox".into()),
            ControlError::ElementNotFound(7),
        ]
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");

        insta::assert_snapshot!(messages, @r"
        Argument out of range: start = -1
        Invalid operation: PasswordBox does not accept tabs
        Unknown control type: ComboBox
        Element not found: 7
        ");
    }

    #[test]
    fn test_only_range_errors_match() {
        assert!(ControlError::out_of_range("length", -3).is_argument_out_of_range());
        assert!(!ControlError::ElementNotFound(0).is_argument_out_of_range());
    }
}
