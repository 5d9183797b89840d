//! Headless text-editing controls.
//!
//! Provides three control types sharing one editing model:
//! - `TextBox`: plain text, single line unless returns are accepted
//! - `RichTextBox`: multi-line by default
//! - `PasswordBox`: single line, rendered masked
//!
//! Controls are hosted in a [`Window`] that renders them into a ratatui
//! test backend so tests can capture what they would look like.

pub mod control;
pub mod error;
pub mod events;
pub mod kind;
pub mod render;
pub mod window;

pub use control::{TextControl, DEFAULT_PASSWORD_CHAR};
pub use error::{ControlError, ControlResult};
pub use events::{ControlEvent, EventLog};
pub use kind::TextEditableType;
pub use render::{ButtonView, TextView, TAB_WIDTH};
pub use window::{Element, ElementId, Window};
