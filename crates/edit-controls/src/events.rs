//! Change notifications raised by controls.

use serde::Serialize;
use std::fmt;

/// A notification raised by a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ControlEvent {
    TextChanged,
    SelectionChanged,
}

impl fmt::Display for ControlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TextChanged => f.write_str("TextChanged"),
            Self::SelectionChanged => f.write_str("SelectionChanged"),
        }
    }
}

/// Ordered record of the events a control raised.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<ControlEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: ControlEvent) {
        tracing::trace!(%event, "control event");
        self.events.push(event);
    }

    /// How many times `event` was raised.
    pub fn count(&self, event: ControlEvent) -> usize {
        self.events.iter().filter(|e| **e == event).count()
    }

    pub fn events(&self) -> &[ControlEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
