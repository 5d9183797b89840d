//! Heterogeneous dimension values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier used for an empty string value.
pub const EMPTY_STRING: &str = "EMPTY_STRING";

/// A single candidate value of a dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Free-form string value (content under test)
    Str(String),
    /// Symbolic value naming an enumerated option
    #[serde(skip_deserializing)]
    Ident(String),
}

impl Value {
    /// Create a symbolic value.
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Ident(name.into())
    }

    /// Parse a command-line token into the most specific value.
    pub fn parse_token(token: &str) -> Self {
        if token == EMPTY_STRING {
            return Self::Str(String::new());
        }
        if let Ok(b) = token.parse::<bool>() {
            return Self::Bool(b);
        }
        if let Ok(i) = token.parse::<i64>() {
            return Self::Int(i);
        }
        if let Ok(f) = token.parse::<f64>() {
            return Self::Float(f);
        }
        Self::Str(token.to_string())
    }

    /// Get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as float. Integers widen.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as string slice (strings and identifiers).
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) | Self::Ident(s) => Some(s),
            _ => None,
        }
    }

    /// Parse a string or identifier value into a typed option.
    pub fn parse<T: FromStr>(&self) -> Option<T> {
        self.as_str().and_then(|s| s.parse().ok())
    }

    /// Equality that treats a string and an identifier with the same text
    /// as the same value.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self.as_str(), other.as_str()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }

    /// A log and file-name safe identifier for this value.
    pub fn identifier(&self) -> String {
        let raw = match self {
            Self::Str(s) if s.is_empty() => EMPTY_STRING.to_string(),
            other => other.to_string(),
        };
        raw.replace([' ', '\\'], "_")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Str(s) | Self::Ident(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Self::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}
