#![forbid(unsafe_code)]

use std::fmt;

/// A mapping key as emitted by a report producer.
///
/// Stored documents only ever carry `Str` keys; the other variants exist so
/// that malformed producer output can be represented and repaired.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Int(i64),
    Bool(bool),
    Str(String),
}

impl Key {
    pub fn is_str(&self) -> bool {
        matches!(self, Self::Str(_))
    }

    pub fn into_string(self) -> String {
        match self {
            Self::Str(value) => value,
            other => other.to_string(),
        }
    }
}

/// Boolean keys render lowercase, as JSON spells them.
impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Str(value) => f.write_str(value),
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Key {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}
