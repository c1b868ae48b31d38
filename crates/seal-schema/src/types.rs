use derive_more::From;
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// Value
///
/// Column value as held on an instance or in a store row. Keys are plain
/// values too; `Null` is a loaded-but-empty column, which is distinct from a
/// column that was never loaded.
///

#[derive(Clone, Debug, Default, Deserialize, From, PartialEq, Serialize)]
#[remain::sorted]
pub enum Value {
    Bool(bool),
    Float(f64),
    Int(i64),
    #[default]
    #[from(skip)]
    Null,
    Text(String),
    Uint(u64),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Self::Uint(v) => Some(*v),
            Self::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Stable textual form used for store keys and messages.
    #[must_use]
    pub fn key_repr(&self) -> String {
        match self {
            Self::Bool(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Int(v) => v.to_string(),
            Self::Null => "null".to_string(),
            Self::Text(v) => v.clone(),
            Self::Uint(v) => v.to_string(),
        }
    }

    /// Loose key equality; `Int(1)` and `Uint(1)` name the same row.
    #[must_use]
    pub fn same_key(&self, other: &Self) -> bool {
        match (self.as_uint(), other.as_uint()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Uint(u64::from(v))
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(v) => write!(f, "'{v}'"),
            other => write!(f, "{}", other.key_repr()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_compare_across_integer_variants() {
        assert!(Value::Int(7).same_key(&Value::Uint(7)));
        assert!(!Value::Int(-1).same_key(&Value::Uint(1)));
        assert!(Value::from("a").same_key(&Value::Text("a".into())));
    }

    #[test]
    fn option_maps_to_null() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(3_i64)), Value::Int(3));
    }
}
