//! TL-Pack value types.

use std::collections::HashMap;
use std::fmt;

/// Type alias for TL-Pack maps (string-keyed, order not part of the contract).
pub type TlMap = HashMap<String, TlValue>;

/// A value in the TL-Pack data model.
///
/// Integers are carried as `i64` and narrowed to the smallest wire constructor
/// on encode; integers outside the 32-bit ranges travel as `Double`. `Float`
/// is never chosen by inference — constructing it is an explicit caller
/// decision.
#[derive(Debug, Clone, PartialEq)]
pub enum TlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f32),
    Double(f64),
    /// Seconds since the Unix epoch; fractional seconds permitted.
    Date(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<TlValue>),
    Map(TlMap),
    /// A host-defined value, serialized by a registered extension.
    Custom(TlCustom),
}

/// A host-defined value handled by an extension codec. The `kind` lets an
/// extension's `encode` decide whether to claim the value; `data` is whatever
/// payload the extension chooses to carry.
#[derive(Debug, Clone, PartialEq)]
pub struct TlCustom {
    pub kind: String,
    pub data: Box<TlValue>,
}

impl TlValue {
    /// Returns the value as a string reference, if it is a `Str` variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as an i64, if it is an `Int` variant.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as a bool, if it is a `Bool` variant.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as a list slice, if it is a `List` variant.
    pub fn as_list(&self) -> Option<&[TlValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the value as a map reference, if it is a `Map` variant.
    pub fn as_map(&self) -> Option<&TlMap> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// True for values eligible for repeat-run collapsing: numbers, strings,
    /// booleans, null, and dates. Byte strings, containers, and custom values
    /// never repeat.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::Null
                | Self::Bool(_)
                | Self::Int(_)
                | Self::Float(_)
                | Self::Double(_)
                | Self::Date(_)
                | Self::Str(_)
        )
    }
}

// -- Convenience conversions --

impl From<bool> for TlValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for TlValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for TlValue {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<u32> for TlValue {
    fn from(i: u32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f32> for TlValue {
    fn from(f: f32) -> Self {
        Self::Float(f)
    }
}

impl From<f64> for TlValue {
    fn from(f: f64) -> Self {
        Self::Double(f)
    }
}

impl From<String> for TlValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&str> for TlValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<Vec<u8>> for TlValue {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl From<Vec<TlValue>> for TlValue {
    fn from(v: Vec<TlValue>) -> Self {
        Self::List(v)
    }
}

impl From<TlMap> for TlValue {
    fn from(m: TlMap) -> Self {
        Self::Map(m)
    }
}

impl From<TlCustom> for TlValue {
    fn from(c: TlCustom) -> Self {
        Self::Custom(c)
    }
}

impl fmt::Display for TlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Date(secs) => write!(f, "date({secs})"),
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Self::Custom(c) => write!(f, "custom({})", c.kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_classification() {
        assert!(TlValue::Null.is_scalar());
        assert!(TlValue::Bool(true).is_scalar());
        assert!(TlValue::Int(7).is_scalar());
        assert!(TlValue::Double(1.5).is_scalar());
        assert!(TlValue::Date(1_700_000_000.0).is_scalar());
        assert!(TlValue::Str("x".into()).is_scalar());

        assert!(!TlValue::Bytes(vec![1]).is_scalar());
        assert!(!TlValue::List(vec![]).is_scalar());
        assert!(!TlValue::Map(TlMap::new()).is_scalar());
    }

    #[test]
    fn accessors() {
        assert_eq!(TlValue::from("hi").as_str(), Some("hi"));
        assert_eq!(TlValue::from(42i64).as_int(), Some(42));
        assert_eq!(TlValue::from(true).as_bool(), Some(true));
        assert_eq!(TlValue::Null.as_str(), None);
    }

    #[test]
    fn display_containers() {
        let v = TlValue::List(vec![TlValue::Int(1), TlValue::from("two")]);
        assert_eq!(v.to_string(), "[1, \"two\"]");
    }
}
