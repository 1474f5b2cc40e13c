//! Attribute and value types of the tracing host
//!
//! Attributes are created once by the host registry and referred to by handle.
//! Values are borrowed for the duration of a single host call.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Data type of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttrType {
    String,
    UInt,
    Bool,
}

/// Scoping semantics of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttrProperty {
    /// Stack-scoped begin/end forming call trees
    Nested,

    /// One-shot value, not tracked on the blackboard
    Point,

    /// Never fires dependent listeners on update
    SkipEvents,
}

/// Handle to an attribute owned by the host registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeKey(u64);

impl AttributeKey {
    /// Handle that refers to no attribute
    pub const INVALID: AttributeKey = AttributeKey(u64::MAX);

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn id(self) -> u64 {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 != u64::MAX
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "attr#{}", self.0)
        } else {
            f.write_str("attr#invalid")
        }
    }
}

/// Borrowed attribute value.
///
/// String values are raw bytes with an explicit length; the length may
/// include a trailing NUL when the producer stores one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant<'a> {
    Empty,
    Str(&'a [u8]),
    UInt(u64),
    Bool(bool),
}

impl<'a> Variant<'a> {
    /// Wrap a string without a terminator
    pub fn from_text(s: &'a str) -> Self {
        Variant::Str(s.as_bytes())
    }

    /// Type of the contained value, `None` for `Empty`
    pub fn attr_type(&self) -> Option<AttrType> {
        match self {
            Variant::Empty => None,
            Variant::Str(_) => Some(AttrType::String),
            Variant::UInt(_) => Some(AttrType::UInt),
            Variant::Bool(_) => Some(AttrType::Bool),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Variant::Empty)
    }

    /// Raw string bytes, including a stored terminator if present
    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        match *self {
            Variant::Str(b) => Some(b),
            _ => None,
        }
    }

    /// String contents with one trailing NUL stripped
    pub fn text(&self) -> Option<&'a str> {
        let bytes = self.as_bytes()?;
        let bytes = bytes.strip_suffix(&[0]).unwrap_or(bytes);
        std::str::from_utf8(bytes).ok()
    }

    pub fn to_uint(&self) -> Option<u64> {
        match *self {
            Variant::UInt(v) => Some(v),
            _ => None,
        }
    }

    pub fn to_bool(&self) -> Option<bool> {
        match *self {
            Variant::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// Copy into an owned value. Hosts that retain data past the call use this.
    pub fn to_value(&self) -> Value {
        match *self {
            Variant::Empty => Value::Empty,
            Variant::Str(b) => Value::Str(b.to_vec()),
            Variant::UInt(v) => Value::UInt(v),
            Variant::Bool(v) => Value::Bool(v),
        }
    }
}

impl From<u64> for Variant<'_> {
    fn from(v: u64) -> Self {
        Variant::UInt(v)
    }
}

impl From<bool> for Variant<'_> {
    fn from(v: bool) -> Self {
        Variant::Bool(v)
    }
}

/// Owned counterpart of [`Variant`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Empty,
    Str(Vec<u8>),
    UInt(u64),
    Bool(bool),
}

impl Value {
    pub fn as_variant(&self) -> Variant<'_> {
        match self {
            Value::Empty => Variant::Empty,
            Value::Str(b) => Variant::Str(b.as_slice()),
            Value::UInt(v) => Variant::UInt(*v),
            Value::Bool(v) => Variant::Bool(*v),
        }
    }

    /// See [`Variant::text`]
    pub fn text(&self) -> Option<&str> {
        match self {
            Value::Str(b) => {
                let b: &[u8] = b;
                let b = b.strip_suffix(&[0]).unwrap_or(b);
                std::str::from_utf8(b).ok()
            }
            _ => None,
        }
    }
}

/// A single (attribute, value) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry<'a> {
    pub attr: AttributeKey,
    pub value: Variant<'a>,
}

impl<'a> Entry<'a> {
    pub const EMPTY: Entry<'static> = Entry {
        attr: AttributeKey::INVALID,
        value: Variant::Empty,
    };

    pub fn new(attr: AttributeKey, value: Variant<'a>) -> Self {
        Self { attr, value }
    }
}
