use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use serde::{Serialize, Serializer};

use crate::bytecode::Function;

/// Heap-side payloads of a [`Value`].
#[derive(Debug, Clone)]
pub enum Object {
    Str(String),
    /// Shared handle to compiled code. Compared by identity, never ordered.
    Function(Rc<Function>),
}

/// Runtime value. Numbers double as slot indices, jump offsets and
/// function-table indices; there is no separate integer type.
#[derive(Debug, Clone)]
pub enum Value {
    Number(f32),
    Object(Object),
}

/// The union tag of a value, used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Number,
    String,
    Function,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Number => write!(f, "number"),
            Tag::String => write!(f, "string"),
            Tag::Function => write!(f, "function"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    #[error("expected {expected}, got {found}")]
    WrongTag { expected: Tag, found: Tag },
    #[error("cannot compare {left} with {right}")]
    Mismatch { left: Tag, right: Tag },
    #[error("{0} values cannot be compared")]
    Incomparable(Tag),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Object(Object::Str(s.into()))
    }

    pub fn function(f: Rc<Function>) -> Self {
        Value::Object(Object::Function(f))
    }

    pub fn tag(&self) -> Tag {
        match self {
            Value::Number(_) => Tag::Number,
            Value::Object(Object::Str(_)) => Tag::String,
            Value::Object(Object::Function(_)) => Tag::Function,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    pub fn is_str(&self) -> bool {
        matches!(self, Value::Object(Object::Str(_)))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Value::Object(Object::Function(_)))
    }

    pub fn as_number(&self) -> Result<f32, ValueError> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(ValueError::WrongTag { expected: Tag::Number, found: other.tag() }),
        }
    }

    pub fn as_str(&self) -> Result<&str, ValueError> {
        match self {
            Value::Object(Object::Str(s)) => Ok(s),
            other => Err(ValueError::WrongTag { expected: Tag::String, found: other.tag() }),
        }
    }

    pub fn as_function(&self) -> Result<&Rc<Function>, ValueError> {
        match self {
            Value::Object(Object::Function(f)) => Ok(f),
            other => Err(ValueError::WrongTag { expected: Tag::Function, found: other.tag() }),
        }
    }

    /// Equality as seen by `jeq`/`jneq`: both sides must carry the same tag,
    /// and function references are rejected outright.
    pub fn equals(&self, other: &Value) -> Result<bool, ValueError> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Ok(a == b),
            (Value::Object(Object::Str(a)), Value::Object(Object::Str(b))) => Ok(a == b),
            (Value::Object(Object::Function(_)), Value::Object(Object::Function(_))) => {
                Err(ValueError::Incomparable(Tag::Function))
            }
            (l, r) => Err(ValueError::Mismatch { left: l.tag(), right: r.tag() }),
        }
    }

    /// Ordering of two values with matching tags. Numbers compare
    /// numerically (NaN orders with nothing), strings lexicographically.
    pub fn compare(&self, other: &Value) -> Result<Option<Ordering>, ValueError> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Ok(a.partial_cmp(b)),
            (Value::Object(Object::Str(a)), Value::Object(Object::Str(b))) => Ok(Some(a.cmp(b))),
            (Value::Object(Object::Function(_)), Value::Object(Object::Function(_))) => {
                Err(ValueError::Incomparable(Tag::Function))
            }
            (l, r) => Err(ValueError::Mismatch { left: l.tag(), right: r.tag() }),
        }
    }

    pub fn less_than(&self, other: &Value) -> Result<bool, ValueError> {
        Ok(self.compare(other)? == Some(Ordering::Less))
    }

    pub fn greater_than(&self, other: &Value) -> Result<bool, ValueError> {
        Ok(self.compare(other)? == Some(Ordering::Greater))
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Number(0.0)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Object(Object::Str(a)), Value::Object(Object::Str(b))) => a == b,
            (Value::Object(Object::Function(a)), Value::Object(Object::Function(b))) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f32)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f32)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::str(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => {
                if n.is_finite() && *n == (*n as i64) as f32 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Object(Object::Str(s)) => write!(f, "{}", s),
            Value::Object(Object::Function(_)) => write!(f, "<function>"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Number(n) => serializer.serialize_f32(*n),
            Value::Object(Object::Str(s)) => serializer.serialize_str(s),
            Value::Object(Object::Function(_)) => serializer.serialize_str("<function>"),
        }
    }
}
