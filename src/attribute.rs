//! Attribute references and the value type they resolve to.
//!
//! An [`Attribute`] is a symbolic pointer into a [`crate::context::PolicyContext`]:
//! it names an `entity` (`actor`, `subject`, `environment`, or `literal`) and,
//! for the first three, a `name` identifying the attribute within that
//! entity. `entity = literal` carries the value directly and no `name`.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Which part of the request context an [`Attribute`] points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    Actor,
    Subject,
    Environment,
    Literal,
}

/// A normalized attribute value: what the accessor returns, and what a
/// literal operand in an expression holds. Integers stay integers, floats
/// stay floats, strings stay strings, booleans stay booleans, null is null.
/// Anything else a PIP hands back is carried opaquely in `Object` and is
/// only ever compared for equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Object(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// "Truthy" in the same loose sense the `truthy`/`falsy` unary operators
    /// use: null and `false` are falsy, `0`/`0.0`/empty string/empty list
    /// are falsy, everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(l) => !l.is_empty(),
            Value::Object(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Numeric comparison, but only between two values of comparable type.
    /// Mixed-type comparisons (e.g. int vs string) return `None`, which the
    /// caller folds into `indeterminate` rather than silently coercing.
    pub fn partial_compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::String(a), Value::String(b)) => a.partial_cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) => (*a as f64) == *b,
            (Value::Float(a), Value::Int(b)) => *a == (*b as f64),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::List(items) => write!(f, "{:?}", items),
            Value::Object(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            obj @ serde_json::Value::Object(_) => Value::Object(obj),
        }
    }
}

/// A reference into the request context, or a literal carried inline.
///
/// Invariant: exactly one of `name`/`literal` is set, and `entity ==
/// Entity::Literal` iff `literal` is set. `Attribute::actor`,
/// `Attribute::subject`, `Attribute::environment` and `Attribute::literal`
/// are the only ways to build one, so the invariant can't be violated from
/// outside this module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    pub entity: Entity,
    pub name: Option<String>,
    pub literal: Option<Value>,
}

impl Attribute {
    pub fn actor<S: Into<String>>(name: S) -> Attribute {
        Attribute {
            entity: Entity::Actor,
            name: Some(name.into()),
            literal: None,
        }
    }

    pub fn subject<S: Into<String>>(name: S) -> Attribute {
        Attribute {
            entity: Entity::Subject,
            name: Some(name.into()),
            literal: None,
        }
    }

    pub fn environment<S: Into<String>>(name: S) -> Attribute {
        Attribute {
            entity: Entity::Environment,
            name: Some(name.into()),
            literal: None,
        }
    }

    pub fn literal<V: Into<Value>>(value: V) -> Attribute {
        Attribute {
            entity: Entity::Literal,
            name: None,
            literal: Some(value.into()),
        }
    }

    /// Splits a dotted name (`"org.id"`) into its first segment and the
    /// remaining dotted path, if any. Used by the accessor to recurse into
    /// nested PIPs reachable through `environment` values.
    pub fn name_head_tail(&self) -> Option<(&str, Option<&str>)> {
        let name = self.name.as_deref()?;
        match name.find('.') {
            Some(idx) => Some((&name[..idx], Some(&name[idx + 1..]))),
            None => Some((name, None)),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.entity {
            Entity::Literal => write!(f, "{}", self.literal.as_ref().unwrap()),
            _ => write!(f, "{:?}.{}", self.entity, self.name.as_deref().unwrap_or("")),
        }
    }
}
