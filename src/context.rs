//! Request-scoped context and the decision it produces.

use crate::attribute::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A Policy Information Point: an attribute-bearing value supplied by the
/// caller (an actor, a subject, or a nested environment value) from which
/// named attributes can be resolved.
///
/// This is the statically-typed replacement for the source's reflective
/// getter lookup (see design note in the project root's DESIGN.md): each
/// concrete PIP type says, in its own `resolve`, how its attributes map to
/// values. The accessor (`crate::accessor`) only ever calls this trait; it
/// never reaches for reflection itself.
pub trait Pip: fmt::Debug {
    /// Resolve `name` against this PIP. Returns `Resolved::Missing` rather
    /// than panicking or erroring — the accessor turns that into
    /// `AttributeNotResolvable`, which the PDP folds into `indeterminate`.
    fn resolve(&self, name: &str) -> Resolved<'_>;
}

/// The outcome of asking a [`Pip`] to resolve one attribute name.
pub enum Resolved<'a> {
    /// A concrete value.
    Value(Value),
    /// The name denotes another PIP to recurse into (for dotted paths).
    Nested(&'a dyn Pip),
    /// No getter, field, or map entry matched.
    Missing,
}

/// A ready-made [`Pip`] backed by a `HashMap`, covering the "named
/// attribute map" fallback of the lookup contract (spec step 3) plus
/// scalar-or-nested values for dotted-path recursion.
#[derive(Debug, Default)]
pub struct MapPip {
    attributes: HashMap<String, MapEntry>,
}

#[derive(Debug)]
enum MapEntry {
    Value(Value),
    Nested(MapPip),
}

impl MapPip {
    pub fn new() -> Self {
        MapPip {
            attributes: HashMap::new(),
        }
    }

    pub fn with<S: Into<String>, V: Into<Value>>(mut self, name: S, value: V) -> Self {
        self.attributes.insert(name.into(), MapEntry::Value(value.into()));
        self
    }

    pub fn with_nested<S: Into<String>>(mut self, name: S, nested: MapPip) -> Self {
        self.attributes.insert(name.into(), MapEntry::Nested(nested));
        self
    }
}

impl Pip for MapPip {
    fn resolve(&self, name: &str) -> Resolved<'_> {
        match self.attributes.get(name) {
            Some(MapEntry::Value(v)) => Resolved::Value(v.clone()),
            Some(MapEntry::Nested(pip)) => Resolved::Nested(pip),
            None => Resolved::Missing,
        }
    }
}

/// An `environment` entry: either a plain scalar or a nested PIP (so
/// `environment.session.ip`-style dotted paths can recurse).
#[derive(Debug)]
pub enum EnvValue {
    Value(Value),
    Pip(Box<dyn Pip>),
}

impl From<Value> for EnvValue {
    fn from(v: Value) -> Self {
        EnvValue::Value(v)
    }
}

/// Request-scoped, immutable context: the actor, the subjects, and the
/// environment. Evaluation never mutates any of these; running the same
/// decision twice against the same context yields two decisions and no
/// observable side effect on the context itself.
#[derive(Debug)]
pub struct PolicyContext {
    pub actor: Box<dyn Pip>,
    pub subjects: Vec<Box<dyn Pip>>,
    pub environment: HashMap<String, EnvValue>,
}

impl PolicyContext {
    pub fn new(actor: Box<dyn Pip>) -> Self {
        PolicyContext {
            actor,
            subjects: Vec::new(),
            environment: HashMap::new(),
        }
    }

    pub fn with_subject(mut self, subject: Box<dyn Pip>) -> Self {
        self.subjects.push(subject);
        self
    }

    pub fn with_environment<S: Into<String>, E: Into<EnvValue>>(mut self, key: S, value: E) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }
}

/// The stable, non-zero code carried by a denied or indeterminate
/// [`Decision`]. `Permit` always projects to `0`, matching spec.md §3
/// ("code=0 when allowed").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionCode {
    Permit,
    Deny,
    Indeterminate,
    NoApplicablePolicy,
}

impl DecisionCode {
    /// Wire projection for the interchange boundary (spec.md §6).
    pub fn as_u16(self) -> u16 {
        match self {
            DecisionCode::Permit => 0,
            DecisionCode::Deny => 1,
            DecisionCode::Indeterminate => 2,
            DecisionCode::NoApplicablePolicy => 3,
        }
    }
}

/// The outcome of one `decide()` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub allowed: bool,
    pub message: Option<String>,
    pub code: DecisionCode,
}

impl Decision {
    pub fn permit() -> Decision {
        Decision {
            allowed: true,
            message: None,
            code: DecisionCode::Permit,
        }
    }

    pub fn deny<S: Into<String>>(message: S) -> Decision {
        Decision {
            allowed: false,
            message: Some(message.into()),
            code: DecisionCode::Deny,
        }
    }

    pub fn no_applicable_policy() -> Decision {
        Decision {
            allowed: false,
            message: None,
            code: DecisionCode::NoApplicablePolicy,
        }
    }

    pub fn indeterminate() -> Decision {
        Decision {
            allowed: false,
            message: Some("rule evaluation was indeterminate".into()),
            code: DecisionCode::Indeterminate,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.message {
            Some(message) => write!(
                f,
                "{} ({:?}): {}",
                if self.allowed { "permit" } else { "deny" },
                self.code,
                message
            ),
            None => write!(
                f,
                "{} ({:?})",
                if self.allowed { "permit" } else { "deny" },
                self.code
            ),
        }
    }
}
