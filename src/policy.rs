//! [`Policy`]: a named unit bundling metadata (effect, declared
//! actors/actions/subjects) with a combined [`Rule`].

use crate::rule::Rule;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A policy's intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Permit,
    Deny,
}

/// An immutable, named policy. Declared `actions`/`actors`/`subjects` are
/// *declarative routing metadata* consumed by the PRP to narrow the
/// candidate set (spec.md §9's open question on the source's dual
/// actor/subject metadata); the rule's own `Attribute` operands are
/// *operand routing metadata* consumed by the accessor and are not required
/// to be consistent with the declared sets.
#[derive(Debug)]
pub struct Policy {
    pub name: String,
    pub description: String,
    pub effect: Effect,
    pub actions: HashSet<String>,
    pub actors: HashSet<String>,
    pub subjects: HashSet<String>,
    pub rule: Rule,
}

impl Policy {
    pub fn new<S1, S2>(name: S1, description: S2, effect: Effect, rule: Rule) -> Policy
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Policy {
            name: name.into(),
            description: description.into(),
            effect,
            actions: HashSet::new(),
            actors: HashSet::new(),
            subjects: HashSet::new(),
            rule,
        }
    }

    pub fn with_actions<I, S>(mut self, actions: I) -> Policy
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions = actions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_actors<I, S>(mut self, actors: I) -> Policy
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actors = actors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_subjects<I, S>(mut self, subjects: I) -> Policy
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subjects = subjects.into_iter().map(Into::into).collect();
        self
    }

    /// Pure set membership test: does this policy declare `name` among its
    /// actor categories?
    pub fn has_actor(&self, name: &str) -> bool {
        self.actors.contains(name)
    }

    /// Pure set membership test: does this policy declare `name` among its
    /// subject categories?
    pub fn has_subject(&self, name: &str) -> bool {
        self.subjects.contains(name)
    }

    /// Does this policy target the given action? An empty declared set
    /// matches any action (spec.md §3).
    pub fn matches_action(&self, action: &str) -> bool {
        self.actions.is_empty() || self.actions.contains(action)
    }

    /// Does this policy target the given actor category? Empty = any.
    pub fn matches_actor_category(&self, actor_category: &str) -> bool {
        self.actors.is_empty() || self.has_actor(actor_category)
    }

    /// Does this policy target at least one of the given subject
    /// categories? Empty declared set = any.
    pub fn matches_subject_categories<'a, I>(&self, subject_categories: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.subjects.is_empty()
            || subject_categories.into_iter().any(|s| self.has_subject(s))
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({:?}): {}", self.name, self.effect, self.description)
    }
}
