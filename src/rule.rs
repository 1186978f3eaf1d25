//! A [`Rule`] combines an ordered sequence of [`Expression`]s with a
//! boolean [`Condition`].

use crate::accessor::AttributeAccessor;
use crate::cancel::Cancellation;
use crate::context::PolicyContext;
use crate::error::AbacError;
use crate::expr::{Expression, Outcome};
use log::trace;

/// The boolean combinator a [`Rule`] applies over its expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    And,
    Or,
    Not,
}

impl Condition {
    pub fn parse(s: &str) -> Option<Condition> {
        match s {
            "AND" => Some(Condition::And),
            "OR" => Some(Condition::Or),
            "NOT" => Some(Condition::Not),
            _ => None,
        }
    }
}

/// An ordered sequence of expressions combined by a `condition`. `NOT`
/// requires exactly one expression; `AND`/`OR` require at least one.
#[derive(Debug)]
pub struct Rule {
    pub condition: Condition,
    pub expressions: Vec<Expression>,
}

impl Rule {
    pub fn new(condition: Condition, expressions: Vec<Expression>) -> Rule {
        Rule {
            condition,
            expressions,
        }
    }

    /// Evaluates every expression in declared left-to-right order (spec.md
    /// §5's ordering guarantee) and combines them with Kleene logic.
    /// Cancellation is checked between each expression evaluation (spec.md
    /// §5); a cancellation observed mid-rule discards the partial result.
    pub fn evaluate(
        &self,
        context: &PolicyContext,
        accessor: &AttributeAccessor,
        cancellation: &dyn Cancellation,
    ) -> Result<Outcome, AbacError> {
        trace!("evaluate rule {:?}", self.condition);
        if self.condition == Condition::Not {
            return match self.expressions.first() {
                Some(e) => Ok(e.evaluate(context, accessor).not()),
                None => Ok(Outcome::Indeterminate),
            };
        }

        let identity = match self.condition {
            Condition::And => Outcome::True,
            Condition::Or => Outcome::False,
            Condition::Not => unreachable!("handled above"),
        };
        let mut acc = identity;
        for (index, expression) in self.expressions.iter().enumerate() {
            if index > 0 && cancellation.is_canceled() {
                return Err(AbacError::Canceled);
            }
            let outcome = expression.evaluate(context, accessor);
            acc = match self.condition {
                Condition::And => acc.and(outcome),
                Condition::Or => acc.or(outcome),
                Condition::Not => unreachable!("handled above"),
            };
        }
        Ok(acc)
    }
}
