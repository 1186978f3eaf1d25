//! [`PolicyStore`]: the abstract read interface over a persistence backend
//! (spec.md §4.5). Concrete backends are, per spec.md §1, external
//! collaborators — except for the `file` adapter, which exists only to
//! parse the canonical interchange document spec.md §6 itself defines, and
//! the in-memory store used by tests and by embedders who already hold
//! `Policy` values.

pub mod file;

use crate::error::AbacError;
use crate::policy::Policy;

/// Minimum read operations a backend must provide. Backends must be
/// idempotent and repeatable on `load_all` within an engine process
/// (spec.md §4.5).
pub trait PolicyStore: std::fmt::Debug {
    fn load_all(&self) -> Result<Vec<Policy>, AbacError>;

    fn load_by_name(&self, name: &str) -> Result<Option<Policy>, AbacError> {
        Ok(self
            .load_all()?
            .into_iter()
            .find(|policy| policy.name == name))
    }
}

/// A `PolicyStore` backed by an in-process `Vec<Policy>`. Useful for tests,
/// and for embedders that already construct `Policy` values in code rather
/// than loading them from a file.
#[derive(Debug)]
pub struct MemoryStore {
    policies: Vec<Policy>,
}

impl MemoryStore {
    pub fn new(policies: Vec<Policy>) -> MemoryStore {
        MemoryStore { policies }
    }
}

impl PolicyStore for MemoryStore {
    fn load_all(&self) -> Result<Vec<Policy>, AbacError> {
        Ok(self
            .policies
            .iter()
            .map(|p| clone_policy(p))
            .collect())
    }
}

/// `Policy`/`Rule`/`Expression` intentionally don't derive `Clone` (an
/// `Expression::Binary`'s cached `Regex` makes that a non-trivial choice);
/// `MemoryStore` re-derives policies from their own declared shape instead
/// of cloning the expression tree, exercising the same build path a real
/// backend's `load_all` would use.
fn clone_policy(policy: &Policy) -> Policy {
    use crate::rule::Rule;
    let expressions = policy
        .rule
        .expressions
        .iter()
        .map(clone_expression)
        .collect();
    Policy {
        name: policy.name.clone(),
        description: policy.description.clone(),
        effect: policy.effect,
        actions: policy.actions.clone(),
        actors: policy.actors.clone(),
        subjects: policy.subjects.clone(),
        rule: Rule::new(policy.rule.condition, expressions),
    }
}

fn clone_expression(expr: &crate::expr::Expression) -> crate::expr::Expression {
    use crate::expr::Expression;
    match expr {
        Expression::Unary { operator, operand } => Expression::Unary {
            operator: *operator,
            operand: operand.clone(),
        },
        Expression::Binary {
            operator,
            left,
            right,
            compiled_regex,
        } => Expression::Binary {
            operator: *operator,
            left: left.clone(),
            right: right.clone(),
            compiled_regex: compiled_regex.clone(),
        },
        Expression::Function { name, pivot, args } => Expression::Function {
            name: *name,
            pivot: pivot.clone(),
            args: args.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Effect;
    use crate::rule::{Condition, Rule};

    #[test]
    fn test_memory_store_load_all_and_by_name() {
        let policy = Policy::new("allow-all", "", Effect::Permit, Rule::new(Condition::And, vec![]));
        let store = MemoryStore::new(vec![policy]);
        assert_eq!(1, store.load_all().unwrap().len());
        assert!(store.load_by_name("allow-all").unwrap().is_some());
        assert!(store.load_by_name("nope").unwrap().is_none());
    }
}
