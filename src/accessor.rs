//! The AttributeAccessor: resolves an `(entity, name)` reference against a
//! request's [`PolicyContext`] into a concrete [`Value`].

use crate::attribute::{Attribute, Entity, Value};
use crate::context::{EnvValue, Pip, PolicyContext, Resolved};
use log::trace;

/// Signals that an `Attribute` could not be resolved against the context.
/// Recoverable: the PDP folds this into a per-policy `indeterminate`
/// outcome rather than surfacing it as a thrown error (spec.md §4.1, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeNotResolvable;

/// Stateless resolver: given a context and an attribute reference, produces
/// the value it resolves to, or `AttributeNotResolvable`.
#[derive(Debug, Default)]
pub struct AttributeAccessor;

impl AttributeAccessor {
    pub fn new() -> AttributeAccessor {
        AttributeAccessor
    }

    pub fn resolve(
        &self,
        context: &PolicyContext,
        attribute: &Attribute,
    ) -> Result<Value, AttributeNotResolvable> {
        trace!("resolve({:?})", attribute);
        match attribute.entity {
            Entity::Literal => attribute.literal.clone().ok_or(AttributeNotResolvable),
            Entity::Actor => {
                let (head, tail) = attribute.name_head_tail().ok_or(AttributeNotResolvable)?;
                resolve_path(context.actor.as_ref(), head, tail)
            }
            Entity::Subject => {
                // Per spec.md §3 the subject dimension is an ordered sequence of
                // PIPs; evaluating a rule expression doesn't name which one it
                // means. This engine resolves subject attributes against the
                // first subject in the sequence (see DESIGN.md's resolution of
                // this open question). Zero subjects is indeterminate.
                let first = context.subjects.first().ok_or(AttributeNotResolvable)?;
                let (head, tail) = attribute.name_head_tail().ok_or(AttributeNotResolvable)?;
                resolve_path(first.as_ref(), head, tail)
            }
            Entity::Environment => {
                let (head, tail) = attribute.name_head_tail().ok_or(AttributeNotResolvable)?;
                match context.environment.get(head) {
                    Some(EnvValue::Value(v)) if tail.is_none() => Ok(v.clone()),
                    Some(EnvValue::Value(_)) => Err(AttributeNotResolvable),
                    Some(EnvValue::Pip(pip)) => match tail {
                        Some(rest) => {
                            let (next_head, next_tail) = split_first(rest);
                            resolve_path(pip.as_ref(), next_head, next_tail)
                        }
                        None => Err(AttributeNotResolvable),
                    },
                    None => Err(AttributeNotResolvable),
                }
            }
        }
    }
}

fn split_first(path: &str) -> (&str, Option<&str>) {
    match path.find('.') {
        Some(idx) => (&path[..idx], Some(&path[idx + 1..])),
        None => (path, None),
    }
}

/// Walks a (possibly dotted) path against a PIP, recursing through
/// `Resolved::Nested` hops.
fn resolve_path(
    pip: &dyn Pip,
    head: &str,
    tail: Option<&str>,
) -> Result<Value, AttributeNotResolvable> {
    match pip.resolve(head) {
        Resolved::Value(v) if tail.is_none() => Ok(v),
        Resolved::Value(_) => Err(AttributeNotResolvable),
        Resolved::Nested(nested) => match tail {
            Some(rest) => {
                let (next_head, next_tail) = split_first(rest);
                resolve_path(nested, next_head, next_tail)
            }
            None => Err(AttributeNotResolvable),
        },
        Resolved::Missing => Err(AttributeNotResolvable),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MapPip;

    fn context() -> PolicyContext {
        let org = MapPip::new().with("id", 99i64);
        let actor = MapPip::new().with("id", 7i64).with_nested("org", org);
        let subject = MapPip::new().with("authorId", 7i64).with("status", "draft");
        PolicyContext::new(Box::new(actor))
            .with_subject(Box::new(subject))
            .with_environment("hour", Value::Int(10))
    }

    #[test]
    fn test_resolve_actor_attribute() {
        let ctx = context();
        let accessor = AttributeAccessor::new();
        let v = accessor.resolve(&ctx, &Attribute::actor("id")).unwrap();
        assert_eq!(Value::Int(7), v);
    }

    #[test]
    fn test_resolve_dotted_actor_attribute() {
        let ctx = context();
        let accessor = AttributeAccessor::new();
        let v = accessor
            .resolve(&ctx, &Attribute::actor("org.id"))
            .unwrap();
        assert_eq!(Value::Int(99), v);
    }

    #[test]
    fn test_resolve_subject_attribute() {
        let ctx = context();
        let accessor = AttributeAccessor::new();
        let v = accessor
            .resolve(&ctx, &Attribute::subject("authorId"))
            .unwrap();
        assert_eq!(Value::Int(7), v);
    }

    #[test]
    fn test_resolve_subject_attribute_with_no_subjects_is_not_resolvable() {
        let ctx = PolicyContext::new(Box::new(MapPip::new()));
        let accessor = AttributeAccessor::new();
        assert_eq!(
            Err(AttributeNotResolvable),
            accessor.resolve(&ctx, &Attribute::subject("authorId"))
        );
    }

    #[test]
    fn test_resolve_environment_attribute() {
        let ctx = context();
        let accessor = AttributeAccessor::new();
        let v = accessor
            .resolve(&ctx, &Attribute::environment("hour"))
            .unwrap();
        assert_eq!(Value::Int(10), v);
    }

    #[test]
    fn test_resolve_missing_attribute_is_not_resolvable() {
        let ctx = context();
        let accessor = AttributeAccessor::new();
        assert_eq!(
            Err(AttributeNotResolvable),
            accessor.resolve(&ctx, &Attribute::subject("nonexistent"))
        );
    }

    #[test]
    fn test_resolve_literal() {
        let ctx = context();
        let accessor = AttributeAccessor::new();
        let v = accessor
            .resolve(&ctx, &Attribute::literal("draft"))
            .unwrap();
        assert_eq!(Value::String("draft".into()), v);
    }
}
