//! The ExpressionBuilder: translates a declarative expression record (the
//! `serde_json::Value` objects inside a policy's `rules.expressions` array,
//! spec.md §6) into a validated [`Expression`] tree.
//!
//! Shape disambiguation (spec.md §4.3):
//! - `function` + `arguments` present → [`Expression::Function`].
//! - `operator` present with exactly one operand (an attribute-shaped key
//!   or a `value` key) → [`Expression::Unary`].
//! - `operator` present with exactly two operands → [`Expression::Binary`].
//! - anything else → `MalformedPolicy`.
//!
//! An *attribute-shaped key* is any object key ending in `_attribute`; its
//! prefix (`actor`, `subject`, `environment`) names the entity.

use crate::attribute::{Attribute, Value};
use crate::error::AbacError;
use crate::expr::{BinaryOperator, Expression, FunctionName, UnaryOperator};
use log::trace;
use regex::Regex;
use serde_json::Value as Json;

/// Stateless translator from declarative JSON records to expression nodes.
#[derive(Debug, Default)]
pub struct ExpressionBuilder;

impl ExpressionBuilder {
    pub fn new() -> ExpressionBuilder {
        ExpressionBuilder
    }

    /// Builds one expression node. `policy_name`/`rule_index` are carried
    /// only so a failure names the offending policy and rule, per spec.md
    /// §4.3.
    pub fn build(
        &self,
        record: &Json,
        policy_name: &str,
        rule_index: usize,
    ) -> Result<Expression, AbacError> {
        trace!("build({:?})", record);
        let object = record.as_object().ok_or_else(|| {
            AbacError::malformed_policy(policy_name, rule_index, "expression is not an object")
        })?;

        let mut operands = Vec::new();
        for (key, value) in object.iter() {
            if let Some(prefix) = key.strip_suffix("_attribute") {
                let attribute = match prefix {
                    "actor" => Attribute::actor(as_name(value, policy_name, rule_index)?),
                    "subject" => Attribute::subject(as_name(value, policy_name, rule_index)?),
                    "environment" => {
                        Attribute::environment(as_name(value, policy_name, rule_index)?)
                    }
                    other => {
                        return Err(AbacError::malformed_policy(
                            policy_name,
                            rule_index,
                            format!("unknown attribute entity prefix: {}", other),
                        ))
                    }
                };
                operands.push((entity_priority(&attribute), attribute));
            }
        }
        if let Some(value) = object.get("value") {
            let attribute = Attribute::literal(Value::from(value.clone()));
            operands.push((3, attribute));
        }
        operands.sort_by_key(|(priority, _)| *priority);

        if object.contains_key("function") && object.contains_key("arguments") {
            return self.build_function(object, operands, policy_name, rule_index);
        }

        if let Some(operator_value) = object.get("operator") {
            let operator_name = operator_value.as_str().ok_or_else(|| {
                AbacError::malformed_policy(policy_name, rule_index, "operator must be a string")
            })?;
            return match operands.len() {
                1 => self.build_unary(operator_name, operands, policy_name, rule_index),
                2 => self.build_binary(operator_name, operands, policy_name, rule_index),
                n => Err(AbacError::malformed_policy(
                    policy_name,
                    rule_index,
                    format!("operator expects 1 or 2 operands, found {}", n),
                )),
            };
        }

        Err(AbacError::malformed_policy(
            policy_name,
            rule_index,
            "expression has neither a recognized function shape nor an operator shape",
        ))
    }

    fn build_unary(
        &self,
        operator_name: &str,
        mut operands: Vec<(u8, Attribute)>,
        policy_name: &str,
        rule_index: usize,
    ) -> Result<Expression, AbacError> {
        let operator = UnaryOperator::parse(operator_name).ok_or_else(|| {
            AbacError::malformed_policy(
                policy_name,
                rule_index,
                format!("unknown unary operator: {}", operator_name),
            )
        })?;
        let (_, operand) = operands.remove(0);
        Ok(Expression::Unary { operator, operand })
    }

    fn build_binary(
        &self,
        operator_name: &str,
        mut operands: Vec<(u8, Attribute)>,
        policy_name: &str,
        rule_index: usize,
    ) -> Result<Expression, AbacError> {
        let operator = BinaryOperator::parse(operator_name).ok_or_else(|| {
            AbacError::malformed_policy(
                policy_name,
                rule_index,
                format!("unknown binary operator: {}", operator_name),
            )
        })?;
        let (_, right) = operands.remove(1);
        let (_, left) = operands.remove(0);

        let compiled_regex = if operator == BinaryOperator::Matches {
            match (&right.entity, right.literal.as_ref().and_then(Value::as_str)) {
                (crate::attribute::Entity::Literal, Some(pattern)) => {
                    Some(Regex::new(pattern).map_err(|e| {
                        AbacError::malformed_policy(
                            policy_name,
                            rule_index,
                            format!("invalid regex literal {:?}: {}", pattern, e),
                        )
                    })?)
                }
                _ => {
                    return Err(AbacError::malformed_policy(
                        policy_name,
                        rule_index,
                        "matches requires a string regex literal on the right-hand side",
                    ))
                }
            }
        } else {
            None
        };

        Ok(Expression::Binary {
            operator,
            left,
            right,
            compiled_regex,
        })
    }

    fn build_function(
        &self,
        object: &serde_json::Map<String, Json>,
        operands: Vec<(u8, Attribute)>,
        policy_name: &str,
        rule_index: usize,
    ) -> Result<Expression, AbacError> {
        let function_name = object
            .get("function")
            .and_then(Json::as_str)
            .ok_or_else(|| {
                AbacError::malformed_policy(policy_name, rule_index, "function must be a string")
            })?;
        let name = FunctionName::parse(function_name).ok_or_else(|| {
            AbacError::malformed_policy(
                policy_name,
                rule_index,
                format!("unknown function: {}", function_name),
            )
        })?;

        // The pivot is the one attribute-shaped operand (a `value` key is
        // not a valid pivot for a function expression).
        let attribute_operands: Vec<_> = operands
            .into_iter()
            .filter(|(_, a)| !a.is_entity(crate::attribute::Entity::Literal))
            .collect();
        if attribute_operands.len() != 1 {
            return Err(AbacError::malformed_policy(
                policy_name,
                rule_index,
                format!(
                    "function expression expects exactly one attribute-shaped pivot, found {}",
                    attribute_operands.len()
                ),
            ));
        }
        let pivot = attribute_operands.into_iter().next().unwrap().1;

        let raw_args = object
            .get("arguments")
            .and_then(Json::as_array)
            .ok_or_else(|| {
                AbacError::malformed_policy(policy_name, rule_index, "arguments must be an array")
            })?;
        if raw_args.len() != name.arity() {
            return Err(AbacError::malformed_policy(
                policy_name,
                rule_index,
                format!(
                    "function {:?} expects {} argument(s), found {}",
                    name,
                    name.arity(),
                    raw_args.len()
                ),
            ));
        }
        let mut args = Vec::with_capacity(raw_args.len());
        for raw in raw_args {
            args.push(parse_argument(raw, policy_name, rule_index)?);
        }

        Ok(Expression::Function { name, pivot, args })
    }
}

/// Each entry of a function's `arguments` array is either a plain literal
/// JSON scalar/array, or a single-key attribute-shaped object
/// (`{"actor_attribute": "tags"}`).
fn parse_argument(raw: &Json, policy_name: &str, rule_index: usize) -> Result<Attribute, AbacError> {
    if let Some(object) = raw.as_object() {
        if object.len() == 1 {
            if let Some((key, value)) = object.iter().next() {
                if let Some(prefix) = key.strip_suffix("_attribute") {
                    let name = as_name(value, policy_name, rule_index)?;
                    return Ok(match prefix {
                        "actor" => Attribute::actor(name),
                        "subject" => Attribute::subject(name),
                        "environment" => Attribute::environment(name),
                        other => {
                            return Err(AbacError::malformed_policy(
                                policy_name,
                                rule_index,
                                format!("unknown attribute entity prefix: {}", other),
                            ))
                        }
                    });
                }
            }
        }
    }
    Ok(Attribute::literal(Value::from(raw.clone())))
}

fn as_name(value: &Json, policy_name: &str, rule_index: usize) -> Result<String, AbacError> {
    value.as_str().map(str::to_string).ok_or_else(|| {
        AbacError::malformed_policy(
            policy_name,
            rule_index,
            "attribute-shaped key must hold a string attribute name",
        )
    })
}

/// Ordering used to deterministically assign `left`/`right` (and to find
/// the single operand for a Unary expression) regardless of the JSON
/// object's own key order: actor, then subject, then environment, then a
/// literal `value`.
fn entity_priority(attribute: &Attribute) -> u8 {
    match attribute.entity {
        crate::attribute::Entity::Actor => 0,
        crate::attribute::Entity::Subject => 1,
        crate::attribute::Entity::Environment => 2,
        crate::attribute::Entity::Literal => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_binary_eq() {
        let record = json!({
            "operator": "eq",
            "actor_attribute": "id",
            "subject_attribute": "authorId"
        });
        let expr = ExpressionBuilder::new().build(&record, "edit-post", 0).unwrap();
        match expr {
            Expression::Binary { operator, left, right, .. } => {
                assert_eq!(BinaryOperator::Eq, operator);
                assert_eq!(Some("id".to_string()), left.name);
                assert_eq!(Some("authorId".to_string()), right.name);
            }
            _ => panic!("expected Binary"),
        }
    }

    #[test]
    fn test_build_binary_with_value() {
        let record = json!({
            "operator": "in",
            "subject_attribute": "status",
            "value": ["draft", "review"]
        });
        let expr = ExpressionBuilder::new().build(&record, "p", 1).unwrap();
        match expr {
            Expression::Binary { operator, right, .. } => {
                assert_eq!(BinaryOperator::In, operator);
                assert_eq!(crate::attribute::Entity::Literal, right.entity);
            }
            _ => panic!("expected Binary"),
        }
    }

    #[test]
    fn test_build_unary() {
        let record = json!({ "operator": "is_null", "subject_attribute": "deletedAt" });
        let expr = ExpressionBuilder::new().build(&record, "p", 0).unwrap();
        match expr {
            Expression::Unary { operator, .. } => assert_eq!(UnaryOperator::IsNull, operator),
            _ => panic!("expected Unary"),
        }
    }

    #[test]
    fn test_build_function_is_between() {
        let record = json!({
            "function": "isBetween",
            "environment_attribute": "now",
            "arguments": ["09:00", "17:00"]
        });
        let expr = ExpressionBuilder::new().build(&record, "p", 2).unwrap();
        match expr {
            Expression::Function { name, args, .. } => {
                assert_eq!(FunctionName::IsBetween, name);
                assert_eq!(2, args.len());
            }
            _ => panic!("expected Function"),
        }
    }

    #[test]
    fn test_unknown_operator_is_malformed() {
        let record = json!({ "operator": "frobnicate", "actor_attribute": "id", "value": 1 });
        let err = ExpressionBuilder::new().build(&record, "p", 0).unwrap_err();
        match err {
            AbacError::MalformedPolicy { policy_name, .. } => assert_eq!("p", policy_name),
            _ => panic!("expected MalformedPolicy"),
        }
    }

    #[test]
    fn test_wrong_function_arity_is_malformed() {
        let record = json!({
            "function": "isBetween",
            "environment_attribute": "now",
            "arguments": ["09:00"]
        });
        assert!(ExpressionBuilder::new().build(&record, "p", 0).is_err());
    }

    #[test]
    fn test_matches_without_literal_regex_is_malformed() {
        let record = json!({
            "operator": "matches",
            "actor_attribute": "email",
            "subject_attribute": "emailPattern"
        });
        assert!(ExpressionBuilder::new().build(&record, "p", 0).is_err());
    }

    #[test]
    fn test_matches_compiles_and_caches_regex() {
        let record = json!({
            "operator": "matches",
            "actor_attribute": "email",
            "value": "^a"
        });
        let expr = ExpressionBuilder::new().build(&record, "p", 0).unwrap();
        match expr {
            Expression::Binary { compiled_regex, .. } => assert!(compiled_regex.is_some()),
            _ => panic!("expected Binary"),
        }
    }

    #[test]
    fn test_malformed_shape_is_rejected() {
        let record = json!({ "nonsense": true });
        assert!(ExpressionBuilder::new().build(&record, "p", 0).is_err());
    }

    #[test]
    fn test_builder_is_idempotent() {
        let record = json!({
            "operator": "eq",
            "actor_attribute": "id",
            "subject_attribute": "authorId"
        });
        let builder = ExpressionBuilder::new();
        let first = builder.build(&record, "p", 0).unwrap();
        let second = builder.build(&record, "p", 0).unwrap();
        assert_eq!(format!("{:?}", first), format!("{:?}", second));
    }
}
