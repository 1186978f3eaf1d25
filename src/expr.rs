//! The expression tree: `Unary`, `Binary`, and `Function` expressions, each
//! evaluating to a Kleene tri-valued [`Outcome`] against a
//! [`crate::context::PolicyContext`].

use crate::accessor::AttributeAccessor;
use crate::attribute::{Attribute, Entity, Value};
use crate::context::PolicyContext;
use log::trace;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;

/// A Kleene three-valued truth value: the result of evaluating one
/// expression, or of combining several.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    True,
    False,
    Indeterminate,
}

impl Outcome {
    pub fn from_bool(b: bool) -> Outcome {
        if b {
            Outcome::True
        } else {
            Outcome::False
        }
    }

    pub fn is_true(self) -> bool {
        self == Outcome::True
    }

    /// Kleene AND: `true AND indeterminate = indeterminate`;
    /// `false AND indeterminate = false`.
    pub fn and(self, other: Outcome) -> Outcome {
        match (self, other) {
            (Outcome::False, _) | (_, Outcome::False) => Outcome::False,
            (Outcome::True, Outcome::True) => Outcome::True,
            _ => Outcome::Indeterminate,
        }
    }

    /// Kleene OR: `true OR indeterminate = true`;
    /// `false OR indeterminate = indeterminate`.
    pub fn or(self, other: Outcome) -> Outcome {
        match (self, other) {
            (Outcome::True, _) | (_, Outcome::True) => Outcome::True,
            (Outcome::False, Outcome::False) => Outcome::False,
            _ => Outcome::Indeterminate,
        }
    }

    /// Kleene NOT: `NOT indeterminate = indeterminate`.
    pub fn not(self) -> Outcome {
        match self {
            Outcome::True => Outcome::False,
            Outcome::False => Outcome::True,
            Outcome::Indeterminate => Outcome::Indeterminate,
        }
    }
}

/// Fixed registry of unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    IsNull,
    NotNull,
    Truthy,
    Falsy,
    Not,
}

impl UnaryOperator {
    pub fn parse(s: &str) -> Option<UnaryOperator> {
        match s {
            "is_null" => Some(UnaryOperator::IsNull),
            "not_null" => Some(UnaryOperator::NotNull),
            "truthy" => Some(UnaryOperator::Truthy),
            "falsy" => Some(UnaryOperator::Falsy),
            "not" => Some(UnaryOperator::Not),
            _ => None,
        }
    }
}

/// Fixed registry of binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Matches,
}

impl BinaryOperator {
    pub fn parse(s: &str) -> Option<BinaryOperator> {
        match s {
            "eq" => Some(BinaryOperator::Eq),
            "ne" => Some(BinaryOperator::Ne),
            "lt" => Some(BinaryOperator::Lt),
            "le" => Some(BinaryOperator::Le),
            "gt" => Some(BinaryOperator::Gt),
            "ge" => Some(BinaryOperator::Ge),
            "in" => Some(BinaryOperator::In),
            "not_in" => Some(BinaryOperator::NotIn),
            "matches" => Some(BinaryOperator::Matches),
            _ => None,
        }
    }
}

/// Fixed registry of function operators, with their declared arity (the
/// number of entries expected in `arguments`, not counting the pivot
/// attribute named by the `<entity>_attribute` key).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionName {
    StartsWith,
    EndsWith,
    Contains,
    IsBetween,
    HasAny,
    HasAll,
}

impl FunctionName {
    pub fn parse(s: &str) -> Option<FunctionName> {
        match s {
            "startsWith" => Some(FunctionName::StartsWith),
            "endsWith" => Some(FunctionName::EndsWith),
            "contains" => Some(FunctionName::Contains),
            "isBetween" => Some(FunctionName::IsBetween),
            "hasAny" => Some(FunctionName::HasAny),
            "hasAll" => Some(FunctionName::HasAll),
            _ => None,
        }
    }

    pub fn arity(self) -> usize {
        match self {
            FunctionName::StartsWith => 1,
            FunctionName::EndsWith => 1,
            FunctionName::Contains => 1,
            FunctionName::IsBetween => 2,
            FunctionName::HasAny => 1,
            FunctionName::HasAll => 1,
        }
    }
}

/// One node of the expression tree.
#[derive(Debug)]
pub enum Expression {
    Unary {
        operator: UnaryOperator,
        operand: Attribute,
    },
    Binary {
        operator: BinaryOperator,
        left: Attribute,
        right: Attribute,
        /// For `matches`, the right-hand literal's regex, compiled once at
        /// build time and cached here (spec.md §4.3).
        compiled_regex: Option<Regex>,
    },
    Function {
        name: FunctionName,
        pivot: Attribute,
        args: Vec<Attribute>,
    },
}

impl Expression {
    pub fn evaluate(&self, context: &PolicyContext, accessor: &AttributeAccessor) -> Outcome {
        trace!("evaluate({:?})", self);
        match self {
            Expression::Unary { operator, operand } => {
                let value = match accessor.resolve(context, operand) {
                    Ok(v) => v,
                    Err(_) => return Outcome::Indeterminate,
                };
                match operator {
                    UnaryOperator::IsNull => Outcome::from_bool(value.is_null()),
                    UnaryOperator::NotNull => Outcome::from_bool(!value.is_null()),
                    UnaryOperator::Truthy => Outcome::from_bool(value.is_truthy()),
                    UnaryOperator::Falsy => Outcome::from_bool(!value.is_truthy()),
                    UnaryOperator::Not => match value {
                        Value::Bool(b) => Outcome::from_bool(!b),
                        _ => Outcome::Indeterminate,
                    },
                }
            }
            Expression::Binary {
                operator,
                left,
                right,
                compiled_regex,
            } => {
                let lv = match accessor.resolve(context, left) {
                    Ok(v) => v,
                    Err(_) => return Outcome::Indeterminate,
                };
                evaluate_binary(*operator, &lv, right, compiled_regex.as_ref(), context, accessor)
            }
            Expression::Function { name, pivot, args } => {
                let pv = match accessor.resolve(context, pivot) {
                    Ok(v) => v,
                    Err(_) => return Outcome::Indeterminate,
                };
                let mut arg_values = Vec::with_capacity(args.len());
                for a in args {
                    match accessor.resolve(context, a) {
                        Ok(v) => arg_values.push(v),
                        Err(_) => return Outcome::Indeterminate,
                    }
                }
                evaluate_function(*name, &pv, &arg_values)
            }
        }
    }
}

fn evaluate_binary(
    operator: BinaryOperator,
    left: &Value,
    right: &Attribute,
    compiled_regex: Option<&Regex>,
    context: &PolicyContext,
    accessor: &AttributeAccessor,
) -> Outcome {
    if operator == BinaryOperator::Matches {
        let re = match compiled_regex {
            Some(re) => re,
            None => return Outcome::Indeterminate,
        };
        return match left.as_str() {
            Some(s) => Outcome::from_bool(re.is_match(s)),
            None => Outcome::Indeterminate,
        };
    }

    let rv = match accessor.resolve(context, right) {
        Ok(v) => v,
        Err(_) => return Outcome::Indeterminate,
    };

    match operator {
        BinaryOperator::Eq => Outcome::from_bool(left == &rv),
        BinaryOperator::Ne => Outcome::from_bool(left != &rv),
        BinaryOperator::Lt => compare(left, &rv, |o| o == Ordering::Less),
        BinaryOperator::Le => compare(left, &rv, |o| o != Ordering::Greater),
        BinaryOperator::Gt => compare(left, &rv, |o| o == Ordering::Greater),
        BinaryOperator::Ge => compare(left, &rv, |o| o != Ordering::Less),
        BinaryOperator::In => match rv.as_list() {
            Some(items) => Outcome::from_bool(items.iter().any(|item| item == left)),
            None => Outcome::Indeterminate,
        },
        BinaryOperator::NotIn => match rv.as_list() {
            Some(items) => Outcome::from_bool(!items.iter().any(|item| item == left)),
            None => Outcome::Indeterminate,
        },
        BinaryOperator::Matches => unreachable!("handled above"),
    }
}

fn compare(left: &Value, right: &Value, accept: impl Fn(Ordering) -> bool) -> Outcome {
    match left.partial_compare(right) {
        Some(ordering) => Outcome::from_bool(accept(ordering)),
        None => Outcome::Indeterminate,
    }
}

fn evaluate_function(name: FunctionName, pivot: &Value, args: &[Value]) -> Outcome {
    match name {
        FunctionName::StartsWith => match (pivot.as_str(), args.get(0).and_then(Value::as_str)) {
            (Some(s), Some(prefix)) => Outcome::from_bool(s.starts_with(prefix)),
            _ => Outcome::Indeterminate,
        },
        FunctionName::EndsWith => match (pivot.as_str(), args.get(0).and_then(Value::as_str)) {
            (Some(s), Some(suffix)) => Outcome::from_bool(s.ends_with(suffix)),
            _ => Outcome::Indeterminate,
        },
        FunctionName::Contains => match args.get(0) {
            Some(needle) => match (pivot.as_str(), pivot.as_list()) {
                (Some(s), _) => match needle.as_str() {
                    Some(n) => Outcome::from_bool(s.contains(n)),
                    None => Outcome::Indeterminate,
                },
                (None, Some(items)) => Outcome::from_bool(items.iter().any(|i| i == needle)),
                _ => Outcome::Indeterminate,
            },
            None => Outcome::Indeterminate,
        },
        FunctionName::IsBetween => match (args.get(0), args.get(1)) {
            (Some(lo), Some(hi)) => {
                let above_lo = pivot.partial_compare(lo).map(|o| o != Ordering::Less);
                let below_hi = pivot.partial_compare(hi).map(|o| o != Ordering::Greater);
                match (above_lo, below_hi) {
                    (Some(a), Some(b)) => Outcome::from_bool(a && b),
                    _ => Outcome::Indeterminate,
                }
            }
            _ => Outcome::Indeterminate,
        },
        FunctionName::HasAny => match (pivot.as_list(), args.get(0)) {
            (Some(items), Some(candidate)) => match candidate.as_list() {
                Some(candidates) => {
                    Outcome::from_bool(items.iter().any(|i| candidates.iter().any(|c| c == i)))
                }
                None => Outcome::from_bool(items.iter().any(|i| i == candidate)),
            },
            _ => Outcome::Indeterminate,
        },
        FunctionName::HasAll => match (pivot.as_list(), args.get(0)) {
            (Some(items), Some(candidate)) => match candidate.as_list() {
                Some(candidates) => {
                    Outcome::from_bool(candidates.iter().all(|c| items.iter().any(|i| i == c)))
                }
                None => Outcome::from_bool(items.iter().any(|i| i == candidate)),
            },
            _ => Outcome::Indeterminate,
        },
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expression::Unary { operator, operand } => write!(f, "{:?}({})", operator, operand),
            Expression::Binary {
                operator,
                left,
                right,
                ..
            } => write!(f, "{} {:?} {}", left, operator, right),
            Expression::Function { name, pivot, args } => {
                write!(f, "{:?}({}, {:?})", name, pivot, args)
            }
        }
    }
}

impl Attribute {
    /// Convenience used throughout evaluation: is this operand a literal
    /// with exactly the given entity (used by the builder to disambiguate
    /// shapes; see `crate::builder`).
    pub fn is_entity(&self, entity: Entity) -> bool {
        self.entity == entity
    }
}
