//! [`PolicyEvaluator`] (the PDP): applies the deny-overrides,
//! indeterminate-as-deny combining algorithm over the PRP's candidate set
//! and returns a single [`Decision`] (spec.md §4.8).

use crate::accessor::AttributeAccessor;
use crate::cancel::Cancellation;
use crate::context::{Decision, PolicyContext};
use crate::error::AbacError;
use crate::expr::Outcome;
use crate::policy::Effect;
use crate::prp::PolicyRetrieval;
use log::{debug, trace};

/// Combines candidate policies' rule outcomes into one decision.
///
/// **State machine per candidate.** Each candidate moves
/// `Pending -> Evaluating -> Resolved{permit|deny|not-applicable|indeterminate}`
/// exactly once; `evaluate_candidate` below is that transition.
#[derive(Debug)]
pub struct PolicyEvaluator {
    prp: PolicyRetrieval,
    accessor: AttributeAccessor,
}

/// The resolved state of one candidate policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CandidateOutcome {
    Permit,
    Deny,
    NotApplicable,
    Indeterminate,
}

impl PolicyEvaluator {
    pub fn new(prp: PolicyRetrieval) -> PolicyEvaluator {
        PolicyEvaluator {
            prp,
            accessor: AttributeAccessor::new(),
        }
    }

    /// Evaluates `(action, context)` against the current candidate set and
    /// returns a `Decision`. Implements spec.md §4.8's algorithm:
    ///
    /// 1. No candidates -> default-deny, `NO_APPLICABLE_POLICY`.
    /// 2. Any `deny` -> final `deny`, first such policy's message wins;
    ///    evaluation of the remaining candidates stops there.
    /// 3. Else any `indeterminate` -> final `deny`, `INDETERMINATE`.
    /// 4. Else any `permit` -> final `permit`.
    /// 5. Else -> `deny`, `NO_APPLICABLE_POLICY`.
    pub fn decide(
        &self,
        action: &str,
        context: &PolicyContext,
        cancellation: &dyn Cancellation,
    ) -> Result<Decision, AbacError> {
        trace!("decide({:?})", action);
        let candidates = self.prp.candidates(action, context);
        if candidates.is_empty() {
            debug!("no applicable policy for action {:?}", action);
            return Ok(Decision::no_applicable_policy());
        }

        let mut saw_indeterminate = false;
        let mut saw_permit = false;
        for policy in &candidates {
            if cancellation.is_canceled() {
                return Err(AbacError::Canceled);
            }
            match self.evaluate_candidate(policy, context, cancellation)? {
                CandidateOutcome::Deny => {
                    debug!("policy {:?} denies; short-circuiting", policy.name);
                    return Ok(Decision::deny(format!(
                        "denied by policy '{}': {}",
                        policy.name, policy.description
                    )));
                }
                CandidateOutcome::Indeterminate => saw_indeterminate = true,
                CandidateOutcome::Permit => saw_permit = true,
                CandidateOutcome::NotApplicable => {}
            }
        }

        if saw_indeterminate {
            return Ok(Decision::indeterminate());
        }
        if saw_permit {
            return Ok(Decision::permit());
        }
        Ok(Decision::no_applicable_policy())
    }

    fn evaluate_candidate(
        &self,
        policy: &crate::policy::Policy,
        context: &PolicyContext,
        cancellation: &dyn Cancellation,
    ) -> Result<CandidateOutcome, AbacError> {
        let outcome = policy.rule.evaluate(context, &self.accessor, cancellation)?;
        Ok(match (policy.effect, outcome) {
            (_, Outcome::Indeterminate) => CandidateOutcome::Indeterminate,
            (Effect::Permit, Outcome::True) => CandidateOutcome::Permit,
            (Effect::Deny, Outcome::True) => CandidateOutcome::Deny,
            (_, Outcome::False) => CandidateOutcome::NotApplicable,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Attribute;
    use crate::cache::PolicyCache;
    use crate::cancel::NeverCanceled;
    use crate::categorizer::Categorizer;
    use crate::context::{MapPip, Pip, Resolved};
    use crate::expr::{BinaryOperator, Expression};
    use crate::policy::Policy;
    use crate::rule::{Condition, Rule};
    use crate::store::{MemoryStore, PolicyStore};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug)]
    struct TypeFieldCategorizer;

    impl Categorizer for TypeFieldCategorizer {
        fn actor_category(&self, actor: &dyn Pip) -> String {
            match actor.resolve("type") {
                Resolved::Value(v) => v.to_string(),
                _ => "unknown".into(),
            }
        }
        fn subject_category(&self, subject: &dyn Pip) -> String {
            match subject.resolve("type") {
                Resolved::Value(v) => v.to_string(),
                _ => "unknown".into(),
            }
        }
    }

    fn evaluator(policies: Vec<Policy>) -> PolicyEvaluator {
        let store: Arc<dyn PolicyStore> = Arc::new(MemoryStore::new(policies));
        let cache = Arc::new(PolicyCache::new(store, Duration::from_secs(60)).unwrap());
        let prp = PolicyRetrieval::new(cache, Arc::new(TypeFieldCategorizer));
        PolicyEvaluator::new(prp)
    }

    fn ownership_policy() -> Policy {
        Policy::new(
            "edit-post",
            "owners may edit their posts",
            Effect::Permit,
            Rule::new(
                Condition::And,
                vec![Expression::Binary {
                    operator: BinaryOperator::Eq,
                    left: Attribute::actor("id"),
                    right: Attribute::subject("authorId"),
                    compiled_regex: None,
                }],
            ),
        )
        .with_actions(["edit-post"])
        .with_actors(["user"])
        .with_subjects(["post"])
    }

    fn deny_if_locked_policy() -> Policy {
        Policy::new(
            "deny-if-locked",
            "locked posts cannot be edited",
            Effect::Deny,
            Rule::new(
                Condition::And,
                vec![Expression::Binary {
                    operator: BinaryOperator::Eq,
                    left: Attribute::subject("locked"),
                    right: Attribute::literal(true),
                    compiled_regex: None,
                }],
            ),
        )
        .with_actions(["edit-post"])
        .with_actors(["user"])
        .with_subjects(["post"])
    }

    fn context(author_id: i64, status: &str, locked: bool) -> PolicyContext {
        let actor = MapPip::new().with("id", 7i64).with("type", "user");
        let subject = MapPip::new()
            .with("authorId", author_id)
            .with("status", status)
            .with("locked", locked)
            .with("type", "post");
        PolicyContext::new(Box::new(actor)).with_subject(Box::new(subject))
    }

    #[test]
    fn test_ownership_permit_scenario() {
        let evaluator = evaluator(vec![ownership_policy()]);
        let decision = evaluator
            .decide("edit-post", &context(7, "draft", false), &NeverCanceled)
            .unwrap();
        assert!(decision.allowed);
        assert_eq!(crate::context::DecisionCode::Permit, decision.code);
    }

    #[test]
    fn test_deny_overrides_a_permit() {
        let evaluator = evaluator(vec![ownership_policy(), deny_if_locked_policy()]);
        let decision = evaluator
            .decide("edit-post", &context(7, "draft", true), &NeverCanceled)
            .unwrap();
        assert!(!decision.allowed);
        assert_eq!(crate::context::DecisionCode::Deny, decision.code);
        assert!(decision.message.unwrap().contains("deny-if-locked"));
    }

    #[test]
    fn test_default_deny_when_no_policy_applies() {
        let evaluator = evaluator(vec![ownership_policy()]);
        let decision = evaluator
            .decide("publish", &context(7, "draft", false), &NeverCanceled)
            .unwrap();
        assert!(!decision.allowed);
        assert_eq!(
            crate::context::DecisionCode::NoApplicablePolicy,
            decision.code
        );
    }

    #[test]
    fn test_indeterminate_attribute_access_denies() {
        let policy = Policy::new(
            "needs-status",
            "",
            Effect::Permit,
            Rule::new(
                Condition::And,
                vec![Expression::Binary {
                    operator: BinaryOperator::Eq,
                    left: Attribute::subject("status"),
                    right: Attribute::literal("draft"),
                    compiled_regex: None,
                }],
            ),
        )
        .with_actions(["edit-post"])
        .with_actors(["user"])
        .with_subjects(["post"]);
        let evaluator = evaluator(vec![policy]);

        let actor = MapPip::new().with("id", 7i64).with("type", "user");
        let subject = MapPip::new().with("type", "post"); // no "status" attribute
        let ctx = PolicyContext::new(Box::new(actor)).with_subject(Box::new(subject));

        let decision = evaluator.decide("edit-post", &ctx, &NeverCanceled).unwrap();
        assert!(!decision.allowed);
        assert_eq!(
            crate::context::DecisionCode::Indeterminate,
            decision.code
        );
    }

    #[test]
    fn test_environment_function_permit_then_deny_outside_window() {
        let policy = Policy::new(
            "business-hours-only",
            "",
            Effect::Permit,
            Rule::new(
                Condition::And,
                vec![Expression::Function {
                    name: crate::expr::FunctionName::IsBetween,
                    pivot: Attribute::environment("hour"),
                    args: vec![Attribute::literal(9i64), Attribute::literal(17i64)],
                }],
            ),
        )
        .with_actions(["publish"]);
        let evaluator = evaluator(vec![policy]);

        let ctx_in_hours =
            PolicyContext::new(Box::new(MapPip::new().with("type", "user")))
                .with_environment("hour", crate::attribute::Value::Int(10));
        let decision = evaluator
            .decide("publish", &ctx_in_hours, &NeverCanceled)
            .unwrap();
        assert!(decision.allowed);

        let ctx_out_of_hours =
            PolicyContext::new(Box::new(MapPip::new().with("type", "user")))
                .with_environment("hour", crate::attribute::Value::Int(22));
        let decision = evaluator
            .decide("publish", &ctx_out_of_hours, &NeverCanceled)
            .unwrap();
        assert!(!decision.allowed);
        assert_eq!(
            crate::context::DecisionCode::NoApplicablePolicy,
            decision.code
        );
    }
}
