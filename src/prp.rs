//! [`PolicyRetrieval`] (the PRP): narrows the cache down to the candidate
//! policy set for one `(action, PolicyContext)` request (spec.md §4.7).

use crate::cache::PolicyCache;
use crate::categorizer::Categorizer;
use crate::context::PolicyContext;
use crate::policy::Policy;
use log::trace;
use std::collections::HashSet;
use std::sync::Arc;

/// Narrows a [`PolicyCache`] snapshot to the policies applicable to one
/// request, using the `byAction` index to find the initial candidate set
/// and each `Policy`'s own dimension predicates (empty declared set = any)
/// to apply the actor/subject narrowing described in spec.md §4.7 steps
/// 2-3. Environment-dimension narrowing is left to the PDP's expression
/// evaluation, per step 4.
#[derive(Debug)]
pub struct PolicyRetrieval {
    cache: Arc<PolicyCache>,
    categorizer: Arc<dyn Categorizer>,
}

impl PolicyRetrieval {
    pub fn new(cache: Arc<PolicyCache>, categorizer: Arc<dyn Categorizer>) -> PolicyRetrieval {
        PolicyRetrieval { cache, categorizer }
    }

    /// Returns the candidate policies for `action` against `context`, in
    /// stable order by name (spec.md §4.7: "deterministic ordering by
    /// `name` to make testing reproducible").
    pub fn candidates(&self, action: &str, context: &PolicyContext) -> Vec<Arc<Policy>> {
        trace!("candidates({:?})", action);
        let names = self.cache.names_for_action(action);
        if names.is_empty() {
            return Vec::new();
        }

        let actor_category = self.categorizer.actor_category(context.actor.as_ref());
        let subject_categories: HashSet<String> = context
            .subjects
            .iter()
            .map(|s| self.categorizer.subject_category(s.as_ref()))
            .collect();

        let mut candidates: Vec<Arc<Policy>> = names
            .into_iter()
            .filter_map(|name| self.cache.lookup(&name))
            .filter(|policy| policy.matches_actor_category(&actor_category))
            .filter(|policy| {
                policy.matches_subject_categories(subject_categories.iter().map(String::as_str))
            })
            .collect();
        candidates.sort_by(|a, b| a.name.cmp(&b.name));
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PolicyCache;
    use crate::context::MapPip;
    use crate::error::AbacError;
    use crate::policy::Effect;
    use crate::rule::{Condition, Rule};
    use crate::store::PolicyStore;
    use std::time::Duration;

    #[derive(Debug)]
    struct FixedStore(Vec<String>);

    impl PolicyStore for FixedStore {
        fn load_all(&self) -> Result<Vec<Policy>, AbacError> {
            Ok(self
                .0
                .iter()
                .map(|name| match name.as_str() {
                    "edit-post" => Policy::new(
                        "edit-post",
                        "",
                        Effect::Permit,
                        Rule::new(Condition::And, vec![]),
                    )
                    .with_actions(["edit-post"])
                    .with_actors(["user"])
                    .with_subjects(["post"]),
                    "publish-anything" => Policy::new(
                        "publish-anything",
                        "",
                        Effect::Permit,
                        Rule::new(Condition::And, vec![]),
                    )
                    .with_actions(["publish"]),
                    other => panic!("unexpected fixture policy {}", other),
                })
                .collect())
        }
    }

    #[derive(Debug)]
    struct TypeFieldCategorizer;

    impl Categorizer for TypeFieldCategorizer {
        fn actor_category(&self, actor: &dyn crate::context::Pip) -> String {
            match actor.resolve("type") {
                crate::context::Resolved::Value(v) => v.to_string(),
                _ => "unknown".into(),
            }
        }
        fn subject_category(&self, subject: &dyn crate::context::Pip) -> String {
            match subject.resolve("type") {
                crate::context::Resolved::Value(v) => v.to_string(),
                _ => "unknown".into(),
            }
        }
    }

    fn prp(policies: Vec<&str>) -> PolicyRetrieval {
        let store = Arc::new(FixedStore(policies.into_iter().map(String::from).collect()));
        let cache = Arc::new(PolicyCache::new(store, Duration::from_secs(60)).unwrap());
        PolicyRetrieval::new(cache, Arc::new(TypeFieldCategorizer))
    }

    #[test]
    fn test_no_policy_declares_the_action_returns_empty() {
        let p = prp(vec!["edit-post"]);
        let ctx = PolicyContext::new(Box::new(MapPip::new().with("type", "user")));
        assert!(p.candidates("publish", &ctx).is_empty());
    }

    #[test]
    fn test_dimension_narrowing_excludes_non_matching_category() {
        let p = prp(vec!["edit-post"]);
        let ctx = PolicyContext::new(Box::new(MapPip::new().with("type", "service-account")))
            .with_subject(Box::new(MapPip::new().with("type", "post")));
        assert!(p.candidates("edit-post", &ctx).is_empty());
    }

    #[test]
    fn test_empty_declared_dimensions_match_any_category() {
        let p = prp(vec!["publish-anything"]);
        let ctx = PolicyContext::new(Box::new(MapPip::new().with("type", "anything")));
        let candidates = p.candidates("publish", &ctx);
        assert_eq!(1, candidates.len());
        assert_eq!("publish-anything", candidates[0].name);
    }

    #[test]
    fn test_candidates_are_ordered_by_name() {
        let p = prp(vec!["edit-post"]);
        let ctx = PolicyContext::new(Box::new(MapPip::new().with("type", "user")))
            .with_subject(Box::new(MapPip::new().with("type", "post")));
        let candidates = p.candidates("edit-post", &ctx);
        assert_eq!(1, candidates.len());
        assert_eq!("edit-post", candidates[0].name);
    }
}
