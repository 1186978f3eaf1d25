//! The [`Categorizer`]: a caller-supplied boundary interface that decouples
//! policy text from implementation-defined type names (spec.md §6, §9's
//! "replace global factory with explicit construction").

use crate::context::Pip;

/// Maps a request's actor/subject PIPs to the free-form category strings
/// policies are authored against.
pub trait Categorizer: std::fmt::Debug {
    fn actor_category(&self, actor: &dyn Pip) -> String;
    fn subject_category(&self, subject: &dyn Pip) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{MapPip, Resolved};

    #[derive(Debug)]
    struct TypeFieldCategorizer;

    impl Categorizer for TypeFieldCategorizer {
        fn actor_category(&self, actor: &dyn Pip) -> String {
            match actor.resolve("type") {
                Resolved::Value(v) => v.to_string(),
                _ => "unknown".to_string(),
            }
        }

        fn subject_category(&self, subject: &dyn Pip) -> String {
            match subject.resolve("type") {
                Resolved::Value(v) => v.to_string(),
                _ => "unknown".to_string(),
            }
        }
    }

    #[test]
    fn test_categorizer_reads_a_declared_type_field() {
        let categorizer = TypeFieldCategorizer;
        let actor = MapPip::new().with("type", "user");
        assert_eq!("user", categorizer.actor_category(&actor));
    }
}
