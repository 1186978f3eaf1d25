//! A `PolicyStore` that reads the canonical JSON (or YAML, an equivalent
//! surface) policy document described in spec.md §6:
//!
//! ```json
//! { "policies": [ { "name": "...", "effect": "permit", ... } ] }
//! ```

use super::PolicyStore;
use crate::builder::ExpressionBuilder;
use crate::error::AbacError;
use crate::policy::{Effect, Policy};
use crate::rule::{Condition, Rule};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The on-disk document: `{ "policies": [ ... ] }`.
#[derive(Debug, Serialize, Deserialize)]
struct PolicyDocument {
    policies: Vec<PolicyRecord>,
}

/// One policy's declarative wire shape, matching spec.md §6 field for
/// field. `rule` expressions are kept as raw JSON and handed to the
/// `ExpressionBuilder` rather than given their own typed shape, since their
/// shape varies by kind (spec.md §4.3).
#[derive(Debug, Serialize, Deserialize)]
struct PolicyRecord {
    name: String,
    #[serde(default)]
    description: String,
    effect: Effect,
    #[serde(default)]
    actions: Vec<String>,
    #[serde(default)]
    actors: Vec<String>,
    #[serde(default)]
    subjects: Vec<String>,
    rules: RuleRecord,
}

#[derive(Debug, Serialize, Deserialize)]
struct RuleRecord {
    condition: String,
    expressions: Vec<serde_json::Value>,
}

/// Reads policies from a JSON or YAML file, selected by extension
/// (`.json` vs `.yml`/`.yaml`). This is glue over the declarative document
/// format, not a production backend choice — spec.md §1 keeps the latter
/// out of scope.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> FileStore {
        FileStore { path: path.into() }
    }

    fn read_document(&self) -> Result<PolicyDocument, AbacError> {
        let contents = std::fs::read_to_string(&self.path)?;
        match self.path.extension().and_then(|e| e.to_str()) {
            Some("yml") | Some("yaml") => Ok(serde_yaml::from_str(&contents)?),
            _ => Ok(serde_json::from_str(&contents)?),
        }
    }
}

impl PolicyStore for FileStore {
    fn load_all(&self) -> Result<Vec<Policy>, AbacError> {
        trace!("load_all() from {:?}", self.path);
        let document = self.read_document()?;
        let builder = ExpressionBuilder::new();
        let mut policies = Vec::with_capacity(document.policies.len());
        for record in document.policies {
            policies.push(compile_policy(&builder, record)?);
        }
        debug!("loaded {} polic(y/ies) from {:?}", policies.len(), self.path);
        Ok(policies)
    }
}

fn compile_policy(builder: &ExpressionBuilder, record: PolicyRecord) -> Result<Policy, AbacError> {
    if record.name.is_empty() {
        return Err(AbacError::malformed_policy("", 0, "policy name must not be empty"));
    }
    let condition = Condition::parse(&record.rules.condition).ok_or_else(|| {
        AbacError::malformed_policy(
            record.name.as_str(),
            0,
            format!("unknown rule condition: {}", record.rules.condition),
        )
    })?;
    if condition == Condition::Not && record.rules.expressions.len() != 1 {
        return Err(AbacError::malformed_policy(
            record.name.as_str(),
            0,
            "NOT requires exactly one expression",
        ));
    }
    if record.rules.expressions.is_empty() {
        return Err(AbacError::malformed_policy(
            record.name.as_str(),
            0,
            "AND/OR require at least one expression",
        ));
    }

    let mut expressions = Vec::with_capacity(record.rules.expressions.len());
    for (index, raw) in record.rules.expressions.iter().enumerate() {
        expressions.push(builder.build(raw, &record.name, index)?);
    }

    Ok(Policy::new(
        record.name,
        record.description,
        record.effect,
        Rule::new(condition, expressions),
    )
    .with_actions(record.actions)
    .with_actors(record.actors)
    .with_subjects(record.subjects))
}

/// Reads a single canonical policy document from a path, for callers that
/// want the parse without a long-lived `FileStore` (e.g. a thin CLI
/// wrapper's one-shot `validate` subcommand).
pub fn read_policies<P: AsRef<Path>>(path: P) -> Result<Vec<Policy>, AbacError> {
    FileStore::new(path.as_ref().to_path_buf()).load_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str, suffix: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!(
            "abac-engine-test-{}-{}.{}",
            std::process::id(),
            rand_suffix(),
            suffix
        ));
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn rand_suffix() -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .subsec_nanos() as u64
    }

    const CANONICAL_JSON: &str = r#"
    {
      "policies": [
        {
          "name": "edit-post",
          "description": "owners may edit their posts",
          "effect": "permit",
          "actions": ["edit-post"],
          "actors": ["user"],
          "subjects": ["post"],
          "rules": {
            "condition": "AND",
            "expressions": [
              { "operator": "eq", "actor_attribute": "id", "subject_attribute": "authorId" },
              { "operator": "in", "subject_attribute": "status", "value": ["draft", "review"] }
            ]
          }
        }
      ]
    }
    "#;

    #[test]
    fn test_load_canonical_json_document() {
        let path = write_temp(CANONICAL_JSON, "json");
        let store = FileStore::new(path.clone());
        let policies = store.load_all().unwrap();
        assert_eq!(1, policies.len());
        assert_eq!("edit-post", policies[0].name);
        assert_eq!(Effect::Permit, policies[0].effect);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_equivalent_yaml_document() {
        let yaml = r#"
policies:
  - name: edit-post
    description: owners may edit their posts
    effect: permit
    actions: [edit-post]
    actors: [user]
    subjects: [post]
    rules:
      condition: AND
      expressions:
        - operator: eq
          actor_attribute: id
          subject_attribute: authorId
"#;
        let path = write_temp(yaml, "yml");
        let store = FileStore::new(path.clone());
        let policies = store.load_all().unwrap();
        assert_eq!(1, policies.len());
        assert_eq!("edit-post", policies[0].name);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_malformed_expression_fails_the_whole_load() {
        let bad = r#"
        { "policies": [ { "name": "bad", "effect": "permit",
          "rules": { "condition": "AND", "expressions": [ { "nonsense": true } ] } } ] }
        "#;
        let path = write_temp(bad, "json");
        let store = FileStore::new(path.clone());
        assert!(store.load_all().is_err());
        std::fs::remove_file(path).ok();
    }
}
