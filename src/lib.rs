//! An attribute-based access control (ABAC) policy evaluation engine.
//!
//! Given an action a caller wants to perform and a [`PolicyContext`]
//! describing who's asking and about what, [`Engine::decide`] answers
//! whether it's permitted: load policies from a [`PolicyStore`], cache and
//! index them, narrow to the applicable subset for the request (the PRP),
//! evaluate each candidate's rule against the context via the
//! [`AttributeAccessor`], and combine the outcomes with deny-overrides /
//! default-deny (the PDP).
//!
//! The crate does not authenticate callers, validate the caller's domain
//! payload, or transport the resulting `Decision` anywhere — it answers one
//! question and returns.

pub mod accessor;
pub mod attribute;
pub mod builder;
pub mod cache;
pub mod cancel;
pub mod categorizer;
pub mod config;
pub mod context;
pub mod error;
pub mod expr;
pub mod pdp;
pub mod policy;
pub mod prp;
pub mod rule;
pub mod store;

pub use accessor::{AttributeAccessor, AttributeNotResolvable};
pub use attribute::{Attribute, Entity, Value};
pub use builder::ExpressionBuilder;
pub use cache::{PolicyCache, RefreshDiagnostic};
pub use cancel::{AtomicCancellation, Cancellation, DeadlineCancellation, NeverCanceled};
pub use categorizer::Categorizer;
pub use config::{EngineBuilder, EngineConfig};
pub use context::{Decision, DecisionCode, EnvValue, MapPip, Pip, PolicyContext, Resolved};
pub use error::AbacError;
pub use expr::{BinaryOperator, Expression, FunctionName, Outcome, UnaryOperator};
pub use pdp::PolicyEvaluator;
pub use policy::{Effect, Policy};
pub use prp::PolicyRetrieval;
pub use rule::{Condition, Rule};
pub use store::{MemoryStore, PolicyStore};

use log::trace;
use std::sync::Arc;

/// Result alias used throughout the crate for the handful of failure modes
/// that escape as thrown errors rather than a coded `Decision` (spec.md
/// §7): `MalformedPolicy` at load time, `Canceled`, and backend I/O/parse
/// errors.
pub type Result<T> = std::result::Result<T, AbacError>;

/// Initializes the `log` facade with a `simplelog` terminal backend. Mirrors
/// the teacher crate's `arboric::initialize_logging` entry point: tests call
/// it so `trace!`/`debug!` output is visible when run with `--nocapture`,
/// and any embedder wiring this crate into a binary can call it once at
/// startup instead of bringing its own `simplelog` dependency.
pub fn initialize_logging() {
    use simplelog::{Config, LevelFilter, TermLogger, TerminalMode};
    let _ = TermLogger::init(LevelFilter::Debug, Config::default(), TerminalMode::Mixed);
}

/// The engine: a value holding its dependencies (store, categorizer, cache)
/// with a single `decide()` entry point (spec.md §2's control flow, §9's
/// "replace global factory / singleton access with explicit construction").
/// Stateless with respect to any one request; safe to share behind an `Arc`
/// across threads (spec.md §5: "shared-nothing request-per-thread pattern").
#[derive(Debug)]
pub struct Engine {
    evaluator: PolicyEvaluator,
    config: EngineConfig,
}

impl Engine {
    /// Builds an engine from an explicit `PolicyStore` and `Categorizer`.
    /// Performs the cache's first load eagerly, so a freshly constructed
    /// `Engine` is immediately ready to decide.
    pub fn new(
        store: Arc<dyn PolicyStore>,
        categorizer: Arc<dyn Categorizer>,
        config: EngineConfig,
    ) -> Result<Engine> {
        let cache = Arc::new(PolicyCache::new(store, config.cache_ttl)?);
        let prp = PolicyRetrieval::new(cache, categorizer);
        Ok(Engine {
            evaluator: PolicyEvaluator::new(prp),
            config,
        })
    }

    /// Starts building an `Engine` through the fluent `EngineBuilder`.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Evaluates `(action, context)` with no cancellation signal beyond
    /// what the caller provides. Use `decide_with_deadline` to apply the
    /// advisory per-decision deadline of spec.md §6.
    pub fn decide(&self, action: &str, context: &PolicyContext) -> Result<Decision> {
        trace!("Engine::decide({:?})", action);
        self.evaluator.decide(action, context, &NeverCanceled)
    }

    /// Evaluates `(action, context)` under this engine's configured default
    /// deadline (`ABAC_DEFAULT_DEADLINE_MS`), returning `AbacError::Canceled`
    /// if the deadline expires before a decision is reached.
    pub fn decide_with_deadline(&self, action: &str, context: &PolicyContext) -> Result<Decision> {
        let cancellation = DeadlineCancellation::from_now(self.config.default_deadline);
        self.evaluator.decide(action, context, &cancellation)
    }

    /// Evaluates `(action, context)` under a caller-supplied cancellation
    /// signal (spec.md §5), for callers wiring their own deadline or
    /// request-lifecycle cancellation.
    pub fn decide_with_cancellation(
        &self,
        action: &str,
        context: &PolicyContext,
        cancellation: &dyn Cancellation,
    ) -> Result<Decision> {
        self.evaluator.decide(action, context, cancellation)
    }
}
