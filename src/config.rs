//! Engine configuration: the two environment variables spec.md §6 names,
//! plus a fluent builder for wiring a store/categorizer pair into an
//! [`crate::Engine`] (ambient, grounded on `arboric::config`'s
//! `Configuration`/`ListenerBuilder` pair).

use crate::categorizer::Categorizer;
use crate::error::AbacError;
use crate::store::PolicyStore;
use crate::Engine;
use std::env;
use std::sync::Arc;
use std::time::Duration;

const CACHE_TTL_ENV_VAR: &str = "ABAC_CACHE_TTL_SECONDS";
const DEFAULT_DEADLINE_ENV_VAR: &str = "ABAC_DEFAULT_DEADLINE_MS";

const DEFAULT_CACHE_TTL_SECONDS: u64 = 60;
const DEFAULT_DEADLINE_MS: u64 = 50;

/// The engine's tunables: cache TTL and the advisory per-decision deadline
/// (spec.md §6). Both read from the environment with the documented
/// defaults; `EngineConfig::from_env` never fails on a missing variable,
/// only on one present but not parseable as the expected integer.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub cache_ttl: Duration,
    pub default_deadline: Duration,
}

impl Default for EngineConfig {
    fn default() -> EngineConfig {
        EngineConfig {
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
            default_deadline: Duration::from_millis(DEFAULT_DEADLINE_MS),
        }
    }
}

impl EngineConfig {
    /// Reads `ABAC_CACHE_TTL_SECONDS` / `ABAC_DEFAULT_DEADLINE_MS`, falling
    /// back to the documented defaults when unset.
    pub fn from_env() -> Result<EngineConfig, AbacError> {
        let cache_ttl = match env_var(CACHE_TTL_ENV_VAR)? {
            Some(raw) => Duration::from_secs(parse_u64(CACHE_TTL_ENV_VAR, &raw)?),
            None => Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
        };
        let default_deadline = match env_var(DEFAULT_DEADLINE_ENV_VAR)? {
            Some(raw) => Duration::from_millis(parse_u64(DEFAULT_DEADLINE_ENV_VAR, &raw)?),
            None => Duration::from_millis(DEFAULT_DEADLINE_MS),
        };
        Ok(EngineConfig {
            cache_ttl,
            default_deadline,
        })
    }

    pub fn cache_ttl_seconds(mut self, seconds: u64) -> EngineConfig {
        self.cache_ttl = Duration::from_secs(seconds);
        self
    }

    pub fn default_deadline_ms(mut self, millis: u64) -> EngineConfig {
        self.default_deadline = Duration::from_millis(millis);
        self
    }
}

fn env_var(key: &str) -> Result<Option<String>, AbacError> {
    match env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(AbacError::from(e)),
    }
}

fn parse_u64(key: &str, raw: &str) -> Result<u64, AbacError> {
    raw.parse::<u64>()
        .map_err(|_| AbacError::general(format!("{} must be an integer, got {:?}", key, raw)))
}

/// Fluent, consuming-self builder that wires a [`PolicyStore`] and a
/// [`Categorizer`] into an [`Engine`] (spec.md §9: "replace global factory
/// with explicit construction" — there is no process-wide singleton here,
/// every dependency is passed in explicitly).
pub struct EngineBuilder {
    store: Option<Arc<dyn PolicyStore>>,
    categorizer: Option<Arc<dyn Categorizer>>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn new() -> EngineBuilder {
        EngineBuilder {
            store: None,
            categorizer: None,
            config: EngineConfig::default(),
        }
    }

    pub fn store(mut self, store: Arc<dyn PolicyStore>) -> EngineBuilder {
        self.store = Some(store);
        self
    }

    pub fn categorizer(mut self, categorizer: Arc<dyn Categorizer>) -> EngineBuilder {
        self.categorizer = Some(categorizer);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> EngineBuilder {
        self.config = config;
        self
    }

    pub fn cache_ttl_seconds(mut self, seconds: u64) -> EngineBuilder {
        self.config = self.config.cache_ttl_seconds(seconds);
        self
    }

    pub fn build(self) -> Result<Engine, AbacError> {
        let store = self
            .store
            .ok_or_else(|| AbacError::general("EngineBuilder requires a PolicyStore"))?;
        let categorizer = self
            .categorizer
            .ok_or_else(|| AbacError::general("EngineBuilder requires a Categorizer"))?;
        Engine::new(store, categorizer, self.config)
    }
}

impl Default for EngineBuilder {
    fn default() -> EngineBuilder {
        EngineBuilder::new()
    }
}
