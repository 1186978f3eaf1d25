//! [`PolicyCache`]: an immutable in-memory snapshot of the last-loaded
//! policy set, refreshed on a TTL, plus the secondary indexes the PRP
//! narrows against (spec.md §4.6).
//!
//! Queries are wait-free against the current snapshot (spec.md §5): a
//! refresh never blocks a reader. At most one refresh is in flight at a
//! time (single-flight); callers who don't win the race just keep using
//! the snapshot they already have.

use crate::policy::{Effect, Policy};
use crate::store::PolicyStore;
use log::{info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

/// One immutable, fully-indexed load of the backend.
struct Snapshot {
    by_name: HashMap<String, Arc<Policy>>,
    by_action: HashMap<String, HashSet<String>>,
    by_actor_category: HashMap<String, HashSet<String>>,
    by_subject_category: HashMap<String, HashSet<String>>,
    by_effect: HashMap<Effect, HashSet<String>>,
}

impl Snapshot {
    fn build(policies: Vec<Policy>) -> Snapshot {
        let mut by_action: HashMap<String, HashSet<String>> = HashMap::new();
        let mut by_actor_category: HashMap<String, HashSet<String>> = HashMap::new();
        let mut by_subject_category: HashMap<String, HashSet<String>> = HashMap::new();
        let mut by_effect: HashMap<Effect, HashSet<String>> = HashMap::new();
        for policy in &policies {
            for action in &policy.actions {
                by_action
                    .entry(action.clone())
                    .or_insert_with(HashSet::new)
                    .insert(policy.name.clone());
            }
            for actor in &policy.actors {
                by_actor_category
                    .entry(actor.clone())
                    .or_insert_with(HashSet::new)
                    .insert(policy.name.clone());
            }
            for subject in &policy.subjects {
                by_subject_category
                    .entry(subject.clone())
                    .or_insert_with(HashSet::new)
                    .insert(policy.name.clone());
            }
            by_effect
                .entry(policy.effect)
                .or_insert_with(HashSet::new)
                .insert(policy.name.clone());
        }
        let by_name = policies
            .into_iter()
            .map(|p| (p.name.clone(), Arc::new(p)))
            .collect();
        Snapshot {
            by_name,
            by_action,
            by_actor_category,
            by_subject_category,
            by_effect,
        }
    }
}

/// The outcome of the most recent refresh attempt, exposed so tests (and
/// embedders) can observe the fail-open-to-last-good behavior of spec.md
/// §4.6 without scraping log output.
#[derive(Debug, Clone)]
pub struct RefreshDiagnostic {
    pub attempted: bool,
    pub succeeded: bool,
    pub error: Option<String>,
}

impl RefreshDiagnostic {
    fn none() -> RefreshDiagnostic {
        RefreshDiagnostic {
            attempted: false,
            succeeded: false,
            error: None,
        }
    }

    fn success() -> RefreshDiagnostic {
        RefreshDiagnostic {
            attempted: true,
            succeeded: true,
            error: None,
        }
    }

    fn failure(error: String) -> RefreshDiagnostic {
        RefreshDiagnostic {
            attempted: true,
            succeeded: false,
            error: Some(error),
        }
    }
}

/// TTL-refreshed, indexed cache of a [`PolicyStore`]'s policy set.
pub struct PolicyCache {
    store: Arc<dyn PolicyStore>,
    ttl: Duration,
    snapshot: RwLock<Arc<Snapshot>>,
    last_load_at: RwLock<Instant>,
    refresh_lock: Mutex<()>,
    diagnostics: Mutex<RefreshDiagnostic>,
}

impl PolicyCache {
    /// Builds the cache and performs its first load eagerly, so the engine
    /// never serves a request against an empty snapshot by accident.
    pub fn new(store: Arc<dyn PolicyStore>, ttl: Duration) -> Result<PolicyCache, crate::error::AbacError> {
        let policies = store.load_all()?;
        info!("cache: initial load of {} polic(y/ies)", policies.len());
        Ok(PolicyCache {
            store,
            ttl,
            snapshot: RwLock::new(Arc::new(Snapshot::build(policies))),
            last_load_at: RwLock::new(Instant::now()),
            refresh_lock: Mutex::new(()),
            diagnostics: Mutex::new(RefreshDiagnostic::none()),
        })
    }

    /// Used by tests and embedders who want a cache seeded entirely
    /// in-memory, with no first load against the backend.
    #[cfg(test)]
    fn seeded(store: Arc<dyn PolicyStore>, ttl: Duration, policies: Vec<Policy>) -> PolicyCache {
        PolicyCache {
            store,
            ttl,
            snapshot: RwLock::new(Arc::new(Snapshot::build(policies))),
            last_load_at: RwLock::new(Instant::now()),
            refresh_lock: Mutex::new(()),
            diagnostics: Mutex::new(RefreshDiagnostic::none()),
        }
    }

    pub fn diagnostics(&self) -> RefreshDiagnostic {
        self.diagnostics.lock().unwrap().clone()
    }

    /// Returns the current snapshot, refreshing first if the TTL has
    /// elapsed. A refresh failure retains the previous snapshot and is
    /// recorded in `diagnostics()`; it never surfaces as an error here
    /// (spec.md §4.6, §7: "refresh errors never block a decision").
    fn current(&self) -> Arc<Snapshot> {
        if self.last_load_at.read().unwrap().elapsed() >= self.ttl {
            self.try_refresh();
        }
        self.snapshot.read().unwrap().clone()
    }

    fn try_refresh(&self) {
        let guard = match self.refresh_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => return, // another refresh is already in flight
        };
        // Re-check under the lock: another thread may have just refreshed.
        if self.last_load_at.read().unwrap().elapsed() < self.ttl {
            drop(guard);
            return;
        }
        match self.store.load_all() {
            Ok(policies) => {
                let count = policies.len();
                *self.snapshot.write().unwrap() = Arc::new(Snapshot::build(policies));
                *self.last_load_at.write().unwrap() = Instant::now();
                *self.diagnostics.lock().unwrap() = RefreshDiagnostic::success();
                info!("cache: refreshed, {} polic(y/ies) installed", count);
            }
            Err(e) => {
                warn!("cache: refresh failed, retaining last-good snapshot: {}", e);
                *self.diagnostics.lock().unwrap() = RefreshDiagnostic::failure(e.to_string());
            }
        }
        drop(guard);
    }

    pub fn names_for_action(&self, action: &str) -> HashSet<String> {
        self.current()
            .by_action
            .get(action)
            .cloned()
            .unwrap_or_default()
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<Policy>> {
        self.current().by_name.get(name).cloned()
    }

    /// Names declared against an actor category, and a subject category —
    /// exposed for completeness (and tests) of the secondary indexes
    /// spec.md §4.6 names; the PRP itself narrows through `Policy`'s own
    /// dimension predicates rather than re-deriving these sets, since an
    /// empty declared dimension must still match (see `crate::prp`).
    pub fn names_for_actor_category(&self, category: &str) -> HashSet<String> {
        self.current()
            .by_actor_category
            .get(category)
            .cloned()
            .unwrap_or_default()
    }

    pub fn names_for_subject_category(&self, category: &str) -> HashSet<String> {
        self.current()
            .by_subject_category
            .get(category)
            .cloned()
            .unwrap_or_default()
    }

    pub fn names_for_effect(&self, effect: Effect) -> HashSet<String> {
        self.current()
            .by_effect
            .get(&effect)
            .cloned()
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for PolicyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("PolicyCache")
            .field("ttl", &self.ttl)
            .finish()
    }
}
