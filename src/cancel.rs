//! Cooperative cancellation for a decision call (spec.md §5).
//!
//! A decision accepts a cancellation signal; on cancellation, partial work
//! is discarded and the call returns `AbacError::Canceled`. Cancellation is
//! checked between expression evaluations and at cache-refresh boundaries —
//! never mid-expression, since no expression evaluator performs I/O and
//! each one is expected to return quickly.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// The signal a caller passes into a decision call.
pub trait Cancellation: fmt::Debug {
    fn is_canceled(&self) -> bool;
}

/// The default: a decision call that can never be canceled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverCanceled;

impl Cancellation for NeverCanceled {
    fn is_canceled(&self) -> bool {
        false
    }
}

/// A simple `AtomicBool`-backed cancellation flag a caller can share across
/// threads (e.g. alongside a deadline timer) and flip from outside the
/// decision call.
#[derive(Debug, Default)]
pub struct AtomicCancellation(AtomicBool);

impl AtomicCancellation {
    pub fn new() -> AtomicCancellation {
        AtomicCancellation(AtomicBool::new(false))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl Cancellation for AtomicCancellation {
    fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A deadline-backed cancellation: canceled once `std::time::Instant::now()`
/// passes the deadline. Built from `ABAC_DEFAULT_DEADLINE_MS` (spec.md §6)
/// via `crate::config::EngineConfig::default_deadline`, for callers who want
/// the advisory per-decision deadline enforced without wiring their own
/// timer.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineCancellation {
    deadline: std::time::Instant,
}

impl DeadlineCancellation {
    pub fn from_now(timeout: std::time::Duration) -> DeadlineCancellation {
        DeadlineCancellation {
            deadline: std::time::Instant::now() + timeout,
        }
    }
}

impl Cancellation for DeadlineCancellation {
    fn is_canceled(&self) -> bool {
        std::time::Instant::now() >= self.deadline
    }
}
