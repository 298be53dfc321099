//! Execution profiling collaborator.
//!
//! Drivers bracket every native execution in a profiling span when a
//! [`Profiler`] is configured: `start` before the call, `stop` on success,
//! `discard` on failure. A failed query is never recorded as a completed
//! measurement.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Opaque handle for one open profiling span.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProfileToken(u64);

/// Profiler collaborator interface.
pub trait Profiler: Send + Sync {
    /// Open a span. `category` groups measurements (one per driver
    /// instance); `label` is the statement text.
    fn start(&self, category: &str, label: &str) -> ProfileToken;

    /// Close a span, recording it as a completed measurement.
    fn stop(&self, token: ProfileToken);

    /// Drop a span without recording it.
    fn discard(&self, token: ProfileToken);
}

#[derive(Debug)]
struct OpenSpan {
    category: String,
    label: String,
    started: Instant,
}

/// Aggregate statistics for one category.
#[derive(Debug, Clone, Default)]
pub struct ProfileStats {
    /// Completed spans.
    pub completed: u64,
    /// Spans dropped via `discard` (failed executions).
    pub discarded: u64,
    /// Total time across completed spans.
    pub total: Duration,
    /// Longest completed span.
    pub max: Duration,
    /// Label of the longest completed span.
    pub slowest: Option<String>,
}

/// A profiler that aggregates counts and durations per category.
#[derive(Debug, Default)]
pub struct StatsProfiler {
    next_token: AtomicU64,
    open: Mutex<HashMap<u64, OpenSpan>>,
    stats: Mutex<HashMap<String, ProfileStats>>,
}

impl StatsProfiler {
    /// Create an empty stats profiler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the statistics for one category.
    pub fn stats(&self, category: &str) -> ProfileStats {
        self.stats
            .lock()
            .unwrap()
            .get(category)
            .cloned()
            .unwrap_or_default()
    }

    /// Snapshot the statistics summed over every category.
    pub fn totals(&self) -> ProfileStats {
        let stats = self.stats.lock().unwrap();
        let mut out = ProfileStats::default();
        for entry in stats.values() {
            out.completed += entry.completed;
            out.discarded += entry.discarded;
            out.total += entry.total;
            if entry.max > out.max {
                out.max = entry.max;
                out.slowest = entry.slowest.clone();
            }
        }
        out
    }
}

impl Profiler for StatsProfiler {
    fn start(&self, category: &str, label: &str) -> ProfileToken {
        let id = self.next_token.fetch_add(1, Ordering::Relaxed);
        self.open.lock().unwrap().insert(
            id,
            OpenSpan {
                category: category.to_string(),
                label: label.to_string(),
                started: Instant::now(),
            },
        );
        ProfileToken(id)
    }

    fn stop(&self, token: ProfileToken) {
        let Some(span) = self.open.lock().unwrap().remove(&token.0) else {
            return;
        };
        let elapsed = span.started.elapsed();
        let mut stats = self.stats.lock().unwrap();
        let entry = stats.entry(span.category).or_default();
        entry.completed += 1;
        entry.total += elapsed;
        if elapsed > entry.max {
            entry.max = elapsed;
            entry.slowest = Some(span.label);
        }
    }

    fn discard(&self, token: ProfileToken) {
        let Some(span) = self.open.lock().unwrap().remove(&token.0) else {
            return;
        };
        let mut stats = self.stats.lock().unwrap();
        stats.entry(span.category).or_default().discarded += 1;
    }
}

/// A profiler that emits spans through `tracing`.
#[derive(Debug, Default)]
pub struct TracingProfiler {
    next_token: AtomicU64,
    open: Mutex<HashMap<u64, OpenSpan>>,
}

impl TracingProfiler {
    /// Create a tracing-backed profiler.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Profiler for TracingProfiler {
    fn start(&self, category: &str, label: &str) -> ProfileToken {
        let id = self.next_token.fetch_add(1, Ordering::Relaxed);
        self.open.lock().unwrap().insert(
            id,
            OpenSpan {
                category: category.to_string(),
                label: label.to_string(),
                started: Instant::now(),
            },
        );
        ProfileToken(id)
    }

    fn stop(&self, token: ProfileToken) {
        if let Some(span) = self.open.lock().unwrap().remove(&token.0) {
            tracing::debug!(
                category = %span.category,
                sql = %span.label,
                elapsed = ?span.started.elapsed(),
                "query completed"
            );
        }
    }

    fn discard(&self, token: ProfileToken) {
        if let Some(span) = self.open.lock().unwrap().remove(&token.0) {
            tracing::trace!(
                category = %span.category,
                sql = %span.label,
                "query discarded"
            );
        }
    }
}
