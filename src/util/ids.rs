// SPDX-License-Identifier: MIT OR Apache-2.0

//! Id and timestamp generation
//!
//! Both generators are injected as dependencies so tests can substitute a
//! fake clock or a seeded counter.

use chrono::Utc;
use once_cell::sync::Lazy;
use std::sync::Mutex;

/// Generates event and run identifiers, unique within a process lifetime
pub trait EventIdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Generates epoch-millisecond timestamps
pub trait TimestampGenerator: Send + Sync {
    fn generate(&self) -> i64;
}

/// Monotonic id generator: `[urn_]<seconds>_<counter>`
///
/// The counter resets each wall-clock second. If the wall clock regresses
/// within a second the generator keeps the stale second and continues
/// incrementing, preserving non-repetition.
pub struct UniqueIdGenerator {
    urn: Option<String>,
    state: Mutex<(i64, u64)>,
}

impl UniqueIdGenerator {
    pub fn new() -> Self {
        Self {
            urn: None,
            state: Mutex::new((0, 0)),
        }
    }

    /// Prefix every id with a peer URN, keeping ids distinct across a cluster
    pub fn with_urn(urn: impl Into<String>) -> Self {
        Self {
            urn: Some(urn.into()),
            state: Mutex::new((0, 0)),
        }
    }
}

impl Default for UniqueIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl EventIdGenerator for UniqueIdGenerator {
    fn generate(&self) -> String {
        let now = Utc::now().timestamp();
        let mut state = self.state.lock().expect("id generator mutex poisoned");
        if now > state.0 {
            *state = (now, 0);
        } else {
            state.1 += 1;
        }
        match &self.urn {
            Some(urn) => format!("{}_{}_{}", urn, state.0, state.1),
            None => format!("{}_{}", state.0, state.1),
        }
    }
}

/// Wall-clock milliseconds since the Unix epoch
#[derive(Debug, Clone, Copy, Default)]
pub struct EpochTimestampGenerator;

impl TimestampGenerator for EpochTimestampGenerator {
    fn generate(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

static PROCESS_ID_GEN: Lazy<UniqueIdGenerator> = Lazy::new(UniqueIdGenerator::new);

/// Generate an id from the process-wide default generator
pub fn unique_event_id() -> String {
    PROCESS_ID_GEN.generate()
}
