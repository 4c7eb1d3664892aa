// SPDX-License-Identifier: MIT OR Apache-2.0

//! History of events accumulated by a run, keyed by block group name.
//!
//! A `History` is immutable through its public surface; only the owning run
//! appends to it while matching.

use crate::event::Event;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mapping from group name to the ordered events matched under that group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    groups: BTreeMap<String, Vec<Event>>,
}

impl History {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history from pre-grouped events
    pub fn from_groups(groups: BTreeMap<String, Vec<Event>>) -> Self {
        Self { groups }
    }

    /// Append an event to a group, creating the group on first use
    pub(crate) fn push(&mut self, group: &str, event: Event) {
        self.groups.entry(group.to_string()).or_default().push(event);
    }

    /// All events across all groups, in group order then insertion order
    pub fn all(&self) -> Vec<&Event> {
        self.groups.values().flatten().collect()
    }

    /// Events recorded under `name`; empty when the group is absent
    pub fn group(&self, name: &str) -> &[Event] {
        self.groups.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Group names present in this history
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Earliest event by timestamp
    pub fn first(&self) -> Option<&Event> {
        self.groups
            .values()
            .flatten()
            .min_by_key(|e| e.timestamp())
    }

    /// Latest event by timestamp
    pub fn last(&self) -> Option<&Event> {
        self.groups
            .values()
            .flatten()
            .max_by_key(|e| e.timestamp())
    }

    /// Total number of recorded events
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// True when no event has been recorded
    pub fn is_empty(&self) -> bool {
        self.groups.values().all(Vec::is_empty)
    }
}
