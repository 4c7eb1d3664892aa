// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pattern: a named, ordered block sequence with construction-time checks
//!
//! Patterns are built through the fluent [`PatternBuilder`]:
//!
//! ```rust,ignore
//! let pattern = Pattern::builder("temperature_spike")
//!     .followed_by("baseline", |e, _| below_threshold(e))
//!     .loop_while("rising", |e, h| hotter_than_last(e, h))
//!     .next("peak", |e, _| above_threshold(e))
//!     .build()?;
//! ```

use crate::error::{CepFlowError, CepFlowResult};
use crate::event::{Event, History};
use crate::pattern::{Block, Predicate};
use std::collections::HashMap;
use std::sync::Arc;

/// Named ordered sequence of blocks
#[derive(Debug, Clone)]
pub struct Pattern {
    name: String,
    blocks: Vec<Block>,
}

impl Pattern {
    /// Create a pattern from pre-built blocks
    ///
    /// Invariants enforced here:
    /// - name and block list are non-empty
    /// - the first block is a plain or strict block (spawning is keyed on a
    ///   concrete seed event, so negated/optional/looping heads are rejected)
    /// - a group name repeats only when every block using it is a loop block
    pub fn new(name: impl Into<String>, blocks: Vec<Block>) -> CepFlowResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(CepFlowError::invalid_parameter_with_name(
                "must be non-empty",
                "name",
            ));
        }
        if blocks.is_empty() {
            return Err(CepFlowError::invalid_parameter(
                "a pattern requires at least one block",
            ));
        }
        let head = &blocks[0];
        if head.is_negated() || head.is_optional() || head.is_looping() {
            return Err(CepFlowError::invalid_parameter(
                "the first block of a pattern cannot be negated, optional or looping",
            ));
        }
        let mut by_group: HashMap<&str, Vec<&Block>> = HashMap::new();
        for block in &blocks {
            by_group.entry(block.group()).or_default().push(block);
        }
        for (group, users) in by_group {
            if users.len() > 1 && users.iter().any(|b| !b.is_looping()) {
                return Err(CepFlowError::invalid_parameter(format!(
                    "group '{group}' repeats across non-loop blocks"
                )));
            }
        }
        Ok(Self { name, blocks })
    }

    /// Start a fluent builder for a named pattern
    pub fn builder(name: impl Into<String>) -> PatternBuilder {
        PatternBuilder {
            name: name.into(),
            blocks: Vec::new(),
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Evaluate the first block's predicate against a candidate seed event
    pub fn matches_seed(&self, event: &Event) -> bool {
        static EMPTY: once_cell::sync::Lazy<History> = once_cell::sync::Lazy::new(History::new);
        self.blocks[0].predicate().evaluate(event, &EMPTY)
    }
}

/// Fluent builder over block modes
///
/// Construction errors (empty group names, invalid flag combinations) are
/// deferred and surfaced by [`PatternBuilder::build`].
pub struct PatternBuilder {
    name: String,
    blocks: Vec<Block>,
    error: Option<CepFlowError>,
}

impl PatternBuilder {
    fn push(
        mut self,
        group: impl Into<String>,
        predicate: Arc<dyn Predicate>,
        strict: bool,
        negated: bool,
        optional: bool,
        looping: bool,
    ) -> Self {
        if self.error.is_some() {
            return self;
        }
        match Block::new(group, predicate, strict, negated, optional, looping) {
            Ok(block) => self.blocks.push(block),
            Err(e) => self.error = Some(e),
        }
        self
    }

    /// Non-strict block: arbitrary non-matching events may intervene
    pub fn followed_by<P: Predicate + 'static>(self, group: impl Into<String>, predicate: P) -> Self {
        self.push(group, Arc::new(predicate), false, false, false, false)
    }

    /// Strict block: the very next event must match or the run halts
    pub fn next<P: Predicate + 'static>(self, group: impl Into<String>, predicate: P) -> Self {
        self.push(group, Arc::new(predicate), true, false, false, false)
    }

    /// Non-strict negated block: a match halts the run incomplete
    pub fn not_followed_by<P: Predicate + 'static>(
        self,
        group: impl Into<String>,
        predicate: P,
    ) -> Self {
        self.push(group, Arc::new(predicate), false, true, false, false)
    }

    /// Strict negated block: the very next event must not match
    pub fn not_next<P: Predicate + 'static>(self, group: impl Into<String>, predicate: P) -> Self {
        self.push(group, Arc::new(predicate), true, true, false, false)
    }

    /// Optional non-strict block
    pub fn optional<P: Predicate + 'static>(self, group: impl Into<String>, predicate: P) -> Self {
        self.push(group, Arc::new(predicate), false, false, true, false)
    }

    /// Looping non-strict block: collects matches until the predicate fails
    pub fn loop_while<P: Predicate + 'static>(self, group: impl Into<String>, predicate: P) -> Self {
        self.push(group, Arc::new(predicate), false, false, false, true)
    }

    pub fn build(self) -> CepFlowResult<Pattern> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Pattern::new(self.name, self.blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::ClosurePredicate;

    fn always(_: &Event, _: &History) -> bool {
        true
    }

    #[test]
    fn test_builder_produces_ordered_blocks() {
        let pattern = Pattern::builder("p")
            .followed_by("a", always)
            .next("b", always)
            .not_followed_by("c", always)
            .build()
            .unwrap();

        assert_eq!(pattern.name(), "p");
        assert_eq!(pattern.blocks().len(), 3);
        assert!(!pattern.blocks()[0].is_strict());
        assert!(pattern.blocks()[1].is_strict());
        assert!(pattern.blocks()[2].is_negated());
    }

    #[test]
    fn test_empty_pattern_rejected() {
        assert!(Pattern::builder("p").build().is_err());
        assert!(Pattern::new("", vec![]).is_err());
    }

    #[test]
    fn test_head_block_restrictions() {
        assert!(Pattern::builder("p").optional("a", always).build().is_err());
        assert!(Pattern::builder("p").loop_while("a", always).build().is_err());
        assert!(Pattern::builder("p")
            .not_followed_by("a", always)
            .build()
            .is_err());
    }

    #[test]
    fn test_duplicate_group_only_for_loops() {
        // Two non-loop blocks sharing a group: rejected
        let result = Pattern::builder("p")
            .followed_by("a", always)
            .followed_by("a", always)
            .build();
        assert!(result.is_err());

        // Loop blocks may share a group, collecting a multiset
        let result = Pattern::builder("p")
            .followed_by("seed", always)
            .loop_while("a", always)
            .next("gap", always)
            .loop_while("a", always)
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_builder_defers_block_errors() {
        let result = Pattern::builder("p")
            .followed_by("", ClosurePredicate::always_true())
            .build();
        assert!(matches!(
            result,
            Err(CepFlowError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_matches_seed() {
        let pattern = Pattern::builder("p")
            .followed_by("a", |e: &Event, _: &History| e.timestamp() == 1,)
            .build()
            .unwrap();
        let hit = Event::simple("e1", 1, serde_json::Value::Null).unwrap();
        let miss = Event::simple("e2", 2, serde_json::Value::Null).unwrap();
        assert!(pattern.matches_seed(&hit));
        assert!(!pattern.matches_seed(&miss));
    }
}
