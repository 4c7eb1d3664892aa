// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run: an in-flight attempt to match one pattern from a seed event
//!
//! State is a tagged variant rather than a `halted`/`complete` flag pair:
//! `Active` carries the index of the next block to satisfy, the two halted
//! states are terminal. `process()` advances the state per the block-mode
//! semantics:
//!
//! - strict blocks require the very next event to match, otherwise the run
//!   halts incomplete
//! - non-strict blocks skip non-matching events
//! - negated blocks are guards: they succeed on predicate-false and never
//!   contribute to the history; a non-strict negated block advances only
//!   tentatively, committing when the same event satisfies a later block
//! - optional blocks consume on match; on mismatch the run advances past
//!   them without consuming the event
//! - loop blocks collect matches in place and exit permanently on the first
//!   mismatch, re-attempting the next block against the same event

use crate::error::{CepFlowError, CepFlowResult};
use crate::event::{Event, History};
use crate::pattern::Pattern;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Matching state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// `block_index` is the index of the next block to satisfy
    Active { block_index: usize },
    HaltedComplete,
    HaltedIncomplete { block_index: usize },
}

/// Result of feeding one event to a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The event did not change the run
    Unchanged,
    /// The run advanced or collected the event and is still alive
    Updated,
    HaltedComplete,
    HaltedIncomplete,
}

/// Serialized view of a run, used for decider snapshots and the wire
///
/// `run_id` rides along so a remote peer can apply the tuple to its own
/// table, which is keyed by `(process_name, pattern_name, run_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunTuple {
    pub run_id: String,
    pub process_name: String,
    pub pattern_name: String,
    pub block_index: usize,
    pub history: History,
}

/// The three disjoint per-tick output lists of the decider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeciderSnapshot {
    pub halted_complete: Vec<RunTuple>,
    pub halted_incomplete: Vec<RunTuple>,
    pub updated: Vec<RunTuple>,
}

impl DeciderSnapshot {
    pub fn is_empty(&self) -> bool {
        self.halted_complete.is_empty()
            && self.halted_incomplete.is_empty()
            && self.updated.is_empty()
    }
}

/// Per-(pattern, seed event) matching state machine, owned by the decider
#[derive(Debug, Clone)]
pub struct Run {
    run_id: String,
    process_name: String,
    pattern: Arc<Pattern>,
    history: History,
    state: RunState,
}

impl Run {
    /// Spawn a run from an event that matched the pattern's first block
    ///
    /// A single-block pattern completes immediately on construction.
    pub fn new(
        run_id: impl Into<String>,
        process_name: impl Into<String>,
        pattern: Arc<Pattern>,
        seed: Event,
    ) -> CepFlowResult<Self> {
        let run_id = run_id.into();
        let process_name = process_name.into();
        if run_id.is_empty() {
            return Err(CepFlowError::invalid_parameter_with_name(
                "must be non-empty",
                "run_id",
            ));
        }
        if process_name.is_empty() {
            return Err(CepFlowError::invalid_parameter_with_name(
                "must be non-empty",
                "process_name",
            ));
        }
        let mut history = History::new();
        history.push(pattern.blocks()[0].group(), seed);
        let state = if pattern.blocks().len() == 1 {
            RunState::HaltedComplete
        } else {
            RunState::Active { block_index: 1 }
        };
        Ok(Self {
            run_id,
            process_name,
            pattern,
            history,
            state,
        })
    }

    /// Reconstruct a run from a snapshot tuple, e.g. one received from a peer
    pub fn from_tuple(tuple: &RunTuple, pattern: Arc<Pattern>) -> CepFlowResult<Self> {
        if tuple.pattern_name != pattern.name() {
            return Err(CepFlowError::invalid_parameter(format!(
                "tuple names pattern '{}' but '{}' was supplied",
                tuple.pattern_name,
                pattern.name()
            )));
        }
        let state = if tuple.block_index >= pattern.blocks().len() {
            RunState::HaltedComplete
        } else {
            RunState::Active {
                block_index: tuple.block_index,
            }
        };
        Ok(Self {
            run_id: tuple.run_id.clone(),
            process_name: tuple.process_name.clone(),
            pattern,
            history: tuple.history.clone(),
            state,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    pub fn pattern(&self) -> &Arc<Pattern> {
        &self.pattern
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_halted(&self) -> bool {
        !matches!(self.state, RunState::Active { .. })
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, RunState::HaltedComplete)
    }

    /// Index of the next block to satisfy; the block count when complete
    pub fn block_index(&self) -> usize {
        match self.state {
            RunState::Active { block_index } => block_index,
            RunState::HaltedComplete => self.pattern.blocks().len(),
            RunState::HaltedIncomplete { block_index } => block_index,
        }
    }

    /// Halt the run incomplete; further `process()` calls are ignored
    pub fn halt(&mut self) {
        if let RunState::Active { block_index } = self.state {
            self.state = RunState::HaltedIncomplete { block_index };
        }
    }

    /// Snapshot tuple of the current state
    pub fn to_tuple(&self) -> RunTuple {
        RunTuple {
            run_id: self.run_id.clone(),
            process_name: self.process_name.clone(),
            pattern_name: self.pattern.name().to_string(),
            block_index: self.block_index(),
            history: self.history.clone(),
        }
    }

    /// Feed one event to the run
    pub fn process(&mut self, event: &Event) -> RunOutcome {
        let RunState::Active { block_index } = self.state else {
            return RunOutcome::Unchanged;
        };
        let pattern = Arc::clone(&self.pattern);
        let blocks = pattern.blocks();

        let mut idx = block_index;
        // Last committed index; idx beyond it means the gap was crossed
        // tentatively through non-strict negated blocks.
        let mut committed = block_index;
        let mut progressed = false;

        loop {
            if idx >= blocks.len() {
                self.state = RunState::HaltedComplete;
                return RunOutcome::HaltedComplete;
            }
            let block = &blocks[idx];
            let matched = block.predicate().evaluate(event, &self.history);

            if block.is_looping() {
                if matched {
                    self.history.push(block.group(), event.clone());
                    self.state = RunState::Active { block_index: idx };
                    return RunOutcome::Updated;
                }
                // Exit the loop permanently; re-attempt the next block on
                // this same event.
                idx += 1;
                committed = idx;
                progressed = true;
                continue;
            }

            if block.is_negated() {
                if matched {
                    self.state = RunState::HaltedIncomplete { block_index: idx };
                    return RunOutcome::HaltedIncomplete;
                }
                if block.is_strict() {
                    // Guard passed; the event is consumed without entering
                    // the history.
                    return self.advance_to(idx + 1);
                }
                idx += 1;
                continue;
            }

            if matched {
                self.history.push(block.group(), event.clone());
                return self.advance_to(idx + 1);
            }

            if block.is_optional() {
                // Skipped: advance without consuming the event; the
                // successor is not re-tested against it.
                return self.advance_to(idx + 1);
            }

            if block.is_strict() && idx == committed {
                self.state = RunState::HaltedIncomplete { block_index: idx };
                return RunOutcome::HaltedIncomplete;
            }

            // Non-strict mismatch, or a strict block reached through
            // uncommitted negated advances: stay at the committed block.
            self.state = RunState::Active {
                block_index: committed,
            };
            return if progressed {
                RunOutcome::Updated
            } else {
                RunOutcome::Unchanged
            };
        }
    }

    fn advance_to(&mut self, block_index: usize) -> RunOutcome {
        if block_index >= self.pattern.blocks().len() {
            self.state = RunState::HaltedComplete;
            RunOutcome::HaltedComplete
        } else {
            self.state = RunState::Active { block_index };
            RunOutcome::Updated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn simple(id: &str, ts: i64, data: Value) -> Event {
        Event::simple(id, ts, data).unwrap()
    }

    fn data_eq(expected: i64) -> impl Fn(&Event, &History) -> bool {
        move |e: &Event, _: &History| e.data() == &json!(expected)
    }

    fn always(_: &Event, _: &History) -> bool {
        true
    }

    fn never(_: &Event, _: &History) -> bool {
        false
    }

    fn spawn(pattern: Pattern, seed: Event) -> Run {
        Run::new("r1", "proc", Arc::new(pattern), seed).unwrap()
    }

    #[test]
    fn test_single_block_completes_on_construction() {
        let pattern = Pattern::builder("p").followed_by("a", always).build().unwrap();
        let run = spawn(pattern, simple("e1", 1, Value::Null));
        assert!(run.is_complete());
        assert_eq!(run.block_index(), 1);
        assert_eq!(run.history().group("a").len(), 1);
    }

    #[test]
    fn test_followed_by_chain() {
        let pattern = Pattern::builder("p")
            .followed_by("a", always)
            .followed_by("b", always)
            .followed_by("c", always)
            .build()
            .unwrap();
        let mut run = spawn(pattern, simple("e1", 1, Value::Null));

        assert_eq!(run.process(&simple("e2", 2, Value::Null)), RunOutcome::Updated);
        assert_eq!(
            run.process(&simple("e3", 3, Value::Null)),
            RunOutcome::HaltedComplete
        );
        assert_eq!(run.history().len(), 3);
    }

    #[test]
    fn test_non_strict_skips_mismatch() {
        let pattern = Pattern::builder("p")
            .followed_by("a", always)
            .followed_by("b", data_eq(7))
            .build()
            .unwrap();
        let mut run = spawn(pattern, simple("e1", 1, Value::Null));

        assert_eq!(run.process(&simple("e2", 2, json!(0))), RunOutcome::Unchanged);
        assert_eq!(run.state(), RunState::Active { block_index: 1 });
        assert_eq!(
            run.process(&simple("e3", 3, json!(7))),
            RunOutcome::HaltedComplete
        );
    }

    #[test]
    fn test_strict_mismatch_halts_incomplete() {
        let pattern = Pattern::builder("p")
            .followed_by("a", always)
            .next("b", never)
            .followed_by("c", always)
            .build()
            .unwrap();
        let mut run = spawn(pattern, simple("e1", 1, Value::Null));

        assert_eq!(
            run.process(&simple("e2", 2, Value::Null)),
            RunOutcome::HaltedIncomplete
        );
        assert!(run.is_halted());
        assert!(!run.is_complete());
    }

    #[test]
    fn test_strict_negated_match_halts() {
        let pattern = Pattern::builder("p")
            .followed_by("a", always)
            .not_next("b", always)
            .followed_by("c", always)
            .build()
            .unwrap();
        let mut run = spawn(pattern, simple("e1", 1, Value::Null));

        assert_eq!(
            run.process(&simple("e2", 2, Value::Null)),
            RunOutcome::HaltedIncomplete
        );
    }

    #[test]
    fn test_strict_negated_mismatch_consumes_and_advances() {
        let pattern = Pattern::builder("p")
            .followed_by("a", always)
            .not_next("b", never)
            .followed_by("c", always)
            .build()
            .unwrap();
        let mut run = spawn(pattern, simple("e1", 1, Value::Null));

        // The guard consumes e2 without recording it
        assert_eq!(run.process(&simple("e2", 2, Value::Null)), RunOutcome::Updated);
        assert!(run.history().group("b").is_empty());
        assert_eq!(run.state(), RunState::Active { block_index: 2 });

        assert_eq!(
            run.process(&simple("e3", 3, Value::Null)),
            RunOutcome::HaltedComplete
        );
        assert_eq!(run.history().len(), 2);
    }

    #[test]
    fn test_non_strict_negated_commits_on_later_satisfied_block() {
        let pattern = Pattern::builder("p")
            .followed_by("a", always)
            .not_followed_by("b", data_eq(9))
            .followed_by("c", data_eq(5))
            .build()
            .unwrap();
        let mut run = spawn(pattern, simple("e1", 1, Value::Null));

        // Neither the negated block nor c match: the tentative advance is
        // reverted and the run is unchanged
        assert_eq!(run.process(&simple("e2", 2, json!(0))), RunOutcome::Unchanged);
        assert_eq!(run.state(), RunState::Active { block_index: 1 });

        // A match on the negated block halts the run
        let mut halted = run.clone();
        assert_eq!(
            halted.process(&simple("e3", 3, json!(9))),
            RunOutcome::HaltedIncomplete
        );

        // c satisfied by the same event: both advances commit
        assert_eq!(
            run.process(&simple("e4", 4, json!(5))),
            RunOutcome::HaltedComplete
        );
        assert_eq!(run.history().group("c").len(), 1);
        assert!(run.history().group("b").is_empty());
    }

    #[test]
    fn test_optional_skipped_on_mismatch() {
        let pattern = Pattern::builder("p")
            .followed_by("a", always)
            .optional("b", never)
            .followed_by("c", always)
            .followed_by("d", always)
            .build()
            .unwrap();
        let mut run = spawn(pattern, simple("e1", 1, Value::Null));

        // e2 skips the optional block without being consumed
        assert_eq!(run.process(&simple("e2", 2, Value::Null)), RunOutcome::Updated);
        assert_eq!(run.state(), RunState::Active { block_index: 2 });

        assert_eq!(run.process(&simple("e3", 3, Value::Null)), RunOutcome::Updated);
        assert_eq!(
            run.process(&simple("e4", 4, Value::Null)),
            RunOutcome::HaltedComplete
        );

        assert_eq!(run.history().group("a").len(), 1);
        assert!(run.history().group("b").is_empty());
        assert_eq!(run.history().group("c").len(), 1);
        assert_eq!(run.history().group("d").len(), 1);
    }

    #[test]
    fn test_optional_consumes_on_match() {
        let pattern = Pattern::builder("p")
            .followed_by("a", always)
            .optional("b", data_eq(2))
            .followed_by("c", always)
            .build()
            .unwrap();
        let mut run = spawn(pattern, simple("e1", 1, json!(1)));

        assert_eq!(run.process(&simple("e2", 2, json!(2))), RunOutcome::Updated);
        assert_eq!(run.history().group("b").len(), 1);
        assert_eq!(
            run.process(&simple("e3", 3, json!(3))),
            RunOutcome::HaltedComplete
        );
    }

    #[test]
    fn test_loop_collects_then_exits_on_same_event() {
        let pattern = Pattern::builder("p")
            .followed_by("a", data_eq(1))
            .loop_while("b", data_eq(2))
            .followed_by("c", data_eq(3))
            .build()
            .unwrap();
        let mut run = spawn(pattern, simple("e1", 1, json!(1)));

        assert_eq!(run.process(&simple("e2", 2, json!(2))), RunOutcome::Updated);
        assert_eq!(run.process(&simple("e3", 3, json!(2))), RunOutcome::Updated);
        assert_eq!(run.state(), RunState::Active { block_index: 1 });

        // The loop exits on 3 and c matches the same event
        assert_eq!(
            run.process(&simple("e4", 4, json!(3))),
            RunOutcome::HaltedComplete
        );
        assert_eq!(run.history().group("b").len(), 2);
        assert_eq!(run.history().group("c").len(), 1);
    }

    #[test]
    fn test_loop_exit_commits_even_without_successor_match() {
        let pattern = Pattern::builder("p")
            .followed_by("a", data_eq(1))
            .loop_while("b", data_eq(2))
            .followed_by("c", data_eq(3))
            .build()
            .unwrap();
        let mut run = spawn(pattern, simple("e1", 1, json!(1)));

        // 5 neither continues the loop nor matches c: the run has still
        // permanently left the loop
        assert_eq!(run.process(&simple("e2", 2, json!(5))), RunOutcome::Updated);
        assert_eq!(run.state(), RunState::Active { block_index: 2 });

        assert_eq!(run.process(&simple("e3", 3, json!(2))), RunOutcome::Unchanged);
        assert_eq!(
            run.process(&simple("e4", 4, json!(3))),
            RunOutcome::HaltedComplete
        );
    }

    #[test]
    fn test_manual_halt_is_terminal() {
        let pattern = Pattern::builder("p")
            .followed_by("a", always)
            .followed_by("b", always)
            .build()
            .unwrap();
        let mut run = spawn(pattern, simple("e1", 1, Value::Null));

        run.halt();
        assert!(run.is_halted());
        assert!(!run.is_complete());
        assert_eq!(run.process(&simple("e2", 2, Value::Null)), RunOutcome::Unchanged);
        assert!(!run.is_complete());
    }

    #[test]
    fn test_tuple_round_trip() {
        let pattern = Arc::new(
            Pattern::builder("p")
                .followed_by("a", always)
                .followed_by("b", always)
                .build()
                .unwrap(),
        );
        let run = Run::new("r1", "proc", Arc::clone(&pattern), simple("e1", 1, Value::Null))
            .unwrap();

        let tuple = run.to_tuple();
        assert_eq!(tuple.block_index, 1);

        let json = serde_json::to_string(&tuple).unwrap();
        let back: RunTuple = serde_json::from_str(&json).unwrap();
        assert_eq!(tuple, back);

        let rebuilt = Run::from_tuple(&back, pattern).unwrap();
        assert_eq!(rebuilt.run_id(), "r1");
        assert_eq!(rebuilt.state(), RunState::Active { block_index: 1 });
        assert_eq!(rebuilt.history(), run.history());
    }

    #[test]
    fn test_from_tuple_rejects_pattern_mismatch() {
        let pattern_a = Arc::new(Pattern::builder("a").followed_by("g", always).build().unwrap());
        let pattern_b = Arc::new(Pattern::builder("b").followed_by("g", always).build().unwrap());
        let run = Run::new("r1", "proc", pattern_a, simple("e1", 1, Value::Null)).unwrap();
        assert!(Run::from_tuple(&run.to_tuple(), pattern_b).is_err());
    }
}
