// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decider: owns the table of live runs and turns events into run
//! transitions
//!
//! Each tick first applies any snapshots received from remote peers, then
//! dequeues one event and performs two passes:
//!
//! - Pass A advances every live run; runs that halt are removed from the
//!   table before Pass B.
//! - Pass B spawns a fresh run for every pattern whose first block matches
//!   the event. A single-block pattern completes on construction and is
//!   reported halted-complete without ever being stored.
//!
//! The resulting `halted_complete` / `halted_incomplete` / `updated` lists
//! are pushed to the subscribers (producer, and optionally a distributed
//! peer).

use crate::engine::subscriber::{DeciderSubscriber, DistributedSubscriber, ReceiverSubscriber};
use crate::engine::EngineTask;
use crate::error::{CepFlowError, CepFlowResult};
use crate::event::Event;
use crate::process::Process;
use crate::run::{DeciderSnapshot, Run, RunOutcome, RunTuple};
use crate::util::ids::EventIdGenerator;
use crate::util::queue::stage_queue;
use crossbeam_channel::{Receiver as QueueReceiver, Sender};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Decider queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeciderConfig {
    /// Bounded queue capacity; 0 = unbounded
    pub max_size: usize,
}

impl Default for DeciderConfig {
    fn default() -> Self {
        Self { max_size: 255 }
    }
}

/// Run table key; unique per live run
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RunKey {
    pub process_name: String,
    pub pattern_name: String,
    pub run_id: String,
}

impl RunKey {
    fn of_run(run: &Run) -> Self {
        Self {
            process_name: run.process_name().to_string(),
            pattern_name: run.pattern().name().to_string(),
            run_id: run.run_id().to_string(),
        }
    }

    fn of_tuple(tuple: &RunTuple) -> Self {
        Self {
            process_name: tuple.process_name.clone(),
            pattern_name: tuple.pattern_name.clone(),
            run_id: tuple.run_id.clone(),
        }
    }
}

/// Pattern-matching stage of the pipeline
pub struct Decider {
    event_tx: Sender<Event>,
    event_rx: QueueReceiver<Event>,
    remote_tx: Sender<DeciderSnapshot>,
    remote_rx: QueueReceiver<DeciderSnapshot>,
    capacity: usize,
    processes: BTreeMap<String, Arc<Process>>,
    runs: BTreeMap<RunKey, Run>,
    run_id_gen: Arc<dyn EventIdGenerator>,
    subscribers: Vec<Arc<dyn DeciderSubscriber>>,
    closed: Arc<AtomicBool>,
}

impl Decider {
    pub fn new(
        config: &DeciderConfig,
        processes: Vec<Arc<Process>>,
        run_id_gen: Arc<dyn EventIdGenerator>,
    ) -> CepFlowResult<Self> {
        let mut by_name = BTreeMap::new();
        for process in processes {
            let name = process.name().to_string();
            if by_name.insert(name.clone(), process).is_some() {
                return Err(CepFlowError::duplicate_name(name, "decider"));
            }
        }
        let (event_tx, event_rx) = stage_queue(config.max_size);
        let (remote_tx, remote_rx) = stage_queue(config.max_size);
        Ok(Self {
            event_tx,
            event_rx,
            remote_tx,
            remote_rx,
            capacity: config.max_size,
            processes: by_name,
            runs: BTreeMap::new(),
            run_id_gen,
            subscribers: Vec::new(),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn subscribe(&mut self, subscriber: Arc<dyn DeciderSubscriber>) {
        self.subscribers.push(subscriber);
    }

    /// Ingress handle: event feed for the receiver, snapshot feed for a peer
    pub fn handle(&self) -> DeciderHandle {
        DeciderHandle {
            event_tx: self.event_tx.clone(),
            remote_tx: self.remote_tx.clone(),
            capacity: self.capacity,
            closed: Arc::clone(&self.closed),
        }
    }

    /// Number of live runs in the table
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Look up a live run
    pub fn run(&self, process_name: &str, pattern_name: &str, run_id: &str) -> Option<&Run> {
        self.runs.get(&RunKey {
            process_name: process_name.to_string(),
            pattern_name: pattern_name.to_string(),
            run_id: run_id.to_string(),
        })
    }

    /// Halt a live run manually; it is reported halted-incomplete on the
    /// next published snapshot and removed from the table immediately
    pub fn halt_run(
        &mut self,
        process_name: &str,
        pattern_name: &str,
        run_id: &str,
    ) -> CepFlowResult<()> {
        let key = RunKey {
            process_name: process_name.to_string(),
            pattern_name: pattern_name.to_string(),
            run_id: run_id.to_string(),
        };
        let mut run = self
            .runs
            .remove(&key)
            .ok_or_else(|| CepFlowError::RunNotFound {
                process: key.process_name.clone(),
                pattern: key.pattern_name.clone(),
                run_id: key.run_id.clone(),
            })?;
        run.halt();
        let snapshot = DeciderSnapshot {
            halted_incomplete: vec![run.to_tuple()],
            ..DeciderSnapshot::default()
        };
        self.publish(&snapshot)
    }

    fn process_event(&mut self, event: &Event) -> CepFlowResult<DeciderSnapshot> {
        let mut snapshot = DeciderSnapshot::default();

        // Pass A: advance existing runs; halted runs leave the table before
        // Pass B spawns anything new.
        let keys: Vec<RunKey> = self.runs.keys().cloned().collect();
        for key in keys {
            let Some(run) = self.runs.get_mut(&key) else {
                continue;
            };
            match run.process(event) {
                RunOutcome::Unchanged => {}
                RunOutcome::Updated => snapshot.updated.push(run.to_tuple()),
                RunOutcome::HaltedComplete => {
                    snapshot.halted_complete.push(run.to_tuple());
                    self.runs.remove(&key);
                }
                RunOutcome::HaltedIncomplete => {
                    snapshot.halted_incomplete.push(run.to_tuple());
                    self.runs.remove(&key);
                }
            }
        }

        // Pass B: spawn a run per first-block match.
        for process in self.processes.values() {
            for pattern in process.patterns() {
                if !pattern.matches_seed(event) {
                    continue;
                }
                let run = Run::new(
                    self.run_id_gen.generate(),
                    process.name(),
                    Arc::clone(pattern),
                    event.clone(),
                )?;
                if run.is_complete() {
                    snapshot.halted_complete.push(run.to_tuple());
                    continue;
                }
                let key = RunKey::of_run(&run);
                if self.runs.contains_key(&key) {
                    return Err(CepFlowError::RunExists {
                        process: key.process_name,
                        pattern: key.pattern_name,
                        run_id: key.run_id,
                    });
                }
                snapshot.updated.push(run.to_tuple());
                self.runs.insert(key, run);
            }
        }

        Ok(snapshot)
    }

    /// Apply a snapshot received from a remote peer: halted tuples remove
    /// table entries, updated tuples upsert remote runs
    fn apply_remote(&mut self, snapshot: DeciderSnapshot) {
        for tuple in snapshot
            .halted_complete
            .iter()
            .chain(&snapshot.halted_incomplete)
        {
            self.runs.remove(&RunKey::of_tuple(tuple));
        }
        for tuple in &snapshot.updated {
            let pattern = self
                .processes
                .get(&tuple.process_name)
                .and_then(|p| p.pattern(&tuple.pattern_name));
            let Some(pattern) = pattern else {
                log::warn!(
                    "remote tuple for unknown ({}, {}) ignored",
                    tuple.process_name,
                    tuple.pattern_name
                );
                continue;
            };
            match Run::from_tuple(tuple, Arc::clone(pattern)) {
                Ok(run) if !run.is_halted() => {
                    self.runs.insert(RunKey::of_tuple(tuple), run);
                }
                Ok(_) => {
                    // A tuple past the last block is terminal; drop any
                    // local counterpart.
                    self.runs.remove(&RunKey::of_tuple(tuple));
                }
                Err(e) => log::warn!("remote tuple rejected: {e}"),
            }
        }
    }

    fn publish(&self, snapshot: &DeciderSnapshot) -> CepFlowResult<()> {
        for subscriber in &self.subscribers {
            subscriber.on_decider_update(
                &snapshot.halted_complete,
                &snapshot.halted_incomplete,
                &snapshot.updated,
            )?;
        }
        Ok(())
    }
}

impl EngineTask for Decider {
    fn task_name(&self) -> &'static str {
        "decider"
    }

    fn update(&mut self) -> CepFlowResult<bool> {
        if self.is_closed() {
            return Ok(false);
        }
        let mut progress = false;

        while let Ok(snapshot) = self.remote_rx.try_recv() {
            self.apply_remote(snapshot);
            progress = true;
        }

        if let Ok(event) = self.event_rx.try_recv() {
            let snapshot = self.process_event(&event)?;
            if !snapshot.is_empty() {
                self.publish(&snapshot)?;
            }
            progress = true;
        }

        Ok(progress)
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Ingress handle onto the decider's event and remote-snapshot queues
#[derive(Clone)]
pub struct DeciderHandle {
    event_tx: Sender<Event>,
    remote_tx: Sender<DeciderSnapshot>,
    capacity: usize,
    closed: Arc<AtomicBool>,
}

impl ReceiverSubscriber for DeciderHandle {
    fn on_receiver_update(&self, event: Event) -> CepFlowResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CepFlowError::closed("decider"));
        }
        self.event_tx
            .try_send(event)
            .map_err(|_| CepFlowError::queue_full("decider", self.capacity))
    }
}

impl DistributedSubscriber for DeciderHandle {
    fn on_distributed_update(&self, snapshot: DeciderSnapshot) -> CepFlowResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CepFlowError::closed("decider"));
        }
        self.remote_tx
            .try_send(snapshot)
            .map_err(|_| CepFlowError::queue_full("decider", self.capacity))
    }
}
