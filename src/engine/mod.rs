// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cooperative engine loop over the pipeline stages
//!
//! Stages implement [`EngineTask`] and are polled round-robin on a single
//! thread. Each stage gets a per-cycle tick budget; a budget of 0 drains
//! the stage until it reports no progress. With `early_stop` set, a stage
//! that reports no progress forfeits the rest of its budget for that cycle.

pub mod decider;
pub mod forwarder;
pub mod producer;
pub mod receiver;
pub mod subscriber;

pub use decider::{Decider, DeciderConfig, DeciderHandle};
pub use forwarder::{Forwarder, ForwarderConfig, ForwarderHandle};
pub use producer::{Producer, ProducerConfig, ProducerHandle};
pub use receiver::{Receiver, ReceiverConfig, ReceiverHandle};

use crate::error::CepFlowResult;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A unit of work pollable by the engine loop
pub trait EngineTask: Send {
    fn task_name(&self) -> &'static str;

    /// Perform one tick; `Ok(true)` means the tick did work
    fn update(&mut self) -> CepFlowResult<bool>;

    /// Stop the task; `update` is a no-op afterwards
    fn close(&mut self);

    fn is_closed(&self) -> bool;
}

/// Tick budgets and loop behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Receiver ticks per cycle; 0 = drain
    pub times_receiver: usize,
    /// Decider ticks per cycle; 0 = drain
    pub times_decider: usize,
    /// Producer ticks per cycle; 0 = drain
    pub times_producer: usize,
    /// Forwarder ticks per cycle; 0 = drain
    pub times_forwarder: usize,
    /// Forfeit a stage's remaining budget once it reports no progress
    pub early_stop: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            times_receiver: 5,
            times_decider: 5,
            times_producer: 5,
            times_forwarder: 5,
            early_stop: true,
        }
    }
}

struct TaskSlot {
    task: Box<dyn EngineTask>,
    times: usize,
}

/// Round-robin driver over the pipeline stages
pub struct Engine {
    slots: Vec<TaskSlot>,
    early_stop: bool,
    closed: Arc<AtomicBool>,
    tasks_closed: bool,
}

impl Engine {
    pub fn new(
        config: &EngineConfig,
        receiver: Receiver,
        decider: Decider,
        producer: Producer,
        forwarder: Forwarder,
    ) -> Self {
        let slots = vec![
            TaskSlot {
                task: Box::new(receiver),
                times: config.times_receiver,
            },
            TaskSlot {
                task: Box::new(decider),
                times: config.times_decider,
            },
            TaskSlot {
                task: Box::new(producer),
                times: config.times_producer,
            },
            TaskSlot {
                task: Box::new(forwarder),
                times: config.times_forwarder,
            },
        ];
        Self {
            slots,
            early_stop: config.early_stop,
            closed: Arc::new(AtomicBool::new(false)),
            tasks_closed: false,
        }
    }

    /// Append an extra task to the cycle, e.g. a distribution peer
    pub fn add_task(&mut self, task: Box<dyn EngineTask>, times: usize) {
        self.slots.push(TaskSlot { task, times });
    }

    /// Shutdown handle, safe to share with signal handlers and other threads
    pub fn shutdown_handle(&self) -> EngineShutdown {
        EngineShutdown {
            closed: Arc::clone(&self.closed),
        }
    }

    /// One full cycle over all stages; `Ok(true)` if any stage did work
    pub fn update(&mut self) -> CepFlowResult<bool> {
        let mut any_progress = false;
        for slot in &mut self.slots {
            let drain = slot.times == 0;
            let mut remaining = slot.times;
            loop {
                if !drain {
                    if remaining == 0 {
                        break;
                    }
                    remaining -= 1;
                }
                match slot.task.update() {
                    Ok(true) => any_progress = true,
                    Ok(false) => {
                        if drain || self.early_stop {
                            break;
                        }
                    }
                    Err(e) => {
                        log::error!("task '{}' failed: {e}", slot.task.task_name());
                        break;
                    }
                }
            }
        }
        Ok(any_progress)
    }

    /// Drive cycles until the shutdown flag is raised, then close every task
    pub fn run(&mut self) -> CepFlowResult<()> {
        log::info!("engine started with {} tasks", self.slots.len());
        while !self.closed.load(Ordering::SeqCst) {
            if !self.update()? {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
        self.close();
        Ok(())
    }

    /// Raise the shutdown flag and close every task; idempotent
    pub fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        if self.tasks_closed {
            return;
        }
        for slot in &mut self.slots {
            slot.task.close();
            log::debug!("task '{}' closed", slot.task.task_name());
        }
        self.tasks_closed = true;
        log::info!("engine closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Cloneable flag for stopping a running engine from another thread
#[derive(Clone)]
pub struct EngineShutdown {
    closed: Arc<AtomicBool>,
}

impl EngineShutdown {
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
