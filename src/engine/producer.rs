// SPDX-License-Identifier: MIT OR Apache-2.0

//! Producer: turns completed runs into complex events
//!
//! The decider's halted-complete tuples land in the producer queue via
//! `ProducerHandle`. Each tick dequeues one tuple, resolves its process and
//! pattern, asks the process's data generator for a payload and emits a
//! complex event carrying the full match history.

use crate::engine::subscriber::{DeciderSubscriber, ProducerSubscriber};
use crate::engine::EngineTask;
use crate::error::{CepFlowError, CepFlowResult};
use crate::event::Event;
use crate::process::Process;
use crate::run::RunTuple;
use crate::util::ids::{EventIdGenerator, TimestampGenerator};
use crate::util::queue::stage_queue;
use crossbeam_channel::{Receiver as QueueReceiver, Sender};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Producer queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerConfig {
    /// Bounded queue capacity; 0 = unbounded
    pub max_size: usize,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self { max_size: 255 }
    }
}

/// Complex-event synthesis stage of the pipeline
pub struct Producer {
    tuple_tx: Sender<RunTuple>,
    tuple_rx: QueueReceiver<RunTuple>,
    capacity: usize,
    processes: BTreeMap<String, Arc<Process>>,
    event_id_gen: Arc<dyn EventIdGenerator>,
    timestamp_gen: Arc<dyn TimestampGenerator>,
    subscribers: Vec<Arc<dyn ProducerSubscriber>>,
    closed: Arc<AtomicBool>,
}

impl Producer {
    pub fn new(
        config: &ProducerConfig,
        processes: Vec<Arc<Process>>,
        event_id_gen: Arc<dyn EventIdGenerator>,
        timestamp_gen: Arc<dyn TimestampGenerator>,
    ) -> CepFlowResult<Self> {
        let mut by_name = BTreeMap::new();
        for process in processes {
            let name = process.name().to_string();
            if by_name.insert(name.clone(), process).is_some() {
                return Err(CepFlowError::duplicate_name(name, "producer"));
            }
        }
        let (tuple_tx, tuple_rx) = stage_queue(config.max_size);
        Ok(Self {
            tuple_tx,
            tuple_rx,
            capacity: config.max_size,
            processes: by_name,
            event_id_gen,
            timestamp_gen,
            subscribers: Vec::new(),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn subscribe(&mut self, subscriber: Arc<dyn ProducerSubscriber>) {
        self.subscribers.push(subscriber);
    }

    /// Ingress handle fed with the decider's halted-complete tuples
    pub fn handle(&self) -> ProducerHandle {
        ProducerHandle {
            tuple_tx: self.tuple_tx.clone(),
            capacity: self.capacity,
            closed: Arc::clone(&self.closed),
        }
    }

    fn produce(&self, tuple: RunTuple) -> CepFlowResult<Event> {
        let process = self
            .processes
            .get(&tuple.process_name)
            .ok_or_else(|| CepFlowError::unknown_process(&tuple.process_name))?;
        if process.pattern(&tuple.pattern_name).is_none() {
            return Err(CepFlowError::unknown_pattern(
                &tuple.process_name,
                &tuple.pattern_name,
            ));
        }
        let data = process.generate_data(&tuple.history);
        Event::complex(
            self.event_id_gen.generate(),
            self.timestamp_gen.generate(),
            data,
            tuple.process_name,
            tuple.pattern_name,
            tuple.history,
        )
    }

    fn publish(&self, event: &Event) -> CepFlowResult<()> {
        for subscriber in &self.subscribers {
            subscriber.on_producer_update(event.clone())?;
        }
        Ok(())
    }
}

impl EngineTask for Producer {
    fn task_name(&self) -> &'static str {
        "producer"
    }

    fn update(&mut self) -> CepFlowResult<bool> {
        if self.is_closed() {
            return Ok(false);
        }
        let Ok(tuple) = self.tuple_rx.try_recv() else {
            return Ok(false);
        };
        let event = self.produce(tuple)?;
        self.publish(&event)?;
        Ok(true)
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Ingress handle onto the producer queue
///
/// Subscribes to the decider and forwards only the halted-complete list;
/// incomplete and updated runs never reach the producer.
#[derive(Clone)]
pub struct ProducerHandle {
    tuple_tx: Sender<RunTuple>,
    capacity: usize,
    closed: Arc<AtomicBool>,
}

impl DeciderSubscriber for ProducerHandle {
    fn on_decider_update(
        &self,
        halted_complete: &[RunTuple],
        _halted_incomplete: &[RunTuple],
        _updated: &[RunTuple],
    ) -> CepFlowResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CepFlowError::closed("producer"));
        }
        for tuple in halted_complete {
            self.tuple_tx
                .try_send(tuple.clone())
                .map_err(|_| CepFlowError::queue_full("producer", self.capacity))?;
        }
        Ok(())
    }
}
