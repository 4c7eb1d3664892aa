// SPDX-License-Identifier: MIT OR Apache-2.0

//! Forwarder: dispatches process actions and publishes their outcomes
//!
//! Each tick does two half-steps. Dispatch dequeues one complex event and,
//! when its process carries an action, hands the pair to the action
//! handler. Collect polls the handler for one finished action event and
//! publishes it. Either half-step counts as progress, so a pooled handler's
//! late results still drain after the dispatch queue empties.

use crate::action::ActionHandler;
use crate::engine::subscriber::{ForwarderSubscriber, ProducerSubscriber};
use crate::engine::EngineTask;
use crate::error::{CepFlowError, CepFlowResult};
use crate::event::Event;
use crate::process::Process;
use crate::util::queue::stage_queue;
use crossbeam_channel::{Receiver as QueueReceiver, Sender};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Forwarder queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwarderConfig {
    /// Bounded queue capacity; 0 = unbounded
    pub max_size: usize,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self { max_size: 255 }
    }
}

/// Action dispatch stage of the pipeline
pub struct Forwarder {
    event_tx: Sender<Event>,
    event_rx: QueueReceiver<Event>,
    capacity: usize,
    processes: BTreeMap<String, Arc<Process>>,
    handler: Box<dyn ActionHandler>,
    subscribers: Vec<Arc<dyn ForwarderSubscriber>>,
    closed: Arc<AtomicBool>,
}

impl Forwarder {
    pub fn new(
        config: &ForwarderConfig,
        processes: Vec<Arc<Process>>,
        handler: Box<dyn ActionHandler>,
    ) -> CepFlowResult<Self> {
        let mut by_name = BTreeMap::new();
        for process in processes {
            let name = process.name().to_string();
            if by_name.insert(name.clone(), process).is_some() {
                return Err(CepFlowError::duplicate_name(name, "forwarder"));
            }
        }
        let (event_tx, event_rx) = stage_queue(config.max_size);
        Ok(Self {
            event_tx,
            event_rx,
            capacity: config.max_size,
            processes: by_name,
            handler,
            subscribers: Vec::new(),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn subscribe(&mut self, subscriber: Arc<dyn ForwarderSubscriber>) {
        self.subscribers.push(subscriber);
    }

    /// Ingress handle fed with the producer's complex events
    pub fn handle(&self) -> ForwarderHandle {
        ForwarderHandle {
            event_tx: self.event_tx.clone(),
            capacity: self.capacity,
            closed: Arc::clone(&self.closed),
        }
    }

    fn dispatch(&mut self, event: Event) -> CepFlowResult<()> {
        let Event::Complex { process_name, .. } = &event else {
            log::warn!("forwarder dropped non-complex event '{}'", event.event_id());
            return Ok(());
        };
        let process = self
            .processes
            .get(process_name)
            .ok_or_else(|| CepFlowError::unknown_process(process_name))?;
        match process.action() {
            Some(action) => self.handler.handle(Arc::clone(action), event),
            None => {
                // No action: nothing to execute, nothing to publish.
                Ok(())
            }
        }
    }

    fn publish(&self, event: &Event) -> CepFlowResult<()> {
        for subscriber in &self.subscribers {
            subscriber.on_forwarder_update(event.clone())?;
        }
        Ok(())
    }
}

impl EngineTask for Forwarder {
    fn task_name(&self) -> &'static str {
        "forwarder"
    }

    fn update(&mut self) -> CepFlowResult<bool> {
        if self.is_closed() {
            return Ok(false);
        }
        let mut progress = false;

        if let Ok(event) = self.event_rx.try_recv() {
            self.dispatch(event)?;
            progress = true;
        }

        if let Some(action_event) = self.handler.poll_action_event() {
            self.publish(&action_event)?;
            progress = true;
        }

        Ok(progress)
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.handler.close();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Ingress handle onto the forwarder queue
#[derive(Clone)]
pub struct ForwarderHandle {
    event_tx: Sender<Event>,
    capacity: usize,
    closed: Arc<AtomicBool>,
}

impl ProducerSubscriber for ForwarderHandle {
    fn on_producer_update(&self, event: Event) -> CepFlowResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CepFlowError::closed("forwarder"));
        }
        self.event_tx
            .try_send(event)
            .map_err(|_| CepFlowError::queue_full("forwarder", self.capacity))
    }
}
