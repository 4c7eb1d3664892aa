// SPDX-License-Identifier: MIT OR Apache-2.0

//! Receiver: ingests raw data and feedback events, emits validated events
//!
//! One entity is dequeued per tick. Raw payloads that pass validation are
//! wrapped into a simple event with a fresh id and timestamp; feedback
//! events pass through validation of their payload. The null-event
//! generator is consulted every tick so time-driven transitions fire
//! without real input.

use crate::engine::subscriber::{ForwarderSubscriber, ProducerSubscriber, ReceiverSubscriber};
use crate::engine::EngineTask;
use crate::error::{CepFlowError, CepFlowResult};
use crate::event::Event;
use crate::util::ids::{EventIdGenerator, TimestampGenerator};
use crate::util::null_event::NullEventGenerator;
use crate::util::queue::stage_queue;
use crate::util::validator::Validator;
use crossbeam_channel::{Receiver as QueueReceiver, Sender};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receiver queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// Bounded queue capacity; 0 = unbounded
    pub max_size: usize,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self { max_size: 255 }
    }
}

/// An entity waiting in the receiver queue
#[derive(Debug, Clone)]
enum IngressEntity {
    Event(Event),
    Data(Value),
}

/// Ingress stage of the pipeline
pub struct Receiver {
    entity_tx: Sender<IngressEntity>,
    entity_rx: QueueReceiver<IngressEntity>,
    capacity: usize,
    validator: Box<dyn Validator>,
    event_id_gen: Arc<dyn EventIdGenerator>,
    timestamp_gen: Arc<dyn TimestampGenerator>,
    null_event_gen: Box<dyn NullEventGenerator>,
    subscribers: Vec<Arc<dyn ReceiverSubscriber>>,
    closed: Arc<AtomicBool>,
}

impl Receiver {
    pub fn new(
        config: &ReceiverConfig,
        validator: Box<dyn Validator>,
        event_id_gen: Arc<dyn EventIdGenerator>,
        timestamp_gen: Arc<dyn TimestampGenerator>,
        null_event_gen: Box<dyn NullEventGenerator>,
    ) -> Self {
        let (entity_tx, entity_rx) = stage_queue(config.max_size);
        Self {
            entity_tx,
            entity_rx,
            capacity: config.max_size,
            validator,
            event_id_gen,
            timestamp_gen,
            null_event_gen,
            subscribers: Vec::new(),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribe a downstream stage; wiring happens once at setup
    pub fn subscribe(&mut self, subscriber: Arc<dyn ReceiverSubscriber>) {
        self.subscribers.push(subscriber);
    }

    /// Non-owning ingress handle for feedback edges and external producers
    pub fn handle(&self) -> ReceiverHandle {
        ReceiverHandle {
            entity_tx: self.entity_tx.clone(),
            capacity: self.capacity,
            closed: Arc::clone(&self.closed),
        }
    }

    /// Enqueue a raw payload; silently dropped after close
    pub fn add_data(&self, data: Value) -> CepFlowResult<()> {
        self.handle().add_data(data)
    }

    fn publish(&self, event: &Event) -> CepFlowResult<()> {
        for subscriber in &self.subscribers {
            subscriber.on_receiver_update(event.clone())?;
        }
        Ok(())
    }
}

impl EngineTask for Receiver {
    fn task_name(&self) -> &'static str {
        "receiver"
    }

    fn update(&mut self) -> CepFlowResult<bool> {
        if self.is_closed() {
            return Ok(false);
        }
        let mut produced = false;

        if let Ok(entity) = self.entity_rx.try_recv() {
            match entity {
                IngressEntity::Event(event) => {
                    if self.validator.is_valid(event.data()) {
                        self.publish(&event)?;
                        produced = true;
                    } else {
                        log::debug!("receiver dropped invalid event '{}'", event.event_id());
                    }
                }
                IngressEntity::Data(data) => {
                    if self.validator.is_valid(&data) {
                        let event = Event::simple(
                            self.event_id_gen.generate(),
                            self.timestamp_gen.generate(),
                            data,
                        )?;
                        self.publish(&event)?;
                        produced = true;
                    } else {
                        log::debug!("receiver dropped invalid payload");
                    }
                }
            }
        }

        if let Some(event) = self.null_event_gen.maybe_generate(self.event_id_gen.as_ref()) {
            self.publish(&event)?;
            produced = true;
        }

        Ok(produced)
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Cheap cloneable ingress handle onto the receiver queue
///
/// Implements the feedback-edge subscriber traits so the producer and
/// forwarder can re-ingest their outputs without owning the receiver.
#[derive(Clone)]
pub struct ReceiverHandle {
    entity_tx: Sender<IngressEntity>,
    capacity: usize,
    closed: Arc<AtomicBool>,
}

impl ReceiverHandle {
    /// Enqueue a raw payload; silently dropped after close
    pub fn add_data(&self, data: Value) -> CepFlowResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.entity_tx
            .try_send(IngressEntity::Data(data))
            .map_err(|_| CepFlowError::queue_full("receiver", self.capacity))
    }

    fn add_event(&self, event: Event) -> CepFlowResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.entity_tx
            .try_send(IngressEntity::Event(event))
            .map_err(|_| CepFlowError::queue_full("receiver", self.capacity))
    }
}

impl ProducerSubscriber for ReceiverHandle {
    fn on_producer_update(&self, event: Event) -> CepFlowResult<()> {
        self.add_event(event)
    }
}

impl ForwarderSubscriber for ReceiverHandle {
    fn on_forwarder_update(&self, event: Event) -> CepFlowResult<()> {
        self.add_event(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::ids::{EpochTimestampGenerator, UniqueIdGenerator};
    use crate::util::null_event::{NoNullEvent, TimedNullEvent};
    use crate::util::validator::{AcceptAllValidator, PayloadKind, PayloadTypeValidator};
    use serde_json::json;
    use std::sync::Mutex;

    struct Collector {
        events: Mutex<Vec<Event>>,
    }

    impl Collector {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                events: Mutex::new(Vec::new()),
            })
        }

        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }
    }

    impl ReceiverSubscriber for Collector {
        fn on_receiver_update(&self, event: Event) -> CepFlowResult<()> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    fn receiver(config: &ReceiverConfig, validator: Box<dyn Validator>) -> Receiver {
        Receiver::new(
            config,
            validator,
            Arc::new(UniqueIdGenerator::new()),
            Arc::new(EpochTimestampGenerator),
            Box::new(NoNullEvent),
        )
    }

    #[test]
    fn test_wraps_raw_data_into_simple_event() {
        let mut recv = receiver(&ReceiverConfig::default(), Box::new(AcceptAllValidator));
        let collector = Collector::new();
        recv.subscribe(collector.clone());

        recv.add_data(json!(42)).unwrap();
        assert!(recv.update().unwrap());

        let events = collector.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::Simple { .. }));
        assert_eq!(events[0].data(), &json!(42));
        assert!(!events[0].event_id().is_empty());
    }

    #[test]
    fn test_invalid_payload_dropped() {
        let validator = PayloadTypeValidator::new(vec![PayloadKind::Number]);
        let mut recv = receiver(&ReceiverConfig::default(), Box::new(validator));
        let collector = Collector::new();
        recv.subscribe(collector.clone());

        recv.add_data(json!("not a number")).unwrap();
        assert!(!recv.update().unwrap());
        assert!(collector.events().is_empty());
    }

    #[test]
    fn test_queue_full_raises_and_preserves_queue() {
        let config = ReceiverConfig { max_size: 2 };
        let recv = receiver(&config, Box::new(AcceptAllValidator));

        recv.add_data(json!(1)).unwrap();
        recv.add_data(json!(2)).unwrap();
        let result = recv.add_data(json!(3));
        assert!(matches!(result, Err(CepFlowError::QueueFull { .. })));
        assert_eq!(recv.entity_rx.len(), 2);
    }

    #[test]
    fn test_null_event_generated_without_input() {
        let mut recv = Receiver::new(
            &ReceiverConfig::default(),
            Box::new(AcceptAllValidator),
            Arc::new(UniqueIdGenerator::new()),
            Arc::new(EpochTimestampGenerator),
            Box::new(TimedNullEvent::new(1, Box::new(EpochTimestampGenerator)).unwrap()),
        );
        let collector = Collector::new();
        recv.subscribe(collector.clone());

        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(recv.update().unwrap());
        assert_eq!(collector.events().len(), 1);
    }

    #[test]
    fn test_idle_tick_draws_no_event_id() {
        struct CountingIds {
            calls: std::sync::atomic::AtomicUsize,
        }

        impl crate::util::ids::EventIdGenerator for CountingIds {
            fn generate(&self) -> String {
                let n = self
                    .calls
                    .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                format!("id_{n}")
            }
        }

        let ids = Arc::new(CountingIds {
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let mut recv = Receiver::new(
            &ReceiverConfig::default(),
            Box::new(AcceptAllValidator),
            ids.clone(),
            Arc::new(EpochTimestampGenerator),
            Box::new(NoNullEvent),
        );

        assert!(!recv.update().unwrap());
        assert!(!recv.update().unwrap());
        assert_eq!(ids.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn test_close_drops_ingress_silently() {
        let mut recv = receiver(&ReceiverConfig::default(), Box::new(AcceptAllValidator));
        let collector = Collector::new();
        recv.subscribe(collector.clone());

        recv.close();
        recv.add_data(json!(1)).unwrap();
        assert!(!recv.update().unwrap());
        assert!(collector.events().is_empty());
        assert_eq!(recv.entity_rx.len(), 0);
    }

    #[test]
    fn test_feedback_event_passes_through() {
        let mut recv = receiver(&ReceiverConfig::default(), Box::new(AcceptAllValidator));
        let collector = Collector::new();
        recv.subscribe(collector.clone());

        let event = Event::simple("fb1", 100, json!(7)).unwrap();
        recv.handle().on_producer_update(event.clone()).unwrap();
        assert!(recv.update().unwrap());
        assert_eq!(collector.events(), vec![event]);
    }
}
