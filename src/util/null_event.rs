// SPDX-License-Identifier: MIT OR Apache-2.0

//! Null-event generation: synthetic heartbeats that let time-driven
//! transitions fire without real input

use crate::error::{CepFlowError, CepFlowResult};
use crate::event::Event;
use crate::util::ids::{EventIdGenerator, TimestampGenerator};
use serde_json::Value;
use std::time::{Duration, Instant};

/// Yields a synthetic event when the receiver should emit a heartbeat
///
/// An id is drawn from `event_id_gen` only when a heartbeat actually fires,
/// so idle ticks do not consume ids.
pub trait NullEventGenerator: Send {
    fn maybe_generate(&mut self, event_id_gen: &dyn EventIdGenerator) -> Option<Event>;
}

/// Emits a null event once the configured interval has elapsed since the
/// last emission
pub struct TimedNullEvent {
    interval: Duration,
    timestamp_gen: Box<dyn TimestampGenerator>,
    last_emit: Instant,
}

impl TimedNullEvent {
    /// A zero interval is rejected: it would make every receiver tick
    /// report progress, so a drain budget could never terminate.
    pub fn new(
        interval_ms: u64,
        timestamp_gen: Box<dyn TimestampGenerator>,
    ) -> CepFlowResult<Self> {
        if interval_ms == 0 {
            return Err(CepFlowError::invalid_parameter_with_name(
                "must be positive",
                "interval_ms",
            ));
        }
        Ok(Self {
            interval: Duration::from_millis(interval_ms),
            timestamp_gen,
            last_emit: Instant::now(),
        })
    }
}

impl NullEventGenerator for TimedNullEvent {
    fn maybe_generate(&mut self, event_id_gen: &dyn EventIdGenerator) -> Option<Event> {
        if self.last_emit.elapsed() < self.interval {
            return None;
        }
        self.last_emit = Instant::now();
        match Event::simple(
            event_id_gen.generate(),
            self.timestamp_gen.generate(),
            Value::Null,
        ) {
            Ok(event) => Some(event),
            Err(e) => {
                log::warn!("null event discarded: {e}");
                None
            }
        }
    }
}

/// Never generates a heartbeat
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNullEvent;

impl NullEventGenerator for NoNullEvent {
    fn maybe_generate(&mut self, _event_id_gen: &dyn EventIdGenerator) -> Option<Event> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::ids::{EpochTimestampGenerator, UniqueIdGenerator};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingIds {
        calls: AtomicUsize,
    }

    impl CountingIds {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl EventIdGenerator for CountingIds {
        fn generate(&self) -> String {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            format!("id_{n}")
        }
    }

    #[test]
    fn test_no_null_event() {
        let mut generator = NoNullEvent;
        assert!(generator.maybe_generate(&UniqueIdGenerator::new()).is_none());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result = TimedNullEvent::new(0, Box::new(EpochTimestampGenerator));
        assert!(matches!(result, Err(CepFlowError::InvalidParameter { .. })));
    }

    #[test]
    fn test_timed_null_event_waits_for_interval() {
        let mut generator =
            TimedNullEvent::new(10_000, Box::new(EpochTimestampGenerator)).unwrap();
        assert!(generator.maybe_generate(&UniqueIdGenerator::new()).is_none());
    }

    #[test]
    fn test_timed_null_event_fires_after_interval() {
        let mut generator = TimedNullEvent::new(1, Box::new(EpochTimestampGenerator)).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        let event = generator.maybe_generate(&UniqueIdGenerator::new()).unwrap();
        assert_eq!(event.data(), &Value::Null);
        assert!(!event.event_id().is_empty());
    }

    #[test]
    fn test_no_id_drawn_until_heartbeat_fires() {
        let ids = CountingIds::new();

        let mut quiet = NoNullEvent;
        assert!(quiet.maybe_generate(&ids).is_none());
        assert_eq!(ids.calls.load(Ordering::SeqCst), 0);

        let mut timed =
            TimedNullEvent::new(10_000, Box::new(EpochTimestampGenerator)).unwrap();
        assert!(timed.maybe_generate(&ids).is_none());
        assert_eq!(ids.calls.load(Ordering::SeqCst), 0);

        let mut due = TimedNullEvent::new(1, Box::new(EpochTimestampGenerator)).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert!(due.maybe_generate(&ids).is_some());
        assert_eq!(ids.calls.load(Ordering::SeqCst), 1);
    }
}
