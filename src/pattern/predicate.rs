// SPDX-License-Identifier: MIT OR Apache-2.0

//! Predicates: pure boolean tests over an event and a run history
//!
//! A predicate must not mutate its inputs. The decider is single-threaded,
//! so a predicate is evaluated from at most one tick at a time; `Send + Sync`
//! bounds allow patterns to be shared across peers and worker threads.

use crate::event::{Event, History};
use crate::util::validator::PayloadKind;
use std::sync::Arc;

/// Pure boolean test over `(event, history)`
pub trait Predicate: Send + Sync {
    fn evaluate(&self, event: &Event, history: &History) -> bool;
}

impl<F> Predicate for F
where
    F: Fn(&Event, &History) -> bool + Send + Sync,
{
    fn evaluate(&self, event: &Event, history: &History) -> bool {
        self(event, history)
    }
}

/// Boxed closure predicate, for call sites that need a named type
pub struct ClosurePredicate {
    call: Box<dyn Fn(&Event, &History) -> bool + Send + Sync>,
}

impl ClosurePredicate {
    pub fn new(call: impl Fn(&Event, &History) -> bool + Send + Sync + 'static) -> Self {
        Self {
            call: Box::new(call),
        }
    }

    /// Predicate that matches every event
    pub fn always_true() -> Self {
        Self::new(|_, _| true)
    }
}

impl Predicate for ClosurePredicate {
    fn evaluate(&self, event: &Event, history: &History) -> bool {
        (self.call)(event, history)
    }
}

/// Type-guarded predicate: the inner predicate only runs when the event
/// payload is one of the allowed JSON kinds; otherwise the guard fails.
pub struct PayloadTypeGuard {
    allowed: Vec<PayloadKind>,
    inner: Arc<dyn Predicate>,
}

impl PayloadTypeGuard {
    pub fn new(allowed: Vec<PayloadKind>, inner: Arc<dyn Predicate>) -> Self {
        Self { allowed, inner }
    }
}

impl Predicate for PayloadTypeGuard {
    fn evaluate(&self, event: &Event, history: &History) -> bool {
        if !self.allowed.contains(&PayloadKind::of(event.data())) {
            return false;
        }
        self.inner.evaluate(event, history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn simple(data: Value) -> Event {
        Event::simple("e1", 100, data).unwrap()
    }

    #[test]
    fn test_closure_predicate() {
        let predicate = ClosurePredicate::new(|e, _| e.timestamp() > 50);
        assert!(predicate.evaluate(&simple(Value::Null), &History::new()));
    }

    #[test]
    fn test_fn_blanket_impl() {
        let predicate = |e: &Event, _: &History| e.data() == &json!(1);
        assert!(predicate.evaluate(&simple(json!(1)), &History::new()));
        assert!(!predicate.evaluate(&simple(json!(2)), &History::new()));
    }

    #[test]
    fn test_payload_type_guard_blocks_wrong_kind() {
        let guard = PayloadTypeGuard::new(
            vec![PayloadKind::Number],
            Arc::new(ClosurePredicate::always_true()),
        );
        assert!(guard.evaluate(&simple(json!(3)), &History::new()));
        assert!(!guard.evaluate(&simple(json!("text")), &History::new()));
    }

    #[test]
    fn test_predicate_can_inspect_history() {
        let predicate = ClosurePredicate::new(|_, h: &History| h.group("a").len() == 1);
        let mut history = History::new();
        assert!(!predicate.evaluate(&simple(Value::Null), &history));
        history.push("a", simple(Value::Null));
        assert!(predicate.evaluate(&simple(Value::Null), &history));
    }
}
