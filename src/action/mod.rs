// SPDX-License-Identifier: MIT OR Apache-2.0

//! Action execution handlers
//!
//! The forwarder hands `(action, complex event)` pairs to a handler and
//! later polls it for the resulting action events. Two strategies ship:
//! [`BlockingActionHandler`] executes inline on the engine thread, and
//! [`PooledActionHandler`] fans work out to a fixed worker pool so slow
//! actions cannot stall the pipeline.
//!
//! A failed action is never dropped: the handler emits an action event with
//! `success = false` and the error text as payload.

mod blocking;
mod pool;

pub use blocking::BlockingActionHandler;
pub use pool::PooledActionHandler;

use crate::error::CepFlowResult;
use crate::event::Event;
use crate::process::Action;
use crate::util::ids::{EventIdGenerator, TimestampGenerator};
use serde_json::Value;
use std::sync::Arc;

/// Execution strategy for process actions
pub trait ActionHandler: Send {
    /// Submit an action for the given complex event
    fn handle(&self, action: Arc<dyn Action>, event: Event) -> CepFlowResult<()>;

    /// Take one finished action event, if any
    fn poll_action_event(&self) -> Option<Event>;

    /// Number of finished action events awaiting collection
    fn pending(&self) -> usize;

    /// Stop accepting work; pooled handlers join their workers
    fn close(&mut self);
}

/// Execute an action and wrap the outcome into an action event
///
/// The complex event supplies the process and pattern names. Errors become
/// `success = false` with the error text as payload.
fn run_action(
    action: &dyn Action,
    event: &Event,
    event_id_gen: &dyn EventIdGenerator,
    timestamp_gen: &dyn TimestampGenerator,
) -> CepFlowResult<Event> {
    let (process_name, pattern_name) = match event {
        Event::Complex {
            process_name,
            pattern_name,
            ..
        } => (process_name.clone(), pattern_name.clone()),
        other => (other.event_id().to_string(), other.event_id().to_string()),
    };
    let (data, success) = match action.execute(event) {
        Ok(value) => (value, true),
        Err(e) => {
            log::error!("action '{}' failed: {e}", action.name());
            (Value::String(e.to_string()), false)
        }
    };
    Event::action(
        event_id_gen.generate(),
        timestamp_gen.generate(),
        data,
        process_name,
        pattern_name,
        action.name(),
        success,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CepFlowError;
    use crate::event::History;
    use crate::util::ids::{EpochTimestampGenerator, UniqueIdGenerator};
    use serde_json::json;

    pub(crate) struct FixedAction {
        pub name: String,
        pub result: Result<Value, String>,
    }

    impl Action for FixedAction {
        fn name(&self) -> &str {
            &self.name
        }

        fn execute(&self, _event: &Event) -> CepFlowResult<Value> {
            self.result
                .clone()
                .map_err(CepFlowError::system)
        }
    }

    pub(crate) fn complex_event() -> Event {
        Event::complex("c1", 100, json!(1), "proc", "pat", History::new()).unwrap()
    }

    #[test]
    fn test_run_action_success() {
        let action = FixedAction {
            name: "notify".to_string(),
            result: Ok(json!("done")),
        };
        let out = run_action(
            &action,
            &complex_event(),
            &UniqueIdGenerator::new(),
            &EpochTimestampGenerator,
        )
        .unwrap();

        let Event::Action {
            data,
            process_name,
            pattern_name,
            action_name,
            success,
            ..
        } = out
        else {
            panic!("expected an action event");
        };
        assert_eq!(data, json!("done"));
        assert_eq!(process_name, "proc");
        assert_eq!(pattern_name, "pat");
        assert_eq!(action_name, "notify");
        assert!(success);
    }

    #[test]
    fn test_run_action_failure_becomes_unsuccessful_event() {
        let action = FixedAction {
            name: "notify".to_string(),
            result: Err("endpoint unreachable".to_string()),
        };
        let out = run_action(
            &action,
            &complex_event(),
            &UniqueIdGenerator::new(),
            &EpochTimestampGenerator,
        )
        .unwrap();

        let Event::Action { data, success, .. } = out else {
            panic!("expected an action event");
        };
        assert!(!success);
        assert!(data.as_str().unwrap().contains("endpoint unreachable"));
    }
}
