// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inline action execution on the engine thread

use crate::action::{run_action, ActionHandler};
use crate::error::{CepFlowError, CepFlowResult};
use crate::event::Event;
use crate::process::Action;
use crate::util::ids::{EventIdGenerator, TimestampGenerator};
use crate::util::queue::stage_queue;
use crossbeam_channel::{Receiver as QueueReceiver, Sender};
use std::sync::Arc;

/// Executes each action synchronously before `handle` returns
///
/// Suited to fast actions; a slow action stalls the whole engine tick.
pub struct BlockingActionHandler {
    output_tx: Sender<Event>,
    output_rx: QueueReceiver<Event>,
    capacity: usize,
    event_id_gen: Arc<dyn EventIdGenerator>,
    timestamp_gen: Arc<dyn TimestampGenerator>,
}

impl BlockingActionHandler {
    pub fn new(
        max_size: usize,
        event_id_gen: Arc<dyn EventIdGenerator>,
        timestamp_gen: Arc<dyn TimestampGenerator>,
    ) -> Self {
        let (output_tx, output_rx) = stage_queue(max_size);
        Self {
            output_tx,
            output_rx,
            capacity: max_size,
            event_id_gen,
            timestamp_gen,
        }
    }
}

impl ActionHandler for BlockingActionHandler {
    fn handle(&self, action: Arc<dyn Action>, event: Event) -> CepFlowResult<()> {
        let action_event = run_action(
            action.as_ref(),
            &event,
            self.event_id_gen.as_ref(),
            self.timestamp_gen.as_ref(),
        )?;
        self.output_tx
            .try_send(action_event)
            .map_err(|_| CepFlowError::queue_full("action handler", self.capacity))
    }

    fn poll_action_event(&self) -> Option<Event> {
        self.output_rx.try_recv().ok()
    }

    fn pending(&self) -> usize {
        self.output_rx.len()
    }

    fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::tests::{complex_event, FixedAction};
    use crate::util::ids::{EpochTimestampGenerator, UniqueIdGenerator};
    use serde_json::json;

    fn handler(max_size: usize) -> BlockingActionHandler {
        BlockingActionHandler::new(
            max_size,
            Arc::new(UniqueIdGenerator::new()),
            Arc::new(EpochTimestampGenerator),
        )
    }

    #[test]
    fn test_executes_inline_and_queues_result() {
        let handler = handler(8);
        let action = Arc::new(FixedAction {
            name: "notify".to_string(),
            result: Ok(json!(true)),
        });

        handler.handle(action, complex_event()).unwrap();
        assert_eq!(handler.pending(), 1);

        let out = handler.poll_action_event().unwrap();
        assert!(matches!(out, Event::Action { success: true, .. }));
        assert!(handler.poll_action_event().is_none());
    }

    #[test]
    fn test_full_output_queue_raises() {
        let handler = handler(1);
        let action = Arc::new(FixedAction {
            name: "notify".to_string(),
            result: Ok(json!(1)),
        });

        handler.handle(action.clone(), complex_event()).unwrap();
        let result = handler.handle(action, complex_event());
        assert!(matches!(result, Err(CepFlowError::QueueFull { .. })));
    }
}
