// SPDX-License-Identifier: MIT OR Apache-2.0

//! Worker-pool action execution

use crate::action::{run_action, ActionHandler};
use crate::error::{CepFlowError, CepFlowResult};
use crate::event::Event;
use crate::process::Action;
use crate::util::ids::{EventIdGenerator, TimestampGenerator};
use crate::util::queue::stage_queue;
use crossbeam_channel::{unbounded, Receiver as QueueReceiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

type Job = (Arc<dyn Action>, Event);

/// Executes actions on a fixed pool of worker threads
///
/// `handle` enqueues and returns immediately; results surface through
/// `poll_action_event` in completion order. Closing drops the job channel
/// and joins every worker.
pub struct PooledActionHandler {
    job_tx: Option<Sender<Job>>,
    output_rx: QueueReceiver<Event>,
    workers: Vec<JoinHandle<()>>,
}

impl PooledActionHandler {
    pub fn new(
        workers: usize,
        max_size: usize,
        event_id_gen: Arc<dyn EventIdGenerator>,
        timestamp_gen: Arc<dyn TimestampGenerator>,
    ) -> CepFlowResult<Self> {
        if workers == 0 {
            return Err(CepFlowError::invalid_parameter_with_name(
                "must be at least 1",
                "workers",
            ));
        }
        let (job_tx, job_rx) = unbounded::<Job>();
        let (output_tx, output_rx) = stage_queue(max_size);

        let handles = (0..workers)
            .map(|i| {
                let job_rx = job_rx.clone();
                let output_tx = output_tx.clone();
                let event_id_gen = Arc::clone(&event_id_gen);
                let timestamp_gen = Arc::clone(&timestamp_gen);
                std::thread::Builder::new()
                    .name(format!("action-worker-{i}"))
                    .spawn(move || {
                        while let Ok((action, event)) = job_rx.recv() {
                            match run_action(
                                action.as_ref(),
                                &event,
                                event_id_gen.as_ref(),
                                timestamp_gen.as_ref(),
                            ) {
                                Ok(action_event) => {
                                    if output_tx.try_send(action_event).is_err() {
                                        log::error!(
                                            "action output queue full, dropping result of '{}'",
                                            action.name()
                                        );
                                    }
                                }
                                Err(e) => log::error!("action event construction failed: {e}"),
                            }
                        }
                    })
                    .map_err(CepFlowError::IoError)
            })
            .collect::<CepFlowResult<Vec<_>>>()?;

        Ok(Self {
            job_tx: Some(job_tx),
            output_rx,
            workers: handles,
        })
    }
}

impl ActionHandler for PooledActionHandler {
    fn handle(&self, action: Arc<dyn Action>, event: Event) -> CepFlowResult<()> {
        let Some(job_tx) = &self.job_tx else {
            return Err(CepFlowError::closed("action handler"));
        };
        job_tx
            .send((action, event))
            .map_err(|_| CepFlowError::closed("action handler"))
    }

    fn poll_action_event(&self) -> Option<Event> {
        self.output_rx.try_recv().ok()
    }

    fn pending(&self) -> usize {
        self.output_rx.len()
    }

    fn close(&mut self) {
        // Dropping the sender ends every worker's recv loop.
        self.job_tx = None;
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::error!("action worker panicked");
            }
        }
    }
}

impl Drop for PooledActionHandler {
    fn drop(&mut self) {
        self.close();
    }
}
