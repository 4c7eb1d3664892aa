// SPDX-License-Identifier: MIT OR Apache-2.0

//! CepFlow: a complex event processing engine
//!
//! Events flow through a four-stage cooperative pipeline. The receiver
//! validates and wraps ingress data, the decider advances nondeterministic
//! pattern runs, the producer synthesizes complex events from completed
//! runs and the forwarder executes process actions. Complex and action
//! events feed back into the receiver, so patterns can match on the
//! engine's own outputs.
//!
//! An optional distribution layer exchanges encrypted decider snapshots
//! over TCP, keeping the run tables of a device cluster in step.
//!
//! ```no_run
//! use cepflow::engine::{Decider, DeciderConfig, Engine, EngineConfig, Forwarder,
//!     ForwarderConfig, Producer, ProducerConfig, Receiver, ReceiverConfig};
//! use cepflow::action::BlockingActionHandler;
//! use cepflow::event::{Event, History};
//! use cepflow::pattern::Pattern;
//! use cepflow::process::Process;
//! use cepflow::util::{AcceptAllValidator, EpochTimestampGenerator, NoNullEvent,
//!     UniqueIdGenerator};
//! use std::sync::Arc;
//!
//! # fn main() -> cepflow::error::CepFlowResult<()> {
//! let pattern = Pattern::builder("two_highs")
//!     .followed_by("first", |e: &Event, _: &History| e.data().as_i64() > Some(100))
//!     .followed_by("second", |e: &Event, _: &History| e.data().as_i64() > Some(100))
//!     .build()?;
//! let process = Arc::new(Process::new("alerts", vec![Arc::new(pattern)], None, None)?);
//!
//! let ids = Arc::new(UniqueIdGenerator::new());
//! let clock = Arc::new(EpochTimestampGenerator);
//!
//! let mut receiver = Receiver::new(
//!     &ReceiverConfig::default(),
//!     Box::new(AcceptAllValidator),
//!     ids.clone(),
//!     clock.clone(),
//!     Box::new(NoNullEvent),
//! );
//! let mut decider = Decider::new(&DeciderConfig::default(), vec![process.clone()], ids.clone())?;
//! let mut producer = Producer::new(
//!     &ProducerConfig::default(), vec![process.clone()], ids.clone(), clock.clone())?;
//! let forwarder = Forwarder::new(
//!     &ForwarderConfig::default(),
//!     vec![process],
//!     Box::new(BlockingActionHandler::new(255, ids, clock)),
//! )?;
//!
//! receiver.subscribe(Arc::new(decider.handle()));
//! decider.subscribe(Arc::new(producer.handle()));
//! producer.subscribe(Arc::new(forwarder.handle()));
//! producer.subscribe(Arc::new(receiver.handle()));
//!
//! let ingress = receiver.handle();
//! let mut engine = Engine::new(&EngineConfig::default(), receiver, decider, producer, forwarder);
//! ingress.add_data(serde_json::json!(120))?;
//! engine.update()?;
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod distributed;
pub mod engine;
pub mod error;
pub mod event;
pub mod pattern;
pub mod process;
pub mod run;
pub mod util;

pub use crate::error::{CepFlowError, CepFlowResult};
pub use crate::event::{Event, History};
pub use crate::pattern::{Pattern, PatternBuilder};
pub use crate::process::{Action, DataGenerator, Process};
pub use crate::run::{DeciderSnapshot, Run, RunOutcome, RunState, RunTuple};
