// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared utilities: id/timestamp generation, null-event heartbeats,
//! ingress validation and queue construction

pub mod ids;
pub mod null_event;
pub mod queue;
pub mod validator;

pub use ids::{
    unique_event_id, EpochTimestampGenerator, EventIdGenerator, TimestampGenerator,
    UniqueIdGenerator,
};
pub use null_event::{NoNullEvent, NullEventGenerator, TimedNullEvent};
pub use validator::{AcceptAllValidator, JsonValidator, PayloadKind, PayloadTypeValidator, Validator};
