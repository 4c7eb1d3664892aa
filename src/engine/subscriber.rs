// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability interfaces between pipeline stages
//!
//! Each publisher pushes to a set-once list of subscribers. Stages expose
//! cheap channel-backed handle structs implementing the traits they can
//! stand in for, so feedback edges (producer → receiver, forwarder →
//! receiver) carry non-owning references and no ownership cycle forms.

use crate::error::CepFlowResult;
use crate::event::Event;
use crate::run::{DeciderSnapshot, RunTuple};

/// Receives events admitted by the receiver
pub trait ReceiverSubscriber: Send + Sync {
    fn on_receiver_update(&self, event: Event) -> CepFlowResult<()>;
}

/// Receives the decider's three disjoint per-tick run lists
pub trait DeciderSubscriber: Send + Sync {
    fn on_decider_update(
        &self,
        halted_complete: &[RunTuple],
        halted_incomplete: &[RunTuple],
        updated: &[RunTuple],
    ) -> CepFlowResult<()>;
}

/// Receives complex events emitted by the producer
pub trait ProducerSubscriber: Send + Sync {
    fn on_producer_update(&self, event: Event) -> CepFlowResult<()>;
}

/// Receives action events published by the forwarder
pub trait ForwarderSubscriber: Send + Sync {
    fn on_forwarder_update(&self, event: Event) -> CepFlowResult<()>;
}

/// Receives run snapshots arriving from remote peers
pub trait DistributedSubscriber: Send + Sync {
    fn on_distributed_update(&self, snapshot: DeciderSnapshot) -> CepFlowResult<()>;
}
