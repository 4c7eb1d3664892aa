// SPDX-License-Identifier: MIT OR Apache-2.0

//! Distribution layer: encrypted snapshot exchange between peers
//!
//! Wired into an engine as an extra task, the peer forwards the local
//! decider's snapshots to every device in the roster and feeds received
//! snapshots back into the decider, so the cluster's run tables converge.

pub mod crypto;
pub mod device;
pub mod message;
pub mod peer;

pub use crypto::FrameCrypto;
pub use device::{Device, DeviceRoster};
pub use message::PeerMessage;
pub use peer::{DistributedConfig, DistributedHandle, DistributedTcp};
