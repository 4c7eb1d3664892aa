// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event variants and match history

pub mod event;
pub mod history;

pub use event::Event;
pub use history::History;
