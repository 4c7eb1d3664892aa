// SPDX-License-Identifier: MIT OR Apache-2.0

//! Patterns: predicate-guarded block sequences compiled from the builder

pub mod block;
pub mod pattern;
pub mod predicate;

pub use block::Block;
pub use pattern::{Pattern, PatternBuilder};
pub use predicate::{ClosurePredicate, PayloadTypeGuard, Predicate};
