// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stage queue construction
//!
//! Every inter-stage queue is a crossbeam channel. `max_size == 0` selects
//! an unbounded channel; otherwise the channel is bounded and a full-queue
//! `try_send` surfaces as a QueueFull error at the producer.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

/// Create a channel honoring the `max_size` convention (0 = unbounded)
pub fn stage_queue<T>(max_size: usize) -> (Sender<T>, Receiver<T>) {
    if max_size == 0 {
        unbounded()
    } else {
        bounded(max_size)
    }
}
