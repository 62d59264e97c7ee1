//! Outbound message-ID allocation
//!
//! Message IDs only need to be unique enough to correlate request/response
//! pairs, so a single process-wide generator shared across connections is
//! sufficient. The reserved broadcast ID and zero are never issued.

use crate::BROADCAST_MESSAGE_ID;
use std::sync::atomic::{AtomicU32, Ordering};

/// Thread-safe sequential message-ID generator
#[derive(Debug)]
pub struct MessageIdGenerator {
    counter: AtomicU32,
}

impl MessageIdGenerator {
    /// New generator; the first [`next`](Self::next) returns 1.
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Generator whose next ID is `last_issued + 1`. Lets tests drive the
    /// counter to the reserved and wrap boundaries.
    pub fn starting_at(last_issued: u32) -> Self {
        Self {
            counter: AtomicU32::new(last_issued),
        }
    }

    /// Allocate the next outbound message ID, skipping the reserved
    /// broadcast value and re-seeding to 1 when the counter wraps to zero.
    pub fn next(&self) -> u32 {
        loop {
            let id = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
            if id == BROADCAST_MESSAGE_ID {
                continue;
            }
            if id == 0 {
                self.counter.store(1, Ordering::Relaxed);
                continue;
            }
            return id;
        }
    }
}

impl Default for MessageIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
