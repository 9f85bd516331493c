// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::queue::ReceiptHandle;
use thiserror::Error;

/// Errors returned by work queues and dead-letter sinks.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The handle does not refer to a live lease. The item is owned by
    /// another worker or already resolved; callers ignore this.
    #[error("receipt handle {0} does not refer to a live lease")]
    InvalidLease(ReceiptHandle),

    #[error("dead-letter sink failed for queue '{queue}': {reason}")]
    DeadLetter { queue: String, reason: String },

    #[error("dead-letter sink I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("dead-letter record could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl QueueError {
    pub fn is_invalid_lease(&self) -> bool {
        matches!(self, QueueError::InvalidLease(_))
    }
}
