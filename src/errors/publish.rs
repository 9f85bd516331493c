// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::{EnvelopeError, QueueError};
use thiserror::Error;

/// Errors from `EventBus::publish`.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("envelope rejected: {0}")]
    InvalidEnvelope(#[from] EnvelopeError),

    /// A binding names a queue the bus was not wired with
    #[error("route '{route}' targets unknown queue '{queue}'")]
    UnknownQueue { route: String, queue: String },

    /// Two queues handed to the bus share a name
    #[error("queue '{0}' was registered more than once")]
    DuplicateQueue(String),

    #[error("enqueue onto '{queue}' failed: {source}")]
    Enqueue {
        queue: String,
        #[source]
        source: QueueError,
    },
}
