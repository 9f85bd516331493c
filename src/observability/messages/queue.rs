// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for work queue lease bookkeeping.
//!
//! This module contains message types for logging events related to:
//! * Leases lapsing without acknowledgment
//! * Voluntary releases after a failed attempt
//! * Items moved to the dead-letter sink, or kept back when it fails
//! * Retention purges

use crate::errors::QueueError;
use crate::events::EnvelopeId;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A lease's visibility window passed without acknowledgment.
///
/// # Log Level
/// `warn!` - Worker stalled or crashed mid-item
///
/// # Example
/// ```
/// use stitch_pipeline::events::EnvelopeId;
/// use stitch_pipeline::observability::messages::queue::LeaseExpired;
///
/// let id = EnvelopeId::new();
/// let msg = LeaseExpired {
///     queue: "extraction",
///     envelope_id: &id,
///     delivery_count: 1,
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct LeaseExpired<'a> {
    pub queue: &'a str,
    pub envelope_id: &'a EnvelopeId,
    pub delivery_count: u32,
}

impl Display for LeaseExpired<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Lease on envelope {} in queue '{}' expired after delivery {}; item is visible again",
            self.envelope_id, self.queue, self.delivery_count
        )
    }
}

impl StructuredLog for LeaseExpired<'_> {
    fn log(&self) {
        tracing::warn!(
            queue = self.queue,
            envelope_id = %self.envelope_id,
            delivery_count = self.delivery_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "lease_expired",
            span_name = name,
            queue = self.queue,
            envelope_id = %self.envelope_id,
        )
    }
}

/// A worker handed an item back for redelivery.
///
/// # Log Level
/// `info!` - Recoverable failure
pub struct ItemReleased<'a> {
    pub queue: &'a str,
    pub envelope_id: &'a EnvelopeId,
    pub delivery_count: u32,
    pub reason: &'a str,
}

impl Display for ItemReleased<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Released envelope {} back to queue '{}' after delivery {}: {}",
            self.envelope_id, self.queue, self.delivery_count, self.reason
        )
    }
}

impl StructuredLog for ItemReleased<'_> {
    fn log(&self) {
        tracing::info!(
            queue = self.queue,
            envelope_id = %self.envelope_id,
            delivery_count = self.delivery_count,
            reason = self.reason,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "released",
            span_name = name,
            queue = self.queue,
            envelope_id = %self.envelope_id,
        )
    }
}

/// An item exhausted its deliveries and went to the dead-letter sink.
///
/// # Log Level
/// `error!` - The document's pipeline stalls here
pub struct ItemDeadLettered<'a> {
    pub queue: &'a str,
    pub envelope_id: &'a EnvelopeId,
    pub delivery_count: u32,
    pub last_error: Option<&'a str>,
}

impl Display for ItemDeadLettered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Envelope {} in queue '{}' dead-lettered after {} deliveries (last error: {})",
            self.envelope_id,
            self.queue,
            self.delivery_count,
            self.last_error.unwrap_or("none")
        )
    }
}

impl StructuredLog for ItemDeadLettered<'_> {
    fn log(&self) {
        tracing::error!(
            queue = self.queue,
            envelope_id = %self.envelope_id,
            delivery_count = self.delivery_count,
            last_error = self.last_error.unwrap_or(""),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "dead_lettered",
            span_name = name,
            queue = self.queue,
            envelope_id = %self.envelope_id,
        )
    }
}

/// The dead-letter sink refused an exhausted item; it stays queued and the
/// lease moves on to the items behind it.
///
/// # Log Level
/// `error!` - The sink is unavailable
pub struct DeadLetterDeferred<'a> {
    pub queue: &'a str,
    pub envelope_id: &'a EnvelopeId,
    pub delivery_count: u32,
    pub error: &'a QueueError,
}

impl Display for DeadLetterDeferred<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Could not dead-letter envelope {} from queue '{}' after {} deliveries: {}",
            self.envelope_id, self.queue, self.delivery_count, self.error
        )
    }
}

impl StructuredLog for DeadLetterDeferred<'_> {
    fn log(&self) {
        tracing::error!(
            queue = self.queue,
            envelope_id = %self.envelope_id,
            delivery_count = self.delivery_count,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "dead_letter_deferred",
            span_name = name,
            queue = self.queue,
            envelope_id = %self.envelope_id,
        )
    }
}

/// Waiting items older than the retention horizon were dropped.
///
/// # Log Level
/// `warn!` - Data discarded
pub struct ItemsPurged<'a> {
    pub queue: &'a str,
    pub count: usize,
    pub retention: Duration,
}

impl Display for ItemsPurged<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Purged {} item(s) from queue '{}' older than {:?}",
            self.count, self.queue, self.retention
        )
    }
}

impl StructuredLog for ItemsPurged<'_> {
    fn log(&self) {
        tracing::warn!(
            queue = self.queue,
            count = self.count,
            retention_secs = self.retention.as_secs(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "purged",
            span_name = name,
            queue = self.queue,
            count = self.count,
        )
    }
}
