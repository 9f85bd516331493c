// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for stage worker lifecycle and per-attempt outcomes.
//!
//! This module contains message types for logging events related to:
//! * Worker start and stop
//! * Handler attempts that completed, failed or ran out of time
//! * Completion envelopes that could not be published
//! * Acknowledgments that lost their lease

use crate::errors::{PublishError, QueueError};
use crate::events::EnvelopeId;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A worker began polling its stage queue.
///
/// # Log Level
/// `debug!` - Diagnostic detail
///
/// # Example
/// ```
/// use stitch_pipeline::observability::messages::worker::WorkerStarted;
///
/// let msg = WorkerStarted {
///     stage: "document_summary",
///     worker: 0,
/// };
///
/// tracing::debug!("{}", msg);
/// ```
pub struct WorkerStarted<'a> {
    pub stage: &'a str,
    pub worker: usize,
}

impl Display for WorkerStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Worker {} for stage '{}' started", self.worker, self.stage)
    }
}

impl StructuredLog for WorkerStarted<'_> {
    fn log(&self) {
        tracing::debug!(stage = self.stage, worker = self.worker, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "stage_worker",
            span_name = name,
            stage = self.stage,
            worker = self.worker,
        )
    }
}

/// A worker left its loop after cancellation.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct WorkerStopped<'a> {
    pub stage: &'a str,
    pub worker: usize,
    pub completed: u64,
    pub failed: u64,
}

impl Display for WorkerStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Worker {} for stage '{}' stopped ({} completed, {} failed)",
            self.worker, self.stage, self.completed, self.failed
        )
    }
}

impl StructuredLog for WorkerStopped<'_> {
    fn log(&self) {
        tracing::debug!(
            stage = self.stage,
            worker = self.worker,
            completed = self.completed,
            failed = self.failed,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "stage_worker",
            span_name = name,
            stage = self.stage,
            worker = self.worker,
        )
    }
}

/// The handler succeeded and its completion envelope was published.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use std::time::Duration;
/// use stitch_pipeline::events::EnvelopeId;
/// use stitch_pipeline::observability::messages::worker::AttemptCompleted;
///
/// let id = EnvelopeId::new();
/// let destinations = vec!["stitch-document_summary-queue-dev".to_string()];
/// let msg = AttemptCompleted {
///     stage: "block_standardization",
///     envelope_id: &id,
///     document_id: Some("D1"),
///     delivery_count: 1,
///     duration: Duration::from_millis(12),
///     destinations: &destinations,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct AttemptCompleted<'a> {
    pub stage: &'a str,
    pub envelope_id: &'a EnvelopeId,
    pub document_id: Option<&'a str>,
    pub delivery_count: u32,
    pub duration: Duration,
    pub destinations: &'a [String],
}

impl Display for AttemptCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stage '{}' completed envelope {} in {:?} (delivery {}, routed to {} queue(s))",
            self.stage,
            self.envelope_id,
            self.duration,
            self.delivery_count,
            self.destinations.len()
        )
    }
}

impl StructuredLog for AttemptCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            stage = self.stage,
            envelope_id = %self.envelope_id,
            document_id = self.document_id.unwrap_or(""),
            delivery_count = self.delivery_count,
            duration_ms = self.duration.as_millis() as u64,
            destinations = self.destinations.join(","),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "stage_attempt",
            span_name = name,
            stage = self.stage,
            envelope_id = %self.envelope_id,
            delivery_count = self.delivery_count,
        )
    }
}

/// The handler returned an error; the lease was released.
///
/// # Log Level
/// `warn!` - Recoverable failure
pub struct AttemptFailed<'a> {
    pub stage: &'a str,
    pub envelope_id: &'a EnvelopeId,
    pub delivery_count: u32,
    pub error: &'a str,
}

impl Display for AttemptFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stage '{}' failed envelope {} on delivery {}: {}",
            self.stage, self.envelope_id, self.delivery_count, self.error
        )
    }
}

impl StructuredLog for AttemptFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            stage = self.stage,
            envelope_id = %self.envelope_id,
            delivery_count = self.delivery_count,
            error = self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "stage_attempt",
            span_name = name,
            stage = self.stage,
            envelope_id = %self.envelope_id,
            delivery_count = self.delivery_count,
        )
    }
}

/// The handler ran past its time budget and was dropped.
///
/// # Log Level
/// `warn!` - Recoverable failure
pub struct AttemptTimedOut<'a> {
    pub stage: &'a str,
    pub envelope_id: &'a EnvelopeId,
    pub delivery_count: u32,
    pub budget: Duration,
}

impl Display for AttemptTimedOut<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stage '{}' exceeded its {:?} budget on envelope {} (delivery {})",
            self.stage, self.budget, self.envelope_id, self.delivery_count
        )
    }
}

impl StructuredLog for AttemptTimedOut<'_> {
    fn log(&self) {
        tracing::warn!(
            stage = self.stage,
            envelope_id = %self.envelope_id,
            delivery_count = self.delivery_count,
            budget_ms = self.budget.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "stage_attempt",
            span_name = name,
            stage = self.stage,
            envelope_id = %self.envelope_id,
        )
    }
}

/// The handler succeeded but its completion envelope could not be
/// published; the lease was released so the attempt is retried.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct CompletionPublishFailed<'a> {
    pub stage: &'a str,
    pub envelope_id: &'a EnvelopeId,
    pub error: &'a PublishError,
}

impl Display for CompletionPublishFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stage '{}' could not publish completion for envelope {}: {}",
            self.stage, self.envelope_id, self.error
        )
    }
}

impl StructuredLog for CompletionPublishFailed<'_> {
    fn log(&self) {
        tracing::error!(
            stage = self.stage,
            envelope_id = %self.envelope_id,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "stage_attempt",
            span_name = name,
            stage = self.stage,
            envelope_id = %self.envelope_id,
        )
    }
}

/// Acknowledge or release found the lease already gone. Another worker
/// owns or finished the item; nothing to do.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct StaleLeaseIgnored<'a> {
    pub stage: &'a str,
    pub envelope_id: &'a EnvelopeId,
    pub operation: &'static str,
}

impl Display for StaleLeaseIgnored<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stage '{}' ignored stale lease on {} for envelope {}",
            self.stage, self.operation, self.envelope_id
        )
    }
}

impl StructuredLog for StaleLeaseIgnored<'_> {
    fn log(&self) {
        tracing::debug!(
            stage = self.stage,
            envelope_id = %self.envelope_id,
            operation = self.operation,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "stage_attempt",
            span_name = name,
            stage = self.stage,
            envelope_id = %self.envelope_id,
        )
    }
}

/// A lease, acknowledge or release call failed for a reason other than a
/// stale lease. The worker backs off and polls again.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct QueueOperationFailed<'a> {
    pub stage: &'a str,
    pub queue: &'a str,
    pub error: &'a QueueError,
}

impl Display for QueueOperationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stage '{}' queue '{}' operation failed: {}",
            self.stage, self.queue, self.error
        )
    }
}

impl StructuredLog for QueueOperationFailed<'_> {
    fn log(&self) {
        tracing::error!(
            stage = self.stage,
            queue = self.queue,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "stage_worker",
            span_name = name,
            stage = self.stage,
            queue = self.queue,
        )
    }
}
