// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Every log line the pipeline emits is a small struct implementing
//! `Display` for the human-readable text and [`StructuredLog`] for the
//! `tracing` fields, so call sites never carry format strings.
//!
//! # Organization
//!
//! * `bus` - publish, rejection and unmatched-drop events
//! * `queue` - lease expiry, release, dead-letter and retention events
//! * `worker` - worker lifecycle and per-attempt outcomes
//! * `controller` - pipeline startup, stage wiring and shutdown
//! * `validation` - topology validation results
//!
//! # Usage Pattern
//!
//! ```rust
//! use stitch_pipeline::observability::messages::controller::StageRegistered;
//! use stitch_pipeline::observability::messages::StructuredLog;
//!
//! let msg = StageRegistered {
//!     stage: "document_extraction",
//!     queue: "docs-document_extraction-queue-dev",
//!     bindings: 2,
//!     workers: 2,
//! };
//!
//! msg.log();
//! ```

use tracing::Span;

pub mod bus;
pub mod controller;
pub mod queue;
pub mod validation;
pub mod worker;

/// A log message that knows its own level and structured fields.
pub trait StructuredLog {
    /// Emits the message as a `tracing` event at its level.
    fn log(&self);

    /// Opens a span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
