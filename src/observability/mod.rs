// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging.
//!
//! Every diagnostic and operational log line in the pipeline is a message
//! struct with a `Display` implementation and a [`messages::StructuredLog`]
//! implementation, so:
//!
//! * format strings live next to the fields they describe
//! * each message carries its own level
//! * call sites stay one line long
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::bus` - publish, rejection and unmatched-drop events
//! * `messages::queue` - lease expiry, release, dead-letter and purge events
//! * `messages::worker` - worker lifecycle and attempt outcomes
//! * `messages::controller` - stage wiring, startup and shutdown
//! * `messages::validation` - topology validation results
//!
//! # Usage
//!
//! ```rust
//! use stitch_pipeline::events::EnvelopeId;
//! use stitch_pipeline::observability::messages::worker::AttemptFailed;
//!
//! let id = EnvelopeId::new();
//! let msg = AttemptFailed {
//!     stage: "document_summary",
//!     envelope_id: &id,
//!     delivery_count: 2,
//!     error: "upstream model timed out",
//! };
//!
//! tracing::warn!("{}", msg);
//! ```

pub mod messages;
