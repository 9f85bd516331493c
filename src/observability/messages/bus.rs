// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for event bus publishing.

use crate::errors::EnvelopeError;
use crate::events::EnvelopeId;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Envelope enqueued onto every matching destination.
///
/// # Log Level
/// `debug!` - Per-event detail
pub struct EnvelopePublished<'a> {
    pub envelope_id: &'a EnvelopeId,
    pub detail_type: &'a str,
    pub document_id: Option<&'a str>,
    pub destinations: &'a [String],
}

impl Display for EnvelopePublished<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Published {} envelope {} to {} queue(s): {}",
            self.detail_type,
            self.envelope_id,
            self.destinations.len(),
            self.destinations.join(", ")
        )
    }
}

impl StructuredLog for EnvelopePublished<'_> {
    fn log(&self) {
        tracing::debug!(
            envelope_id = %self.envelope_id,
            detail_type = self.detail_type,
            document_id = self.document_id.unwrap_or(""),
            destinations = self.destinations.join(","),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "publish",
            span_name = name,
            envelope_id = %self.envelope_id,
            detail_type = self.detail_type,
        )
    }
}

/// No route binding matched, so the envelope was dropped.
///
/// Expected traffic (e.g. uploads outside the watched prefix), not an error.
///
/// # Log Level
/// `info!` - Operational event
pub struct EnvelopeUnmatched<'a> {
    pub envelope_id: &'a EnvelopeId,
    pub source: &'a str,
    pub detail_type: &'a str,
}

impl Display for EnvelopeUnmatched<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "No route matched {} envelope {} from '{}'; dropping",
            self.detail_type, self.envelope_id, self.source
        )
    }
}

impl StructuredLog for EnvelopeUnmatched<'_> {
    fn log(&self) {
        tracing::info!(
            envelope_id = %self.envelope_id,
            source = self.source,
            detail_type = self.detail_type,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "unmatched",
            span_name = name,
            envelope_id = %self.envelope_id,
            detail_type = self.detail_type,
        )
    }
}

/// Envelope failed boundary validation and was not routed.
///
/// # Log Level
/// `warn!` - Publisher bug or malformed input
pub struct EnvelopeRejected<'a> {
    pub envelope_id: &'a EnvelopeId,
    pub source: &'a str,
    pub detail_type: &'a str,
    pub error: &'a EnvelopeError,
}

impl Display for EnvelopeRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Rejected envelope {} from '{}': {}",
            self.envelope_id, self.source, self.error
        )
    }
}

impl StructuredLog for EnvelopeRejected<'_> {
    fn log(&self) {
        tracing::warn!(
            envelope_id = %self.envelope_id,
            source = self.source,
            detail_type = self.detail_type,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "rejected",
            span_name = name,
            envelope_id = %self.envelope_id,
            detail_type = self.detail_type,
        )
    }
}
