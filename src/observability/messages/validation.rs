// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for topology validation.
//!
//! This module contains message types for logging events related to:
//! * Validation start and outcome
//! * Routing cycle detection

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Completion events would route back into a stage that produced them.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use stitch_pipeline::observability::messages::validation::CyclicRoutingDetected;
///
/// let cycle = vec!["summary", "refinement", "summary"];
/// let msg = CyclicRoutingDetected {
///     cycle: &cycle,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct CyclicRoutingDetected<'a> {
    pub cycle: &'a [&'a str],
}

impl Display for CyclicRoutingDetected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Cyclic routing detected: {}", self.cycle.join(" -> "))
    }
}

impl StructuredLog for CyclicRoutingDetected<'_> {
    fn log(&self) {
        tracing::error!(
            cycle = self.cycle.join(" -> "),
            cycle_length = self.cycle.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            cycle = self.cycle.join(" -> "),
            cycle_length = self.cycle.len(),
        )
    }
}

/// Topology validation started.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct ValidationStarted {
    pub stage_count: usize,
    pub enabled_count: usize,
}

impl Display for ValidationStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Validating topology: {} stages ({} enabled)",
            self.stage_count, self.enabled_count
        )
    }
}

impl StructuredLog for ValidationStarted {
    fn log(&self) {
        tracing::debug!(
            stage_count = self.stage_count,
            enabled_count = self.enabled_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "validation",
            span_name = name,
            stage_count = self.stage_count,
            enabled_count = self.enabled_count,
        )
    }
}

/// Topology validation passed.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ValidationCompleted {
    pub stage_count: usize,
}

impl Display for ValidationCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Topology validated: {} stages", self.stage_count)
    }
}

impl StructuredLog for ValidationCompleted {
    fn log(&self) {
        tracing::info!(stage_count = self.stage_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("validation", span_name = name, stage_count = self.stage_count)
    }
}

/// Topology validation failed.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct ValidationFailed {
    pub error_count: usize,
}

impl Display for ValidationFailed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Topology validation failed with {} error(s)", self.error_count)
    }
}

impl StructuredLog for ValidationFailed {
    fn log(&self) {
        tracing::error!(error_count = self.error_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("validation", span_name = name, error_count = self.error_count)
    }
}
