// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::{PublishError, ValidationError};
use thiserror::Error;

/// Errors from wiring a pipeline out of a topology.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("topology is invalid:\n{}", .0.iter().map(|e| format!("  - {e}")).collect::<Vec<_>>().join("\n"))]
    InvalidTopology(Vec<ValidationError>),

    #[error("no handler registered under '{handler}' for stage '{stage}'")]
    MissingHandler { stage: String, handler: String },

    #[error("event bus could not be built: {0}")]
    Bus(#[from] PublishError),
}
