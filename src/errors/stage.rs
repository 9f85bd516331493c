// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Failure signal returned by a stage handler.
///
/// Every variant is treated the same by the worker pool: the lease is
/// released and nothing is published downstream.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("{0}")]
    Failed(String),

    #[error("invalid stage input: {0}")]
    InvalidInput(String),

    /// The handler output broke an envelope invariant (e.g. reassigning document_id)
    #[error("handler contract violated: {0}")]
    ContractViolation(String),
}

impl StageError {
    pub fn failed(message: impl Into<String>) -> Self {
        StageError::Failed(message.into())
    }
}
