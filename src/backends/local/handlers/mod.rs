// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Stub handlers for the production stages.
//!
//! They do no document work; they derive the identifiers each stage is
//! responsible for and pass the document along. Every id is a UUID v5 of
//! stable inputs, so re-running a handler on redelivery yields the same
//! output.

pub mod block_refinement;
pub mod block_standardization;
pub mod document_extraction;
pub mod document_summary;
pub mod feature_extraction;
pub mod seed_questions;

pub use block_refinement::BlockRefinementHandler;
pub use block_standardization::BlockStandardizationHandler;
pub use document_extraction::DocumentExtractionHandler;
pub use document_summary::DocumentSummaryHandler;
pub use feature_extraction::FeatureExtractionHandler;
pub use seed_questions::SeedQuestionsHandler;

use uuid::Uuid;

use crate::errors::StageError;
use crate::traits::StageInput;

/// Deterministic id for what `stage` produced for `document_id`.
pub fn correlation_id(document_id: &str, stage: &str) -> String {
    Uuid::new_v5(
        &Uuid::NAMESPACE_URL,
        format!("stitch:{document_id}/{stage}").as_bytes(),
    )
    .to_string()
}

pub(crate) fn require_document_id(input: &StageInput) -> Result<String, StageError> {
    input
        .document_id()
        .map(str::to_string)
        .ok_or_else(|| StageError::InvalidInput("metadata.document_id is missing".to_string()))
}
