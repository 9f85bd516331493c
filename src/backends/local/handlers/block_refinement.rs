// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::errors::StageError;
use crate::traits::{StageHandler, StageInput, StageOutput};

/// Refines blocks using the document summary, so it needs
/// `document_summary_id` from the previous stage.
pub struct BlockRefinementHandler;

impl BlockRefinementHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BlockRefinementHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StageHandler for BlockRefinementHandler {
    async fn handle(&self, input: StageInput) -> Result<StageOutput, StageError> {
        let metadata = input.document_metadata()?;
        if metadata.document_id().is_none() {
            return Err(StageError::InvalidInput("metadata.document_id is missing".to_string()));
        }
        let summary_id = metadata.document_summary_id.ok_or_else(|| {
            StageError::InvalidInput("metadata.document_summary_id is missing".to_string())
        })?;
        Ok(StageOutput::new().with_data("refined_with_summary", summary_id))
    }

    fn name(&self) -> &'static str {
        "block_refinement"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::local::handlers::test_support::completion_input;
    use crate::events::DetailType;
    use serde_json::json;

    #[tokio::test]
    async fn uses_summary_id() {
        let input = completion_input(
            "block_refinement",
            DetailType::DocumentSummaryGenerated,
            json!({ "document_id": "D1", "document_summary_id": "S1" }),
        );
        let output = BlockRefinementHandler::new().handle(input).await.unwrap();
        assert_eq!(output.data["refined_with_summary"], json!("S1"));
    }

    #[tokio::test]
    async fn missing_summary_id_is_invalid_input() {
        let input = completion_input(
            "block_refinement",
            DetailType::DocumentSummaryGenerated,
            json!({ "document_id": "D1" }),
        );
        let err = BlockRefinementHandler::new().handle(input).await.unwrap_err();
        assert!(matches!(err, StageError::InvalidInput(_)));
    }
}
