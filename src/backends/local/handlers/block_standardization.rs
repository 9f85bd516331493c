// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use super::require_document_id;
use crate::errors::StageError;
use crate::traits::{StageHandler, StageInput, StageOutput};

/// Normalizes extracted blocks. Adds no identifiers of its own.
pub struct BlockStandardizationHandler;

impl BlockStandardizationHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BlockStandardizationHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StageHandler for BlockStandardizationHandler {
    async fn handle(&self, input: StageInput) -> Result<StageOutput, StageError> {
        require_document_id(&input)?;
        Ok(StageOutput::new().with_data("standardized", true))
    }

    fn name(&self) -> &'static str {
        "block_standardization"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::local::handlers::test_support::completion_input;
    use crate::events::DetailType;
    use serde_json::json;

    #[tokio::test]
    async fn passes_document_through() {
        let input = completion_input(
            "block_standardization",
            DetailType::DocumentExtractionCompleted,
            json!({ "document_id": "D1" }),
        );
        let output = BlockStandardizationHandler::new().handle(input).await.unwrap();
        assert!(output.metadata.is_empty());
        assert_eq!(output.data["standardized"], json!(true));
    }

    #[tokio::test]
    async fn requires_document_id() {
        let input = completion_input(
            "block_standardization",
            DetailType::DocumentExtractionCompleted,
            json!({}),
        );
        assert!(BlockStandardizationHandler::new().handle(input).await.is_err());
    }
}
