// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use super::correlation_id;
use crate::errors::StageError;
use crate::events::payload::keys;
use crate::traits::{StageHandler, StageInput, StageOutput};

/// Extracts the feature types listed in `metadata.feature_types`.
pub struct FeatureExtractionHandler;

impl FeatureExtractionHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FeatureExtractionHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StageHandler for FeatureExtractionHandler {
    async fn handle(&self, input: StageInput) -> Result<StageOutput, StageError> {
        let metadata = input.document_metadata()?;
        let document_id = metadata
            .document_id()
            .ok_or_else(|| StageError::InvalidInput("metadata.document_id is missing".to_string()))?;
        let feature_types = metadata.feature_types.clone().ok_or_else(|| {
            StageError::InvalidInput("metadata.feature_types is missing".to_string())
        })?;

        Ok(StageOutput::new()
            .with_metadata(keys::FEATURE_EXTRACTION_ID, correlation_id(document_id, self.name()))
            .with_data("extracted", feature_types))
    }

    fn name(&self) -> &'static str {
        "feature_extraction"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::local::handlers::test_support::completion_input;
    use crate::events::DetailType;
    use serde_json::json;

    #[tokio::test]
    async fn echoes_requested_features() {
        let input = completion_input(
            "feature_extraction",
            DetailType::BlockStandardizationCompleted,
            json!({ "document_id": "D1", "feature_types": ["tables"] }),
        );
        let output = FeatureExtractionHandler::new().handle(input).await.unwrap();
        assert_eq!(output.data["extracted"], json!(["tables"]));
        assert!(output.metadata.contains_key(keys::FEATURE_EXTRACTION_ID));
    }

    #[tokio::test]
    async fn missing_feature_types_is_invalid_input() {
        let input = completion_input(
            "feature_extraction",
            DetailType::BlockStandardizationCompleted,
            json!({ "document_id": "D1" }),
        );
        assert!(FeatureExtractionHandler::new().handle(input).await.is_err());
    }
}
