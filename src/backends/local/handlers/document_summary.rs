// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use super::{correlation_id, require_document_id};
use crate::errors::StageError;
use crate::events::payload::keys;
use crate::traits::{StageHandler, StageInput, StageOutput};

/// Summarizes a standardized document and records `document_summary_id`.
pub struct DocumentSummaryHandler;

impl DocumentSummaryHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DocumentSummaryHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StageHandler for DocumentSummaryHandler {
    async fn handle(&self, input: StageInput) -> Result<StageOutput, StageError> {
        let document_id = require_document_id(&input)?;
        Ok(StageOutput::new().with_metadata(
            keys::DOCUMENT_SUMMARY_ID,
            correlation_id(&document_id, self.name()),
        ))
    }

    fn name(&self) -> &'static str {
        "document_summary"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::local::handlers::test_support::completion_input;
    use crate::events::DetailType;
    use serde_json::json;

    #[tokio::test]
    async fn adds_stable_summary_id() {
        let input = completion_input(
            "document_summary",
            DetailType::BlockStandardizationCompleted,
            json!({ "document_id": "D1" }),
        );
        let output = DocumentSummaryHandler::new().handle(input).await.unwrap();
        assert_eq!(
            output.metadata[keys::DOCUMENT_SUMMARY_ID],
            json!(correlation_id("D1", "document_summary"))
        );
    }
}
