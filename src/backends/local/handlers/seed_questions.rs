// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;

use super::correlation_id;
use crate::errors::StageError;
use crate::events::payload::keys;
use crate::traits::{StageHandler, StageInput, StageOutput};

/// Generates seed questions for documents that asked for them via
/// `metadata.seed_questions_list`.
pub struct SeedQuestionsHandler;

impl SeedQuestionsHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SeedQuestionsHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StageHandler for SeedQuestionsHandler {
    async fn handle(&self, input: StageInput) -> Result<StageOutput, StageError> {
        let metadata = input.document_metadata()?;
        let document_id = metadata
            .document_id()
            .ok_or_else(|| StageError::InvalidInput("metadata.document_id is missing".to_string()))?;
        let questions = metadata.seed_questions_list.as_ref().ok_or_else(|| {
            StageError::InvalidInput("metadata.seed_questions_list is missing".to_string())
        })?;
        let question_count = match questions {
            Value::Array(items) => items.len(),
            Value::Null => 0,
            _ => 1,
        };

        Ok(StageOutput::new()
            .with_metadata(keys::SEED_QUESTIONS_ID, correlation_id(document_id, self.name()))
            .with_data("question_count", question_count))
    }

    fn name(&self) -> &'static str {
        "seed_questions"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::local::handlers::test_support::completion_input;
    use crate::events::DetailType;
    use serde_json::json;

    #[tokio::test]
    async fn counts_requested_questions() {
        let input = completion_input(
            "seed_questions",
            DetailType::BlockStandardizationCompleted,
            json!({ "document_id": "D1", "seed_questions_list": ["why?", "how?"] }),
        );
        let output = SeedQuestionsHandler::new().handle(input).await.unwrap();
        assert_eq!(output.data["question_count"], json!(2));
        assert_eq!(
            output.metadata[keys::SEED_QUESTIONS_ID],
            json!(correlation_id("D1", "seed_questions"))
        );
    }
}
