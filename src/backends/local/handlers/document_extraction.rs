// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use crate::errors::StageError;
use crate::events::payload::keys;
use crate::events::{DetailType, IngestionDetail};
use crate::traits::{StageHandler, StageInput, StageOutput};

/// First stage: turns an upload (or a manual restart) into a tracked
/// document.
///
/// The `document_id` is minted here and nowhere else. Uploads get a UUID v5
/// of `s3://bucket/key`, so the same object always maps to the same
/// document; a restart that already carries a `document_id` keeps it.
pub struct DocumentExtractionHandler;

impl DocumentExtractionHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn document_id_for(bucket: &str, key: &str) -> String {
        Uuid::new_v5(&Uuid::NAMESPACE_URL, format!("s3://{bucket}/{key}").as_bytes()).to_string()
    }
}

impl Default for DocumentExtractionHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StageHandler for DocumentExtractionHandler {
    async fn handle(&self, input: StageInput) -> Result<StageOutput, StageError> {
        let upload = match input.detail_type {
            DetailType::ObjectCreated => Some(
                serde_json::from_value::<IngestionDetail>(input.detail.clone())
                    .map_err(|e| StageError::InvalidInput(format!("upload detail: {e}")))?,
            ),
            _ => serde_json::from_value::<IngestionDetail>(input.detail.clone()).ok(),
        };

        let document_id = match (input.document_id(), &upload) {
            (Some(existing), _) => existing.to_string(),
            (None, Some(upload)) => Self::document_id_for(&upload.bucket.name, &upload.object.key),
            (None, None) => {
                return Err(StageError::InvalidInput(
                    "restart needs metadata.document_id or an upload detail".to_string(),
                ))
            }
        };

        let mut output = StageOutput::new().with_metadata(keys::DOCUMENT_ID, document_id);
        if let Some(upload) = upload {
            output = output
                .with_data("source", json!({ "bucket": upload.bucket.name, "key": upload.object.key }));
        }
        Ok(output)
    }

    fn name(&self) -> &'static str {
        "document_extraction"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StageSecrets;
    use crate::events::EventEnvelope;
    use std::sync::Arc;

    fn input(envelope: &EventEnvelope) -> StageInput {
        StageInput::from_envelope("document_extraction", envelope, 1, Arc::new(StageSecrets::default()))
    }

    #[tokio::test]
    async fn upload_gets_deterministic_document_id() {
        let envelope = EventEnvelope::object_created("storage", &IngestionDetail::new("docs", "jdtest/a.pdf"));
        let handler = DocumentExtractionHandler::new();

        let first = handler.handle(input(&envelope)).await.unwrap();
        let second = handler.handle(input(&envelope)).await.unwrap();

        let expected = DocumentExtractionHandler::document_id_for("docs", "jdtest/a.pdf");
        assert_eq!(first.metadata[keys::DOCUMENT_ID], json!(expected));
        assert_eq!(first, second);
        assert_eq!(first.data["source"]["key"], json!("jdtest/a.pdf"));
    }

    #[tokio::test]
    async fn restart_keeps_existing_document_id() {
        let envelope = EventEnvelope::builder("stitch.orchestration", DetailType::StartOrchestration)
            .metadata_entry(keys::DOCUMENT_ID, "D1")
            .build();
        let output = DocumentExtractionHandler::new().handle(input(&envelope)).await.unwrap();
        assert_eq!(output.metadata[keys::DOCUMENT_ID], json!("D1"));
    }

    #[tokio::test]
    async fn restart_without_any_identity_is_rejected() {
        let envelope = EventEnvelope::builder("stitch.orchestration", DetailType::StartOrchestration).build();
        let err = DocumentExtractionHandler::new().handle(input(&envelope)).await.unwrap_err();
        assert!(matches!(err, StageError::InvalidInput(_)));
    }
}
