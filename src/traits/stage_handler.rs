// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::config::StageSecrets;
use crate::errors::StageError;
use crate::events::{DetailType, DocumentMetadata, EnvelopeId, EventEnvelope, Metadata};

/// The unit of work behind one pipeline stage.
///
/// Delivery is at-least-once, so `handle` may run more than once for the
/// same document and must be safe to repeat. Any `Err` (or running past
/// the stage's time budget) releases the lease for redelivery and publishes
/// nothing downstream.
#[async_trait]
pub trait StageHandler: Send + Sync {
    async fn handle(&self, input: StageInput) -> Result<StageOutput, StageError>;

    fn name(&self) -> &'static str;
}

/// Everything a handler gets to see about one delivery.
#[derive(Debug, Clone)]
pub struct StageInput {
    pub stage: String,
    pub envelope_id: EnvelopeId,
    pub source: String,
    pub detail_type: DetailType,
    pub detail: Value,
    pub metadata: Metadata,
    pub data: Value,
    /// 1 on first delivery
    pub delivery_count: u32,
    pub secrets: Arc<StageSecrets>,
}

impl StageInput {
    pub fn from_envelope(
        stage: impl Into<String>,
        envelope: &EventEnvelope,
        delivery_count: u32,
        secrets: Arc<StageSecrets>,
    ) -> Self {
        Self {
            stage: stage.into(),
            envelope_id: envelope.id(),
            source: envelope.source().to_string(),
            detail_type: envelope.detail_type().clone(),
            detail: envelope.detail().clone(),
            metadata: envelope.metadata().clone(),
            data: envelope.data().clone(),
            delivery_count,
            secrets,
        }
    }

    pub fn document_metadata(&self) -> Result<DocumentMetadata, StageError> {
        serde_json::from_value(Value::Object(self.metadata.clone()))
            .map_err(|e| StageError::InvalidInput(format!("metadata: {e}")))
    }

    pub fn document_id(&self) -> Option<&str> {
        self.metadata
            .get(crate::events::payload::keys::DOCUMENT_ID)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }
}

/// What a successful handler hands back: new metadata keys to merge and
/// the stage payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageOutput {
    pub metadata: Metadata,
    pub data: Value,
}

impl StageOutput {
    pub fn new() -> Self {
        Self {
            metadata: Metadata::new(),
            data: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if !self.data.is_object() {
            self.data = Value::Object(serde_json::Map::new());
        }
        if let Value::Object(map) = &mut self.data {
            map.insert(key.into(), value.into());
        }
        self
    }
}
