// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use super::detail_type::DetailType;
use super::payload::{keys, DocumentMetadata, IngestionDetail, Metadata, StageData, StageStatus};
use crate::errors::EnvelopeError;

/// Globally unique envelope identifier, assigned at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvelopeId(Uuid);

impl EnvelopeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EnvelopeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EnvelopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The canonical message flowing through the pipeline.
///
/// Fields are read-only once built. The only change an envelope ever sees is
/// the event bus stamping `published_at` on its own copy during `publish`;
/// after that every queue receives an independent clone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    id: EnvelopeId,
    source: String,
    detail_type: DetailType,
    #[serde(default = "empty_object")]
    detail: Value,
    #[serde(default)]
    metadata: Metadata,
    #[serde(default = "empty_object")]
    data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    published_at: Option<DateTime<Utc>>,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

impl EventEnvelope {
    pub fn builder(source: impl Into<String>, detail_type: impl Into<DetailType>) -> EnvelopeBuilder {
        EnvelopeBuilder {
            source: source.into(),
            detail_type: detail_type.into(),
            detail: empty_object(),
            metadata: Metadata::new(),
            data: empty_object(),
        }
    }

    /// Storage notification that starts a document's pipeline.
    pub fn object_created(source: impl Into<String>, detail: &IngestionDetail) -> Self {
        // IngestionDetail only holds strings and integers
        let detail = serde_json::to_value(detail).unwrap_or_else(|_| empty_object());
        Self::builder(source, DetailType::ObjectCreated)
            .detail(detail)
            .build()
    }

    pub fn id(&self) -> EnvelopeId {
        self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn detail_type(&self) -> &DetailType {
        &self.detail_type
    }

    pub fn detail(&self) -> &Value {
        &self.detail
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    /// Non-empty `metadata.document_id`, read without a full parse.
    pub fn document_id(&self) -> Option<&str> {
        self.metadata
            .get(keys::DOCUMENT_ID)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    pub fn document_metadata(&self) -> Result<DocumentMetadata, EnvelopeError> {
        serde_json::from_value(Value::Object(self.metadata.clone())).map_err(|source| {
            EnvelopeError::InvalidMetadata {
                detail_type: self.detail_type.to_string(),
                source,
            }
        })
    }

    pub fn stage_data(&self) -> Result<StageData, EnvelopeError> {
        serde_json::from_value(self.data.clone()).map_err(|source| EnvelopeError::InvalidData {
            detail_type: self.detail_type.to_string(),
            source,
        })
    }

    pub fn ingestion_detail(&self) -> Result<IngestionDetail, EnvelopeError> {
        serde_json::from_value(self.detail.clone()).map_err(|source| {
            EnvelopeError::InvalidDetail {
                detail_type: self.detail_type.to_string(),
                source,
            }
        })
    }

    /// Checks the envelope against the typed payload for its kind.
    ///
    /// Ingestion kinds may omit `document_id`; `ObjectCreated` must name a
    /// bucket and key. Every other kind must carry a non-empty `document_id`
    /// and a `data.status`.
    pub fn validate(&self) -> Result<(), EnvelopeError> {
        if self.source.trim().is_empty() {
            return Err(EnvelopeError::EmptySource);
        }
        if self.detail_type.as_str().trim().is_empty() {
            return Err(EnvelopeError::EmptyDetailType);
        }

        let metadata = self.document_metadata()?;

        if self.detail_type.is_ingestion() {
            if self.detail_type == DetailType::ObjectCreated {
                self.ingestion_detail()?;
            }
            return Ok(());
        }

        if metadata.document_id().is_none() {
            return Err(EnvelopeError::MissingDocumentId {
                detail_type: self.detail_type.to_string(),
            });
        }
        self.stage_data()?;
        Ok(())
    }

    pub(crate) fn stamped(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }
}

/// Builder for [`EventEnvelope`]; assigns a fresh id on `build`.
#[derive(Debug, Clone)]
pub struct EnvelopeBuilder {
    source: String,
    detail_type: DetailType,
    detail: Value,
    metadata: Metadata,
    data: Value,
}

impl EnvelopeBuilder {
    pub fn detail(mut self, detail: Value) -> Self {
        self.detail = detail;
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn metadata_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Sets `data.status`, turning `data` into an object if it was not one.
    pub fn status(mut self, status: StageStatus) -> Self {
        if !self.data.is_object() {
            self.data = empty_object();
        }
        if let Value::Object(map) = &mut self.data {
            map.insert(keys::STATUS.to_string(), Value::from(status.as_str()));
        }
        self
    }

    pub fn build(self) -> EventEnvelope {
        EventEnvelope {
            id: EnvelopeId::new(),
            source: self.source,
            detail_type: self.detail_type,
            detail: self.detail,
            metadata: self.metadata,
            data: self.data,
            published_at: None,
        }
    }
}
