// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Typed views over the string-keyed envelope maps.
//!
//! Envelopes keep `metadata`, `data` and `detail` as JSON so route patterns
//! can address arbitrary nested paths. These structs are what the bus
//! validates against and what handlers read instead of poking at raw keys.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Insertion-ordered string-keyed map carried in `metadata`.
pub type Metadata = serde_json::Map<String, Value>;

pub mod keys {
    pub const DOCUMENT_ID: &str = "document_id";
    pub const DOCUMENT_SUMMARY_ID: &str = "document_summary_id";
    pub const SEED_QUESTIONS_ID: &str = "seed_questions_id";
    pub const FEATURE_EXTRACTION_ID: &str = "feature_extraction_id";
    pub const SEED_QUESTIONS_LIST: &str = "seed_questions_list";
    pub const FEATURE_TYPES: &str = "feature_types";
    pub const STATUS: &str = "status";
}

/// Outcome recorded in `data.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageStatus {
    Completed,
    Failed,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Completed => "COMPLETED",
            StageStatus::Failed => "FAILED",
        }
    }
}

/// Identifiers that travel with a document through every stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_summary_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_questions_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_extraction_id: Option<String>,
    /// Requested seed questions; its presence routes to the seed-questions stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_questions_list: Option<Value>,
    /// Requested feature types; its presence routes to the feature-extraction stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_types: Option<Value>,
    #[serde(flatten)]
    pub extra: Metadata,
}

impl DocumentMetadata {
    /// The document id, if present and non-empty.
    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Stage payload; `status` is the only mandatory field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageData {
    pub status: StageStatus,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl StageData {
    pub fn completed() -> Self {
        Self {
            status: StageStatus::Completed,
            extra: serde_json::Map::new(),
        }
    }
}

/// The part of a storage `ObjectCreated` notification the core routes on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionDetail {
    pub bucket: BucketRef,
    pub object: ObjectRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl IngestionDetail {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: BucketRef { name: bucket.into() },
            object: ObjectRef {
                key: key.into(),
                size: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_metadata_keeps_unknown_keys() {
        let raw = json!({
            "document_id": "D1",
            "feature_types": ["tables"],
            "tenant": "acme"
        });
        let parsed: DocumentMetadata = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.document_id(), Some("D1"));
        assert!(parsed.feature_types.is_some());
        assert!(parsed.seed_questions_list.is_none());
        assert_eq!(parsed.extra.get("tenant"), Some(&json!("acme")));
    }

    #[test]
    fn empty_document_id_is_treated_as_absent() {
        let parsed: DocumentMetadata =
            serde_json::from_value(json!({ "document_id": "" })).unwrap();
        assert_eq!(parsed.document_id(), None);
    }

    #[test]
    fn stage_data_requires_known_status() {
        assert!(serde_json::from_value::<StageData>(json!({ "status": "COMPLETED" })).is_ok());
        assert!(serde_json::from_value::<StageData>(json!({ "status": "DONE" })).is_err());
        assert!(serde_json::from_value::<StageData>(json!({})).is_err());
    }
}
