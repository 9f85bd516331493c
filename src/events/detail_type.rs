// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic kind of an event.
///
/// Known kinds get their own variant; anything else round-trips through
/// `Custom` so a routing table can still name it. Serialized as a plain
/// string, e.g. `"DocumentExtractionCompleted"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DetailType {
    /// Storage notification for a newly written object
    ObjectCreated,
    /// Manual (re)start of a document's pipeline
    StartOrchestration,
    DocumentExtractionCompleted,
    BlockStandardizationCompleted,
    DocumentSummaryGenerated,
    BlockRefinementCompleted,
    SeedQuestionsGenerated,
    FeatureExtractionCompleted,
    SplitFileCompleted,
    TextExtractSyncCompleted,
    Custom(String),
}

impl DetailType {
    pub fn as_str(&self) -> &str {
        match self {
            DetailType::ObjectCreated => "ObjectCreated",
            DetailType::StartOrchestration => "StartOrchestration",
            DetailType::DocumentExtractionCompleted => "DocumentExtractionCompleted",
            DetailType::BlockStandardizationCompleted => "BlockStandardizationCompleted",
            DetailType::DocumentSummaryGenerated => "DocumentSummaryGenerated",
            DetailType::BlockRefinementCompleted => "BlockRefinementCompleted",
            DetailType::SeedQuestionsGenerated => "SeedQuestionsGenerated",
            DetailType::FeatureExtractionCompleted => "FeatureExtractionCompleted",
            DetailType::SplitFileCompleted => "SplitFileCompleted",
            DetailType::TextExtractSyncCompleted => "TextExtractSyncCompleted",
            DetailType::Custom(value) => value,
        }
    }

    /// Ingestion kinds start a document's pipeline and are the only ones
    /// allowed to arrive without a `document_id`.
    pub fn is_ingestion(&self) -> bool {
        matches!(
            self,
            DetailType::ObjectCreated | DetailType::StartOrchestration
        )
    }
}

impl From<&str> for DetailType {
    fn from(value: &str) -> Self {
        match value {
            // storage notifications spell it with a space
            "ObjectCreated" | "Object Created" => DetailType::ObjectCreated,
            "StartOrchestration" => DetailType::StartOrchestration,
            "DocumentExtractionCompleted" => DetailType::DocumentExtractionCompleted,
            "BlockStandardizationCompleted" => DetailType::BlockStandardizationCompleted,
            "DocumentSummaryGenerated" => DetailType::DocumentSummaryGenerated,
            "BlockRefinementCompleted" => DetailType::BlockRefinementCompleted,
            "SeedQuestionsGenerated" => DetailType::SeedQuestionsGenerated,
            "FeatureExtractionCompleted" => DetailType::FeatureExtractionCompleted,
            "SplitFileCompleted" => DetailType::SplitFileCompleted,
            "TextExtractSyncCompleted" => DetailType::TextExtractSyncCompleted,
            other => DetailType::Custom(other.to_string()),
        }
    }
}

impl From<String> for DetailType {
    fn from(value: String) -> Self {
        match DetailType::from(value.as_str()) {
            DetailType::Custom(_) => DetailType::Custom(value),
            known => known,
        }
    }
}

impl From<DetailType> for String {
    fn from(value: DetailType) -> Self {
        match value {
            DetailType::Custom(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for DetailType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
