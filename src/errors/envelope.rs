// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Reasons an envelope is refused at the bus boundary.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("envelope source must not be empty")]
    EmptySource,

    #[error("envelope detail_type must not be empty")]
    EmptyDetailType,

    /// Every envelope downstream of ingestion must carry the document id
    #[error("'{detail_type}' envelope is missing a non-empty metadata.document_id")]
    MissingDocumentId { detail_type: String },

    #[error("'{detail_type}' envelope has malformed metadata: {source}")]
    InvalidMetadata {
        detail_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("'{detail_type}' envelope has malformed data (a status of COMPLETED or FAILED is required): {source}")]
    InvalidData {
        detail_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("'{detail_type}' envelope has malformed detail: {source}")]
    InvalidDetail {
        detail_type: String,
        #[source]
        source: serde_json::Error,
    },
}
