// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Event envelopes and the typed payloads they carry.

mod detail_type;
mod envelope;
pub mod payload;

pub use detail_type::DetailType;
pub use envelope::{EnvelopeBuilder, EnvelopeId, EventEnvelope};
pub use payload::{
    DocumentMetadata, IngestionDetail, Metadata, StageData, StageStatus,
};
