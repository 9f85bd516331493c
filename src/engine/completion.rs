// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Construction of a stage's completion envelope from a handler's output.

use serde_json::Value;

use crate::errors::StageError;
use crate::events::payload::keys;
use crate::events::{DetailType, EventEnvelope, Metadata, StageStatus};
use crate::traits::StageOutput;

/// Builds the envelope a stage publishes after its handler succeeded.
///
/// `metadata` is the input's metadata with the handler's fragment merged
/// over it. `document_id` can be introduced once but never changed, and it
/// must be present after the merge. `data` is the handler's payload with
/// `status` forced to `COMPLETED`.
pub fn completion_envelope(
    input: &EventEnvelope,
    output: StageOutput,
    output_source: &str,
    output_detail_type: &DetailType,
) -> Result<EventEnvelope, StageError> {
    let metadata = merge_metadata(input.metadata(), output.metadata)?;
    let data = completed_data(output.data)?;

    Ok(EventEnvelope::builder(output_source, output_detail_type.clone())
        .metadata(metadata)
        .data(data)
        .status(StageStatus::Completed)
        .build())
}

fn merge_metadata(base: &Metadata, fragment: Metadata) -> Result<Metadata, StageError> {
    let mut merged = base.clone();

    for (key, value) in fragment {
        if key == keys::DOCUMENT_ID {
            if let Some(existing) = non_empty_str(merged.get(keys::DOCUMENT_ID)) {
                if value.as_str() != Some(existing) {
                    return Err(StageError::ContractViolation(format!(
                        "document_id is '{existing}' and cannot be reassigned to {value}"
                    )));
                }
            }
        }
        merged.insert(key, value);
    }

    if non_empty_str(merged.get(keys::DOCUMENT_ID)).is_none() {
        return Err(StageError::ContractViolation(
            "completion has no document_id".to_string(),
        ));
    }
    Ok(merged)
}

fn completed_data(data: Value) -> Result<Value, StageError> {
    match data {
        Value::Null => Ok(Value::Object(serde_json::Map::new())),
        Value::Object(map) => Ok(Value::Object(map)),
        other => Err(StageError::ContractViolation(format!(
            "stage data must be an object, got {other}"
        ))),
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}
