// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Terminal sinks for items that used up their deliveries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::work_queue::DeliveryAttempt;
use crate::errors::QueueError;
use crate::events::EventEnvelope;

/// What an operator sees for a poisoned item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterRecord {
    pub queue: String,
    pub envelope: EventEnvelope,
    pub delivery_count: u32,
    pub delivery_history: Vec<DeliveryAttempt>,
    pub last_error: Option<String>,
    pub dead_lettered_at: DateTime<Utc>,
}

#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn deposit(&self, record: DeadLetterRecord) -> Result<(), QueueError>;

    /// Everything deposited so far, oldest first.
    async fn records(&self) -> Result<Vec<DeadLetterRecord>, QueueError>;
}

#[derive(Debug, Default)]
pub struct InMemoryDeadLetterSink {
    records: Mutex<Vec<DeadLetterRecord>>,
}

impl InMemoryDeadLetterSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeadLetterSink for InMemoryDeadLetterSink {
    async fn deposit(&self, record: DeadLetterRecord) -> Result<(), QueueError> {
        self.records.lock().await.push(record);
        Ok(())
    }

    async fn records(&self) -> Result<Vec<DeadLetterRecord>, QueueError> {
        Ok(self.records.lock().await.clone())
    }
}

/// Appends one JSON record per line to a file.
#[derive(Debug)]
pub struct JsonLinesDeadLetterSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesDeadLetterSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DeadLetterSink for JsonLinesDeadLetterSink {
    async fn deposit(&self, record: DeadLetterRecord) -> Result<(), QueueError> {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn records(&self) -> Result<Vec<DeadLetterRecord>, QueueError> {
        let _guard = self.write_lock.lock().await;
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(QueueError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{DetailType, EventEnvelope};
    use tempfile::TempDir;

    fn record(queue: &str) -> DeadLetterRecord {
        DeadLetterRecord {
            queue: queue.to_string(),
            envelope: EventEnvelope::builder("stitch.worker", DetailType::DocumentExtractionCompleted)
                .metadata_entry("document_id", "D1")
                .build(),
            delivery_count: 5,
            delivery_history: vec![DeliveryAttempt {
                attempt: 1,
                leased_at: Utc::now(),
                error: Some("boom".to_string()),
            }],
            last_error: Some("boom".to_string()),
            dead_lettered_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn in_memory_sink_keeps_deposit_order() {
        let sink = InMemoryDeadLetterSink::new();
        sink.deposit(record("a")).await.unwrap();
        sink.deposit(record("b")).await.unwrap();
        let queues: Vec<_> = sink.records().await.unwrap().into_iter().map(|r| r.queue).collect();
        assert_eq!(queues, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn json_lines_sink_appends_and_reads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dead-letters.jsonl");
        let sink = JsonLinesDeadLetterSink::new(&path);

        assert!(sink.records().await.unwrap().is_empty());

        let first = record("extraction");
        sink.deposit(first.clone()).await.unwrap();
        sink.deposit(record("summary")).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);

        let records = sink.records().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], first);
        assert_eq!(records[1].last_error.as_deref(), Some("boom"));
    }
}
