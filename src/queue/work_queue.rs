// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::consts::{DEFAULT_MAX_RECEIVE_COUNT, DEFAULT_RETENTION_SECS};
use crate::errors::QueueError;
use crate::events::EventEnvelope;

/// Opaque lease token for one delivery of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptHandle(Uuid);

impl ReceiptHandle {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Per-queue delivery settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueOptions {
    /// Unacknowledged items older than this are purged
    pub retention: Duration,
    /// Deliveries allowed before the item is dead-lettered
    pub max_receive_count: u32,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            retention: Duration::from_secs(DEFAULT_RETENTION_SECS),
            max_receive_count: DEFAULT_MAX_RECEIVE_COUNT,
        }
    }
}

/// One entry of an item's delivery history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryAttempt {
    pub attempt: u32,
    pub leased_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A leased copy of an envelope. Owned by exactly one worker until the
/// visibility window passes.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub(crate) receipt_handle: ReceiptHandle,
    pub(crate) envelope: EventEnvelope,
    pub(crate) delivery_count: u32,
    pub(crate) visible_at: Instant,
    pub(crate) last_error: Option<String>,
}

impl WorkItem {
    pub fn receipt_handle(&self) -> &ReceiptHandle {
        &self.receipt_handle
    }

    pub fn envelope(&self) -> &EventEnvelope {
        &self.envelope
    }

    /// 1 on first delivery, incremented on every redelivery.
    pub fn delivery_count(&self) -> u32 {
        self.delivery_count
    }

    /// When the lease lapses and the item becomes leasable again.
    pub fn visible_at(&self) -> Instant {
        self.visible_at
    }

    /// Failure recorded by the previous delivery, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

/// Point-in-time counters for one queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub waiting: usize,
    pub in_flight: usize,
    pub acknowledged: u64,
    pub released: u64,
    pub expired_leases: u64,
    pub dead_lettered: u64,
    pub purged: u64,
}

impl QueueStats {
    pub fn is_idle(&self) -> bool {
        self.waiting == 0 && self.in_flight == 0
    }
}

/// At-least-once, visibility-timeout work queue for a single stage.
///
/// `lease` never blocks; an empty queue returns `Ok(None)` and the caller
/// decides how long to back off.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    fn name(&self) -> &str;

    /// Appends a copy of `envelope`. No ordering is guaranteed.
    async fn enqueue(&self, envelope: EventEnvelope) -> Result<(), QueueError>;

    /// Takes one waiting item in flight for `visibility_timeout`.
    ///
    /// Items that have used up their deliveries are moved to the dead-letter
    /// sink here instead of being returned.
    async fn lease(&self, visibility_timeout: Duration) -> Result<Option<WorkItem>, QueueError>;

    /// Removes the item for good. Fails with `InvalidLease` if the lease is
    /// gone; callers ignore that rather than retry.
    async fn acknowledge(&self, handle: &ReceiptHandle) -> Result<(), QueueError>;

    /// Returns the item to the waiting pool right away, recording `failure`.
    async fn release(&self, handle: &ReceiptHandle, failure: Option<&str>)
        -> Result<(), QueueError>;

    async fn stats(&self) -> QueueStats;

    /// Drops waiting items older than the retention horizon. Returns how many.
    async fn purge_expired(&self) -> usize;
}
