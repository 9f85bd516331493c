// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::dead_letter::{DeadLetterRecord, DeadLetterSink};
use super::work_queue::{
    DeliveryAttempt, QueueOptions, QueueStats, ReceiptHandle, WorkItem, WorkQueue,
};
use crate::errors::QueueError;
use crate::events::EventEnvelope;
use crate::observability::messages::queue::{
    DeadLetterDeferred, ItemDeadLettered, ItemReleased, ItemsPurged, LeaseExpired,
};
use crate::observability::messages::StructuredLog;

const EXPIRED_REASON: &str = "visibility timeout expired";
const RELEASED_REASON: &str = "released without a reason";

/// An envelope plus its delivery bookkeeping, whether waiting or in flight.
#[derive(Debug)]
struct QueuedEnvelope {
    envelope: EventEnvelope,
    delivery_count: u32,
    history: Vec<DeliveryAttempt>,
    last_error: Option<String>,
    enqueued_at: Instant,
}

impl QueuedEnvelope {
    fn record_failure(&mut self, reason: &str) {
        if let Some(attempt) = self.history.last_mut() {
            attempt.error.get_or_insert_with(|| reason.to_string());
        }
        self.last_error = Some(reason.to_string());
    }
}

#[derive(Debug)]
struct Lease {
    item: QueuedEnvelope,
    visible_at: Instant,
}

#[derive(Debug, Default)]
struct QueueState {
    waiting: VecDeque<QueuedEnvelope>,
    in_flight: HashMap<ReceiptHandle, Lease>,
    acknowledged: u64,
    released: u64,
    expired_leases: u64,
    dead_lettered: u64,
    purged: u64,
}

/// Process-local `WorkQueue` backed by a mutex-guarded waiting list and
/// lease table.
///
/// All lease-state changes happen under one lock, so an item is either
/// waiting or in flight, never both. Expired leases are reclaimed lazily at
/// the top of every operation. Timing uses `tokio::time::Instant`, which
/// makes visibility and retention controllable from paused-clock tests.
pub struct InMemoryWorkQueue {
    name: String,
    options: QueueOptions,
    dead_letters: Arc<dyn DeadLetterSink>,
    state: Mutex<QueueState>,
}

impl InMemoryWorkQueue {
    pub fn new(
        name: impl Into<String>,
        options: QueueOptions,
        dead_letters: Arc<dyn DeadLetterSink>,
    ) -> Self {
        Self {
            name: name.into(),
            options,
            dead_letters,
            state: Mutex::new(QueueState::default()),
        }
    }

    pub fn options(&self) -> &QueueOptions {
        &self.options
    }

    fn reclaim_expired(&self, state: &mut QueueState, now: Instant) {
        let expired: Vec<ReceiptHandle> = state
            .in_flight
            .iter()
            .filter(|(_, lease)| lease.visible_at <= now)
            .map(|(handle, _)| *handle)
            .collect();

        for handle in expired {
            if let Some(mut lease) = state.in_flight.remove(&handle) {
                lease.item.record_failure(EXPIRED_REASON);
                LeaseExpired {
                    queue: &self.name,
                    envelope_id: &lease.item.envelope.id(),
                    delivery_count: lease.item.delivery_count,
                }
                .log();
                state.expired_leases += 1;
                state.waiting.push_back(lease.item);
            }
        }
    }

    fn purge_waiting(&self, state: &mut QueueState, now: Instant) -> usize {
        let retention = self.options.retention;
        let before = state.waiting.len();
        state
            .waiting
            .retain(|item| now.saturating_duration_since(item.enqueued_at) < retention);
        let purged = before - state.waiting.len();
        if purged > 0 {
            state.purged += purged as u64;
            ItemsPurged {
                queue: &self.name,
                count: purged,
                retention,
            }
            .log();
        }
        purged
    }

    fn dead_letter_record(&self, item: &QueuedEnvelope) -> DeadLetterRecord {
        DeadLetterRecord {
            queue: self.name.clone(),
            envelope: item.envelope.clone(),
            delivery_count: item.delivery_count,
            delivery_history: item.history.clone(),
            last_error: item.last_error.clone(),
            dead_lettered_at: Utc::now(),
        }
    }
}

#[async_trait]
impl WorkQueue for InMemoryWorkQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn enqueue(&self, envelope: EventEnvelope) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        state.waiting.push_back(QueuedEnvelope {
            envelope,
            delivery_count: 0,
            history: Vec::new(),
            last_error: None,
            enqueued_at: Instant::now(),
        });
        Ok(())
    }

    async fn lease(&self, visibility_timeout: Duration) -> Result<Option<WorkItem>, QueueError> {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        self.reclaim_expired(&mut state, now);
        self.purge_waiting(&mut state, now);

        // exhausted items the sink refused; requeued at the back once the scan ends
        let mut deferred = Vec::new();
        let mut sink_failure = None;
        let mut leased = None;

        while let Some(mut item) = state.waiting.pop_front() {
            if item.delivery_count >= self.options.max_receive_count {
                let record = self.dead_letter_record(&item);
                if let Err(error) = self.dead_letters.deposit(record).await {
                    DeadLetterDeferred {
                        queue: &self.name,
                        envelope_id: &item.envelope.id(),
                        delivery_count: item.delivery_count,
                        error: &error,
                    }
                    .log();
                    sink_failure.get_or_insert_with(|| error.to_string());
                    deferred.push(item);
                    continue;
                }
                ItemDeadLettered {
                    queue: &self.name,
                    envelope_id: &item.envelope.id(),
                    delivery_count: item.delivery_count,
                    last_error: item.last_error.as_deref(),
                }
                .log();
                state.dead_lettered += 1;
                continue;
            }

            item.delivery_count += 1;
            item.history.push(DeliveryAttempt {
                attempt: item.delivery_count,
                leased_at: Utc::now(),
                error: None,
            });

            let handle = ReceiptHandle::new();
            let visible_at = now + visibility_timeout;
            let work_item = WorkItem {
                receipt_handle: handle,
                envelope: item.envelope.clone(),
                delivery_count: item.delivery_count,
                visible_at,
                last_error: item.last_error.clone(),
            };
            state.in_flight.insert(handle, Lease { item, visible_at });
            leased = Some(work_item);
            break;
        }

        state.waiting.extend(deferred);

        match (leased, sink_failure) {
            (Some(work_item), _) => Ok(Some(work_item)),
            (None, Some(reason)) => Err(QueueError::DeadLetter {
                queue: self.name.clone(),
                reason,
            }),
            (None, None) => Ok(None),
        }
    }

    async fn acknowledge(&self, handle: &ReceiptHandle) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        self.reclaim_expired(&mut state, Instant::now());

        match state.in_flight.remove(handle) {
            Some(_) => {
                state.acknowledged += 1;
                Ok(())
            }
            None => Err(QueueError::InvalidLease(*handle)),
        }
    }

    async fn release(
        &self,
        handle: &ReceiptHandle,
        failure: Option<&str>,
    ) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        self.reclaim_expired(&mut state, Instant::now());

        let Some(mut lease) = state.in_flight.remove(handle) else {
            return Err(QueueError::InvalidLease(*handle));
        };
        let reason = failure.unwrap_or(RELEASED_REASON);
        lease.item.record_failure(reason);
        ItemReleased {
            queue: &self.name,
            envelope_id: &lease.item.envelope.id(),
            delivery_count: lease.item.delivery_count,
            reason,
        }
        .log();
        state.released += 1;
        state.waiting.push_back(lease.item);
        Ok(())
    }

    async fn stats(&self) -> QueueStats {
        let mut state = self.state.lock().await;
        self.reclaim_expired(&mut state, Instant::now());
        QueueStats {
            waiting: state.waiting.len(),
            in_flight: state.in_flight.len(),
            acknowledged: state.acknowledged,
            released: state.released,
            expired_leases: state.expired_leases,
            dead_lettered: state.dead_lettered,
            purged: state.purged,
        }
    }

    async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        self.reclaim_expired(&mut state, now);
        self.purge_waiting(&mut state, now)
    }
}
