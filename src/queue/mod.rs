// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-stage work queues with lease/acknowledge semantics and a dead-letter
//! path for items that exhaust their deliveries.

pub mod dead_letter;
pub mod memory;
pub mod work_queue;

pub use dead_letter::{
    DeadLetterRecord, DeadLetterSink, InMemoryDeadLetterSink, JsonLinesDeadLetterSink,
};
pub use memory::InMemoryWorkQueue;
pub use work_queue::{
    DeliveryAttempt, QueueOptions, QueueStats, ReceiptHandle, WorkItem, WorkQueue,
};
