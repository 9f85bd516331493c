// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Lease window before an unacknowledged item becomes visible again (6 minutes).
/// Must stay above the handler budget.
pub const DEFAULT_VISIBILITY_TIMEOUT_SECS: u64 = 360;
/// Unacknowledged items are purged after this long (14 days)
pub const DEFAULT_RETENTION_SECS: u64 = 14 * 24 * 60 * 60;
/// Deliveries allowed before an item is dead-lettered
pub const DEFAULT_MAX_RECEIVE_COUNT: u32 = 5;
/// Concurrent workers per stage
pub const DEFAULT_WORKERS: usize = 2;
/// Wall-clock budget for one handler invocation (5 minutes)
pub const DEFAULT_HANDLER_TIMEOUT_SECS: u64 = 300;
/// First backoff after an empty poll
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
/// Backoff ceiling for consecutive empty polls
pub const DEFAULT_MAX_POLL_INTERVAL_MS: u64 = 2_000;

/// `source` stamped on every completion envelope
pub const DEFAULT_OUTPUT_SOURCE: &str = "stitch.worker";
/// `source` of storage upload notifications
pub const STORAGE_SOURCE: &str = "storage";
/// `source` of manual pipeline (re)starts
pub const ORCHESTRATION_SOURCE: &str = "stitch.orchestration";
