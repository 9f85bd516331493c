// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for pipeline wiring, startup and shutdown.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A stage's queue and bindings were created.
///
/// # Log Level
/// `info!` - Important operational event
pub struct StageRegistered<'a> {
    pub stage: &'a str,
    pub queue: &'a str,
    pub bindings: usize,
    pub workers: usize,
}

impl Display for StageRegistered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Registered stage '{}' on queue '{}' ({} binding(s), {} worker(s))",
            self.stage, self.queue, self.bindings, self.workers
        )
    }
}

impl StructuredLog for StageRegistered<'_> {
    fn log(&self) {
        tracing::info!(
            stage = self.stage,
            queue = self.queue,
            bindings = self.bindings,
            workers = self.workers,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "stage_registration",
            span_name = name,
            stage = self.stage,
            queue = self.queue,
        )
    }
}

/// A stage is switched off; it gets no queue and no bindings.
///
/// # Log Level
/// `info!` - Important operational event
pub struct StageDisabled<'a> {
    pub stage: &'a str,
}

impl Display for StageDisabled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stage '{}' is disabled; events routed only to it will be dropped",
            self.stage
        )
    }
}

impl StructuredLog for StageDisabled<'_> {
    fn log(&self) {
        tracing::info!(stage = self.stage, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("stage_registration", span_name = name, stage = self.stage)
    }
}

/// Worker pools are running.
///
/// # Log Level
/// `info!` - Important operational event
pub struct PipelineStarted {
    pub stages: usize,
    pub workers: usize,
}

impl Display for PipelineStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline started: {} stage(s), {} worker(s)",
            self.stages, self.workers
        )
    }
}

impl StructuredLog for PipelineStarted {
    fn log(&self) {
        tracing::info!(stages = self.stages, workers = self.workers, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pipeline",
            span_name = name,
            stages = self.stages,
            workers = self.workers,
        )
    }
}

/// Every worker has returned after shutdown.
///
/// # Log Level
/// `info!` - Important operational event
pub struct PipelineStopped {
    pub workers: usize,
    pub completed: u64,
    pub failed: u64,
    pub elapsed: Duration,
}

impl Display for PipelineStopped {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline stopped after {:?}: {} worker(s), {} completed, {} failed",
            self.elapsed, self.workers, self.completed, self.failed
        )
    }
}

impl StructuredLog for PipelineStopped {
    fn log(&self) {
        tracing::info!(
            workers = self.workers,
            completed = self.completed,
            failed = self.failed,
            elapsed_ms = self.elapsed.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("pipeline", span_name = name, workers = self.workers)
    }
}

/// A worker task ended abnormally and produced no report.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct WorkerJoinFailed<'a> {
    pub stage: &'a str,
    pub error: &'a tokio::task::JoinError,
}

impl Display for WorkerJoinFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Worker for stage '{}' did not finish cleanly: {}", self.stage, self.error)
    }
}

impl StructuredLog for WorkerJoinFailed<'_> {
    fn log(&self) {
        tracing::error!(stage = self.stage, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("pipeline", span_name = name, stage = self.stage)
    }
}
