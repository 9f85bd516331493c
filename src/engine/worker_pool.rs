// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Stage worker pools.
//!
//! Each enabled stage gets `N` tokio tasks sharing one [`StageRuntime`].
//! A worker loops lease -> handle -> publish -> acknowledge, backing off
//! exponentially while its queue is empty. Every exit from an attempt that
//! is not a published completion releases the lease, so redelivery or the
//! dead-letter ceiling decides what happens next.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::bus::EventBus;
use crate::config::consts::{
    DEFAULT_HANDLER_TIMEOUT_SECS, DEFAULT_MAX_POLL_INTERVAL_MS, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_VISIBILITY_TIMEOUT_SECS, DEFAULT_WORKERS,
};
use crate::config::{StageDefinition, StageSecrets};
use crate::engine::completion::completion_envelope;
use crate::errors::QueueError;
use crate::events::DetailType;
use crate::observability::messages::controller::WorkerJoinFailed;
use crate::observability::messages::worker::{
    AttemptCompleted, AttemptFailed, AttemptTimedOut, CompletionPublishFailed,
    QueueOperationFailed, StaleLeaseIgnored, WorkerStarted, WorkerStopped,
};
use crate::observability::messages::StructuredLog;
use crate::queue::{WorkItem, WorkQueue};
use crate::traits::{StageHandler, StageInput};

/// How a stage's workers poll and how long a handler may run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkerOptions {
    pub workers: usize,
    /// Lease window requested on every `lease`
    pub visibility_timeout: Duration,
    /// Wall-clock budget for one handler attempt
    pub handler_timeout: Duration,
    /// First backoff after an empty poll; doubles up to `max_poll_interval`
    pub poll_interval: Duration,
    pub max_poll_interval: Duration,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            visibility_timeout: Duration::from_secs(DEFAULT_VISIBILITY_TIMEOUT_SECS),
            handler_timeout: Duration::from_secs(DEFAULT_HANDLER_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_poll_interval: Duration::from_millis(DEFAULT_MAX_POLL_INTERVAL_MS),
        }
    }
}

/// Result of one lease/handle cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// Nothing was waiting
    Idle,
    /// Completion published to these queues and the lease acknowledged
    Completed { destinations: Vec<String> },
    /// Handler error, contract violation or publish failure; lease released
    Failed(String),
    /// Handler ran past its budget; lease released
    TimedOut,
    /// Shutdown arrived mid-attempt; lease released
    Cancelled,
}

/// Per-worker tallies returned when a worker stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub stage: String,
    pub worker: usize,
    pub completed: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub cancelled: u64,
    pub queue_errors: u64,
}

impl WorkerReport {
    fn new(stage: &str, worker: usize) -> Self {
        Self {
            stage: stage.to_string(),
            worker,
            ..Self::default()
        }
    }

    fn record(&mut self, outcome: &AttemptOutcome) {
        match outcome {
            AttemptOutcome::Idle => {}
            AttemptOutcome::Completed { .. } => self.completed += 1,
            AttemptOutcome::Failed(_) => self.failed += 1,
            AttemptOutcome::TimedOut => self.timed_out += 1,
            AttemptOutcome::Cancelled => self.cancelled += 1,
        }
    }

    /// Attempts that ended without a published completion.
    pub fn unsuccessful(&self) -> u64 {
        self.failed + self.timed_out + self.cancelled
    }
}

/// Everything a stage's workers share.
pub struct StageRuntime {
    name: String,
    handler: Arc<dyn StageHandler>,
    queue: Arc<dyn WorkQueue>,
    bus: Arc<EventBus>,
    output_source: String,
    output_detail_type: DetailType,
    options: WorkerOptions,
    secrets: Arc<StageSecrets>,
}

impl StageRuntime {
    pub fn new(
        stage: &StageDefinition,
        handler: Arc<dyn StageHandler>,
        queue: Arc<dyn WorkQueue>,
        bus: Arc<EventBus>,
        output_source: impl Into<String>,
        secrets: Arc<StageSecrets>,
    ) -> Self {
        Self {
            name: stage.name.clone(),
            handler,
            queue,
            bus,
            output_source: output_source.into(),
            output_detail_type: stage.output_detail_type.clone(),
            options: stage.worker,
            secrets,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn queue(&self) -> &Arc<dyn WorkQueue> {
        &self.queue
    }

    pub fn options(&self) -> &WorkerOptions {
        &self.options
    }

    /// Runs at most one lease/handle cycle.
    ///
    /// Only queue failures other than a stale lease surface as `Err`; every
    /// handler or publish problem is an [`AttemptOutcome`].
    pub async fn poll_once(&self, cancel: &CancellationToken) -> Result<AttemptOutcome, QueueError> {
        let Some(item) = self.queue.lease(self.options.visibility_timeout).await? else {
            return Ok(AttemptOutcome::Idle);
        };

        let envelope = item.envelope();
        let input = StageInput::from_envelope(
            &self.name,
            envelope,
            item.delivery_count(),
            self.secrets.clone(),
        );
        let started = Instant::now();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = tokio::time::timeout(self.options.handler_timeout, self.handler.handle(input)) => Some(result),
        };

        match result {
            None => {
                self.release(&item, "worker shut down mid-attempt").await?;
                Ok(AttemptOutcome::Cancelled)
            }
            Some(Err(_elapsed)) => {
                AttemptTimedOut {
                    stage: &self.name,
                    envelope_id: &envelope.id(),
                    delivery_count: item.delivery_count(),
                    budget: self.options.handler_timeout,
                }
                .log();
                let reason = format!(
                    "handler exceeded its {:?} budget",
                    self.options.handler_timeout
                );
                self.release(&item, &reason).await?;
                Ok(AttemptOutcome::TimedOut)
            }
            Some(Ok(Err(error))) => self.fail(&item, error.to_string()).await,
            Some(Ok(Ok(output))) => {
                let completion = match completion_envelope(
                    envelope,
                    output,
                    &self.output_source,
                    &self.output_detail_type,
                ) {
                    Ok(completion) => completion,
                    Err(violation) => return self.fail(&item, violation.to_string()).await,
                };
                let document_id = completion.document_id().map(str::to_string);

                match self.bus.publish(completion).await {
                    Ok(receipt) => {
                        self.acknowledge(&item).await?;
                        AttemptCompleted {
                            stage: &self.name,
                            envelope_id: &envelope.id(),
                            document_id: document_id.as_deref(),
                            delivery_count: item.delivery_count(),
                            duration: started.elapsed(),
                            destinations: &receipt.destinations,
                        }
                        .log();
                        Ok(AttemptOutcome::Completed {
                            destinations: receipt.destinations,
                        })
                    }
                    Err(error) => {
                        CompletionPublishFailed {
                            stage: &self.name,
                            envelope_id: &envelope.id(),
                            error: &error,
                        }
                        .log();
                        let reason = error.to_string();
                        self.release(&item, &reason).await?;
                        Ok(AttemptOutcome::Failed(reason))
                    }
                }
            }
        }
    }

    async fn fail(&self, item: &WorkItem, reason: String) -> Result<AttemptOutcome, QueueError> {
        AttemptFailed {
            stage: &self.name,
            envelope_id: &item.envelope().id(),
            delivery_count: item.delivery_count(),
            error: &reason,
        }
        .log();
        self.release(item, &reason).await?;
        Ok(AttemptOutcome::Failed(reason))
    }

    async fn release(&self, item: &WorkItem, reason: &str) -> Result<(), QueueError> {
        let result = self.queue.release(item.receipt_handle(), Some(reason)).await;
        self.ignore_stale_lease(item, "release", result)
    }

    async fn acknowledge(&self, item: &WorkItem) -> Result<(), QueueError> {
        let result = self.queue.acknowledge(item.receipt_handle()).await;
        self.ignore_stale_lease(item, "acknowledge", result)
    }

    fn ignore_stale_lease(
        &self,
        item: &WorkItem,
        operation: &'static str,
        result: Result<(), QueueError>,
    ) -> Result<(), QueueError> {
        match result {
            Err(error) if error.is_invalid_lease() => {
                StaleLeaseIgnored {
                    stage: &self.name,
                    envelope_id: &item.envelope().id(),
                    operation,
                }
                .log();
                Ok(())
            }
            other => other,
        }
    }
}

/// The running workers of one stage.
pub struct StageWorkerPool {
    stage: String,
    workers: Vec<JoinHandle<WorkerReport>>,
}

impl StageWorkerPool {
    /// Starts `runtime.options().workers` tasks that run until `cancel` fires.
    pub fn spawn(runtime: Arc<StageRuntime>, cancel: CancellationToken) -> Self {
        let workers = (0..runtime.options.workers)
            .map(|worker| tokio::spawn(run_worker(runtime.clone(), worker, cancel.clone())))
            .collect();
        Self {
            stage: runtime.name.clone(),
            workers,
        }
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Waits for every worker. A worker that panicked is logged and has no report.
    pub async fn join(self) -> Vec<WorkerReport> {
        let mut reports = Vec::with_capacity(self.workers.len());
        for worker in self.workers {
            match worker.await {
                Ok(report) => reports.push(report),
                Err(error) => WorkerJoinFailed {
                    stage: &self.stage,
                    error: &error,
                }
                .log(),
            }
        }
        reports
    }
}

async fn run_worker(
    runtime: Arc<StageRuntime>,
    worker: usize,
    cancel: CancellationToken,
) -> WorkerReport {
    WorkerStarted {
        stage: &runtime.name,
        worker,
    }
    .log();

    let mut report = WorkerReport::new(&runtime.name, worker);
    let mut backoff = runtime.options.poll_interval;

    while !cancel.is_cancelled() {
        let idle = match runtime.poll_once(&cancel).await {
            Ok(AttemptOutcome::Idle) => true,
            Ok(outcome) => {
                report.record(&outcome);
                false
            }
            Err(error) => {
                QueueOperationFailed {
                    stage: &runtime.name,
                    queue: runtime.queue.name(),
                    error: &error,
                }
                .log();
                report.queue_errors += 1;
                true
            }
        };

        if !idle {
            backoff = runtime.options.poll_interval;
            continue;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(backoff) => {}
        }
        backoff = backoff
            .saturating_mul(2)
            .min(runtime.options.max_poll_interval);
    }

    WorkerStopped {
        stage: &runtime.name,
        worker,
        completed: report.completed,
        failed: report.unsuccessful(),
    }
    .log();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::{FailingHandler, RecordingHandler, SlowHandler};
    use crate::events::{EventEnvelope, IngestionDetail, StageStatus};
    use crate::queue::{InMemoryDeadLetterSink, InMemoryWorkQueue, QueueOptions};
    use crate::routing::{EventPattern, RoutingTable};
    use crate::traits::StageOutput;

    struct Harness {
        runtime: StageRuntime,
        queue: Arc<dyn WorkQueue>,
        downstream: Arc<dyn WorkQueue>,
    }

    fn memory_queue(name: &str) -> Arc<dyn WorkQueue> {
        Arc::new(InMemoryWorkQueue::new(
            name,
            QueueOptions::default(),
            Arc::new(InMemoryDeadLetterSink::new()),
        ))
    }

    /// An extraction stage whose completions route to a `downstream` queue.
    fn harness(handler: Arc<dyn StageHandler>, options: WorkerOptions) -> Harness {
        let stage = StageDefinition::new("document_extraction", DetailType::DocumentExtractionCompleted)
            .worker_options(options);
        let queue = memory_queue("extraction");
        let downstream = memory_queue("standardization");
        let routes = RoutingTable::builder()
            .route(
                "block_standardization-0",
                EventPattern::new().detail_type([DetailType::DocumentExtractionCompleted]),
                "standardization",
            )
            .build();
        let bus = Arc::new(EventBus::new(routes, [downstream.clone()]).unwrap());
        let runtime = StageRuntime::new(
            &stage,
            handler,
            queue.clone(),
            bus,
            "stitch.worker",
            Arc::new(StageSecrets::default()),
        );
        Harness {
            runtime,
            queue,
            downstream,
        }
    }

    fn upload() -> EventEnvelope {
        EventEnvelope::object_created("storage", &IngestionDetail::new("docs", "jdtest/a.pdf"))
    }

    fn with_document_id(id: &str) -> StageOutput {
        StageOutput::new().with_metadata("document_id", id)
    }

    #[tokio::test]
    async fn empty_queue_is_idle() {
        let h = harness(Arc::new(RecordingHandler::new()), WorkerOptions::default());
        let outcome = h.runtime.poll_once(&CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, AttemptOutcome::Idle);
    }

    #[tokio::test]
    async fn success_publishes_completion_and_acknowledges() {
        let handler = Arc::new(RecordingHandler::with_output(with_document_id("D1")));
        let h = harness(handler.clone(), WorkerOptions::default());
        h.queue.enqueue(upload()).await.unwrap();

        let outcome = h.runtime.poll_once(&CancellationToken::new()).await.unwrap();
        assert_eq!(
            outcome,
            AttemptOutcome::Completed {
                destinations: vec!["standardization".to_string()]
            }
        );

        let stats = h.queue.stats().await;
        assert!(stats.is_idle());
        assert_eq!(stats.acknowledged, 1);

        let calls = handler.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].stage, "document_extraction");
        assert_eq!(calls[0].delivery_count, 1);

        let completion = h
            .downstream
            .lease(Duration::from_secs(30))
            .await
            .unwrap()
            .unwrap();
        let completion = completion.envelope();
        assert_eq!(completion.source(), "stitch.worker");
        assert_eq!(completion.detail_type(), &DetailType::DocumentExtractionCompleted);
        assert_eq!(completion.document_id(), Some("D1"));
        assert_eq!(
            completion.data()["status"],
            serde_json::json!(StageStatus::Completed.as_str())
        );
    }

    #[tokio::test]
    async fn handler_error_releases_without_publishing() {
        let h = harness(Arc::new(FailingHandler::always()), WorkerOptions::default());
        h.queue.enqueue(upload()).await.unwrap();

        let outcome = h.runtime.poll_once(&CancellationToken::new()).await.unwrap();
        assert!(matches!(outcome, AttemptOutcome::Failed(ref e) if e.contains("simulated failure #1")));

        let stats = h.queue.stats().await;
        assert_eq!(stats.waiting, 1);
        assert_eq!(stats.released, 1);
        assert_eq!(h.downstream.stats().await.waiting, 0);

        let retry = h.queue.lease(Duration::from_secs(30)).await.unwrap().unwrap();
        assert_eq!(retry.delivery_count(), 2);
        assert!(retry.last_error().is_some_and(|e| e.contains("simulated failure #1")));
    }

    #[tokio::test]
    async fn contract_violation_is_a_failed_attempt() {
        // no document_id anywhere
        let h = harness(Arc::new(RecordingHandler::new()), WorkerOptions::default());
        h.queue.enqueue(upload()).await.unwrap();

        let outcome = h.runtime.poll_once(&CancellationToken::new()).await.unwrap();
        assert!(matches!(outcome, AttemptOutcome::Failed(ref e) if e.contains("document_id")));
        assert_eq!(h.queue.stats().await.waiting, 1);
        assert_eq!(h.downstream.stats().await.waiting, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_handler_times_out_and_is_released() {
        let options = WorkerOptions {
            handler_timeout: Duration::from_secs(5),
            ..WorkerOptions::default()
        };
        let slow = SlowHandler::new(Duration::from_secs(60), with_document_id("D1"));
        let h = harness(Arc::new(slow), options);
        h.queue.enqueue(upload()).await.unwrap();

        let outcome = h.runtime.poll_once(&CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, AttemptOutcome::TimedOut);

        let stats = h.queue.stats().await;
        assert_eq!(stats.waiting, 1);
        assert_eq!(stats.acknowledged, 0);
        assert_eq!(h.downstream.stats().await.waiting, 0);
    }

    #[tokio::test]
    async fn cancellation_releases_the_lease() {
        let slow = SlowHandler::new(Duration::from_secs(60), with_document_id("D1"));
        let h = harness(Arc::new(slow), WorkerOptions::default());
        h.queue.enqueue(upload()).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = h.runtime.poll_once(&cancel).await.unwrap();
        assert_eq!(outcome, AttemptOutcome::Cancelled);
        assert_eq!(h.queue.stats().await.waiting, 1);
    }

    #[tokio::test]
    async fn publish_failure_releases_the_lease() {
        let stage = StageDefinition::new("document_extraction", DetailType::DocumentExtractionCompleted);
        let queue = memory_queue("extraction");
        let no_queues: Vec<Arc<dyn WorkQueue>> = Vec::new();
        let bus = Arc::new(EventBus::new(RoutingTable::builder().build(), no_queues).unwrap());
        let handler = Arc::new(RecordingHandler::with_output(
            // correlation ids are strings; the bus rejects this completion
            StageOutput::new().with_metadata("document_id", "D1").with_metadata("seed_questions_id", 7),
        ));
        let runtime = StageRuntime::new(
            &stage,
            handler,
            queue.clone(),
            bus,
            "stitch.worker",
            Arc::new(StageSecrets::default()),
        );
        queue.enqueue(upload()).await.unwrap();

        let outcome = runtime.poll_once(&CancellationToken::new()).await.unwrap();
        assert!(matches!(outcome, AttemptOutcome::Failed(_)));
        assert_eq!(queue.stats().await.waiting, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pool_drains_queue_and_reports_on_shutdown() {
        let options = WorkerOptions {
            workers: 3,
            ..WorkerOptions::default()
        };
        let handler = Arc::new(RecordingHandler::with_output(with_document_id("D1")));
        let h = harness(handler.clone(), options);
        for _ in 0..6 {
            h.queue.enqueue(upload()).await.unwrap();
        }

        let cancel = CancellationToken::new();
        let runtime = Arc::new(h.runtime);
        let pool = StageWorkerPool::spawn(runtime, cancel.clone());
        assert_eq!(pool.len(), 3);

        for _ in 0..50 {
            if h.queue.stats().await.acknowledged == 6 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        cancel.cancel();
        let reports = pool.join().await;
        assert_eq!(reports.len(), 3);
        assert_eq!(reports.iter().map(|r| r.completed).sum::<u64>(), 6);
        assert_eq!(handler.call_count(), 6);
        assert_eq!(h.downstream.stats().await.waiting, 6);
    }
}
