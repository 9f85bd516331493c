// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Wires a [`Topology`] into queues, route bindings and worker pools.
//!
//! Every enabled stage goes through [`register_stage`]; there is no
//! per-stage code path. A disabled stage is skipped entirely, so events
//! that would only have matched it fall through the bus unmatched.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::bus::{EventBus, PublishReceipt};
use crate::config::{validate_topology, HandlerMap, SecretsProvider, StageDefinition, StageSecrets, Topology};
use crate::engine::worker_pool::{StageRuntime, StageWorkerPool, WorkerReport};
use crate::errors::{ControllerError, PublishError, QueueError};
use crate::events::EventEnvelope;
use crate::observability::messages::controller::{
    PipelineStarted, PipelineStopped, StageDisabled, StageRegistered,
};
use crate::observability::messages::StructuredLog;
use crate::queue::{
    DeadLetterRecord, DeadLetterSink, InMemoryDeadLetterSink, InMemoryWorkQueue,
    JsonLinesDeadLetterSink, QueueStats, WorkQueue,
};
use crate::routing::{RouteBinding, RoutingTableBuilder};
use crate::traits::StageHandler;

const IDLE_CHECK_INTERVAL: Duration = Duration::from_millis(20);

/// A stage's queue and bindings, waiting for the bus to exist.
pub struct RegisteredStage {
    pub definition: StageDefinition,
    pub handler: Arc<dyn StageHandler>,
    pub queue: Arc<dyn WorkQueue>,
    pub bindings: Vec<RouteBinding>,
    pub secrets: Arc<StageSecrets>,
}

impl RegisteredStage {
    pub fn into_runtime(self, bus: Arc<EventBus>, output_source: &str) -> StageRuntime {
        StageRuntime::new(
            &self.definition,
            self.handler,
            self.queue,
            bus,
            output_source,
            self.secrets,
        )
    }
}

/// Creates one stage's queue and its bindings, one per input pattern,
/// named `{stage}-{index}`.
pub fn register_stage(
    stage: &StageDefinition,
    handler: Arc<dyn StageHandler>,
    secrets: &dyn SecretsProvider,
    dead_letters: Arc<dyn DeadLetterSink>,
) -> RegisteredStage {
    let queue: Arc<dyn WorkQueue> = Arc::new(InMemoryWorkQueue::new(
        stage.queue_name.clone(),
        stage.queue,
        dead_letters,
    ));

    let bindings: Vec<RouteBinding> = stage
        .inputs
        .iter()
        .enumerate()
        .map(|(index, pattern)| {
            RouteBinding::new(
                format!("{}-{}", stage.name, index),
                pattern.clone(),
                stage.queue_name.clone(),
            )
        })
        .collect();

    StageRegistered {
        stage: &stage.name,
        queue: &stage.queue_name,
        bindings: bindings.len(),
        workers: stage.worker.workers,
    }
    .log();

    RegisteredStage {
        definition: stage.clone(),
        handler,
        queue,
        bindings,
        secrets: Arc::new(secrets.secrets_for(&stage.name, &stage.secrets)),
    }
}

/// Owns the wired pipeline: the bus, one runtime per enabled stage and the
/// dead-letter sink they share.
///
/// # Example
/// ```
/// use stitch_pipeline::backends::local::LocalHandlerFactory;
/// use stitch_pipeline::config::{EnvSecretsProvider, Topology};
/// use stitch_pipeline::engine::PipelineController;
///
/// let topology = Topology::standard("docs", "jdtest/");
/// let handlers = LocalHandlerFactory::handler_map();
/// let controller = PipelineController::new(topology, &handlers, &EnvSecretsProvider).unwrap();
///
/// assert_eq!(controller.stages().len(), 6);
/// assert_eq!(controller.bus().routes().len(), 7);
/// ```
pub struct PipelineController {
    topology: Topology,
    bus: Arc<EventBus>,
    stages: Vec<Arc<StageRuntime>>,
    dead_letters: Arc<dyn DeadLetterSink>,
}

impl PipelineController {
    /// Validates and wires `topology`. Dead letters go to the topology's
    /// JSON-lines file when it names one, otherwise they are kept in memory.
    pub fn new(
        topology: Topology,
        handlers: &HandlerMap,
        secrets: &dyn SecretsProvider,
    ) -> Result<Self, ControllerError> {
        let dead_letters: Arc<dyn DeadLetterSink> = match topology.dead_letter_path() {
            Some(path) => Arc::new(JsonLinesDeadLetterSink::new(path.clone())),
            None => Arc::new(InMemoryDeadLetterSink::new()),
        };
        Self::with_dead_letter_sink(topology, handlers, secrets, dead_letters)
    }

    pub fn with_dead_letter_sink(
        topology: Topology,
        handlers: &HandlerMap,
        secrets: &dyn SecretsProvider,
        dead_letters: Arc<dyn DeadLetterSink>,
    ) -> Result<Self, ControllerError> {
        validate_topology(&topology, handlers).map_err(ControllerError::InvalidTopology)?;

        let mut registered = Vec::new();
        for stage in topology.stages() {
            if !stage.enabled {
                StageDisabled { stage: &stage.name }.log();
                continue;
            }
            let handler = handlers.get(&stage.handler).cloned().ok_or_else(|| {
                ControllerError::MissingHandler {
                    stage: stage.name.clone(),
                    handler: stage.handler.clone(),
                }
            })?;
            registered.push(register_stage(stage, handler, secrets, dead_letters.clone()));
        }

        let routes = registered
            .iter()
            .fold(RoutingTableBuilder::default(), |routes, stage| {
                routes.extend(stage.bindings.iter().cloned())
            })
            .build();
        let queues: Vec<Arc<dyn WorkQueue>> =
            registered.iter().map(|stage| stage.queue.clone()).collect();
        let bus = Arc::new(EventBus::new(routes, queues)?);

        let stages = registered
            .into_iter()
            .map(|stage| Arc::new(stage.into_runtime(bus.clone(), topology.output_source())))
            .collect();

        Ok(Self {
            topology,
            bus,
            stages,
            dead_letters,
        })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Runtimes of the enabled stages, in topology order.
    pub fn stages(&self) -> &[Arc<StageRuntime>] {
        &self.stages
    }

    pub fn stage(&self, name: &str) -> Option<&Arc<StageRuntime>> {
        self.stages.iter().find(|stage| stage.name() == name)
    }

    /// The queue feeding `stage`, if it is enabled.
    pub fn queue(&self, stage: &str) -> Option<&Arc<dyn WorkQueue>> {
        self.stage(stage).map(|runtime| runtime.queue())
    }

    pub async fn publish(&self, envelope: EventEnvelope) -> Result<PublishReceipt, PublishError> {
        self.bus.publish(envelope).await
    }

    /// Queue counters per enabled stage, in topology order.
    pub async fn stats(&self) -> Vec<(String, QueueStats)> {
        let mut stats = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            stats.push((stage.name().to_string(), stage.queue().stats().await));
        }
        stats
    }

    /// Nothing waiting or in flight on any queue.
    pub async fn is_idle(&self) -> bool {
        for stage in &self.stages {
            if !stage.queue().stats().await.is_idle() {
                return false;
            }
        }
        true
    }

    /// Polls queue stats until the pipeline is idle. Returns `false` if
    /// `timeout` passed first.
    pub async fn wait_until_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_idle().await {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(IDLE_CHECK_INTERVAL).await;
        }
    }

    pub async fn dead_letters(&self) -> Result<Vec<DeadLetterRecord>, QueueError> {
        self.dead_letters.records().await
    }

    /// Spawns every enabled stage's worker pool.
    pub fn start(&self) -> PipelineHandle {
        let cancel = CancellationToken::new();
        let pools: Vec<StageWorkerPool> = self
            .stages
            .iter()
            .map(|stage| StageWorkerPool::spawn(stage.clone(), cancel.clone()))
            .collect();

        PipelineStarted {
            stages: pools.len(),
            workers: pools.iter().map(StageWorkerPool::len).sum(),
        }
        .log();

        PipelineHandle {
            cancel,
            pools,
            started: Instant::now(),
        }
    }
}

/// Running worker pools, stopped cooperatively through one token.
pub struct PipelineHandle {
    cancel: CancellationToken,
    pools: Vec<StageWorkerPool>,
    started: Instant,
}

impl PipelineHandle {
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn worker_count(&self) -> usize {
        self.pools.iter().map(StageWorkerPool::len).sum()
    }

    /// Cancels every worker and waits for all of them. In-progress handler
    /// attempts are dropped and their leases released.
    pub async fn shutdown(self) -> Vec<WorkerReport> {
        self.cancel.cancel();

        let mut reports = Vec::new();
        for pool in self.pools {
            reports.extend(pool.join().await);
        }

        PipelineStopped {
            workers: reports.len(),
            completed: reports.iter().map(|r| r.completed).sum(),
            failed: reports.iter().map(WorkerReport::unsuccessful).sum(),
            elapsed: self.started.elapsed(),
        }
        .log();
        reports
    }
}
