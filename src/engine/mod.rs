// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod completion;
pub mod controller;
pub mod worker_pool;

pub use completion::completion_envelope;
pub use controller::{register_stage, PipelineController, PipelineHandle, RegisteredStage};
pub use worker_pool::{AttemptOutcome, StageRuntime, StageWorkerPool, WorkerOptions, WorkerReport};
