// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::errors::StageError;
use crate::traits::{StageHandler, StageInput, StageOutput};

/// Records every input and returns a fixed output
pub struct RecordingHandler {
    output: StageOutput,
    calls: Mutex<Vec<StageInput>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::with_output(StageOutput::new())
    }

    pub fn with_output(output: StageOutput) -> Self {
        Self {
            output,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<StageInput> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for RecordingHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl StageHandler for RecordingHandler {
    async fn handle(&self, input: StageInput) -> Result<StageOutput, StageError> {
        self.calls.lock().unwrap().push(input);
        Ok(self.output.clone())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// A handler that fails a set number of times, then succeeds
pub struct FailingHandler {
    failures: Option<u32>,
    output: StageOutput,
    attempts: AtomicU32,
}

impl FailingHandler {
    /// Never succeeds
    pub fn always() -> Self {
        Self {
            failures: None,
            output: StageOutput::new(),
            attempts: AtomicU32::new(0),
        }
    }

    /// Fails the first `failures` attempts
    pub fn times(failures: u32, output: StageOutput) -> Self {
        Self {
            failures: Some(failures),
            output,
            attempts: AtomicU32::new(0),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl StageHandler for FailingHandler {
    async fn handle(&self, _input: StageInput) -> Result<StageOutput, StageError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        match self.failures {
            Some(failures) if attempt > failures => Ok(self.output.clone()),
            _ => Err(StageError::failed(format!("simulated failure #{attempt}"))),
        }
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Sleeps before answering, for exercising the handler time budget.
/// Tracks how many invocations overlap.
pub struct SlowHandler {
    delay: Duration,
    output: StageOutput,
    calls: AtomicU32,
    running: AtomicU32,
    peak: AtomicU32,
}

impl SlowHandler {
    pub fn new(delay: Duration, output: StageOutput) -> Self {
        Self {
            delay,
            output,
            calls: AtomicU32::new(0),
            running: AtomicU32::new(0),
            peak: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most invocations ever in progress at once
    pub fn peak_concurrency(&self) -> u32 {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Decrements the running count even when the attempt is dropped mid-sleep.
struct RunningGuard<'a>(&'a AtomicU32);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl StageHandler for SlowHandler {
    async fn handle(&self, _input: StageInput) -> Result<StageOutput, StageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_running, Ordering::SeqCst);
        let _guard = RunningGuard(&self.running);

        tokio::time::sleep(self.delay).await;
        Ok(self.output.clone())
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}
