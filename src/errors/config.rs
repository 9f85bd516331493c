// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while reading a pipeline configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse pipeline config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A `${name}` placeholder had no value in `variables` or the environment
    #[error("template variable '{0}' is not defined in `variables` or the environment")]
    UndefinedVariable(String),

    #[error("unterminated template placeholder in '{0}'")]
    UnterminatedPlaceholder(String),

    #[error("pipeline topology validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Errors that can occur during topology validation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Two stages share a name
    #[error("Duplicate stage name: '{stage}'")]
    DuplicateStage { stage: String },

    /// Two enabled stages would consume from the same queue
    #[error("Queue '{queue}' is used by both stage '{first}' and stage '{second}'")]
    DuplicateQueue {
        queue: String,
        first: String,
        second: String,
    },

    /// An enabled stage has no input patterns, so nothing can ever reach it
    #[error("Stage '{stage}' is enabled but declares no input patterns")]
    NoInputs { stage: String },

    /// An input pattern failed structural checks
    #[error("Stage '{stage}' input #{index} is invalid: {reason}")]
    InvalidPattern {
        stage: String,
        index: usize,
        reason: String,
    },

    /// An enabled stage references a handler nobody registered
    #[error("Stage '{stage}' uses handler '{handler}' which is not registered")]
    UnknownHandler { stage: String, handler: String },

    #[error("Stage '{stage}' must run at least one worker")]
    ZeroWorkers { stage: String },

    #[error("Stage '{stage}' must allow at least one delivery (max_receive_count > 0)")]
    ZeroReceiveCount { stage: String },

    #[error("Stage '{stage}' has a zero {field}")]
    ZeroDuration { stage: String, field: &'static str },

    /// The lease would lapse while the handler may still be running
    #[error(
        "Stage '{stage}' visibility timeout ({visibility_timeout:?}) must be longer than its handler timeout ({handler_timeout:?})"
    )]
    LeaseShorterThanBudget {
        stage: String,
        visibility_timeout: Duration,
        handler_timeout: Duration,
    },

    /// Completion events would route back into a stage that produced them
    #[error("Cyclic routing detected: {}", cycle.join(" -> "))]
    CyclicRouting { cycle: Vec<String> },
}
