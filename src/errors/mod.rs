// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod controller;
mod envelope;
mod publish;
mod queue;
mod stage;

pub use config::{ConfigError, ValidationError};
pub use controller::ControllerError;
pub use envelope::EnvelopeError;
pub use publish::PublishError;
pub use queue::QueueError;
pub use stage::StageError;
