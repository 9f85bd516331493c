// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod stage_handler;

pub use crate::config::HandlerMap;
pub use stage_handler::{StageHandler, StageInput, StageOutput};
