// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod event_bus;

pub use event_bus::{EventBus, PublishReceipt};
