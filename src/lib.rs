// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;   // stage handler implementations
pub mod bus;        // publish + fan-out
pub mod config;     // config, topology, validation
pub mod engine;     // worker pools + controller
pub mod errors;     // error handling
pub mod events;     // envelopes and payloads
pub mod logging;
pub mod observability;
pub mod queue;      // leases, redelivery, dead letters
pub mod routing;    // patterns and route bindings
pub mod traits;     // handler abstraction
