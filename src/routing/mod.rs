// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Declarative event routing: patterns and the table of bindings that maps
//! envelopes to destination queues.

pub mod pattern;
pub mod table;

pub use pattern::{EventPattern, Matcher, Operator, PatternNode};
pub use table::{RouteBinding, RoutingTable, RoutingTableBuilder};
