// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod handler_map;
mod loader;
mod secrets;
mod topology;
mod validation;

#[cfg(test)]
mod integration_tests;
pub mod consts;

pub use handler_map::HandlerMap;
pub use loader::{
    load_and_validate_config, load_config, parse_config, Config, DeadLetterConfig, NamingConfig,
    StageConfig, StageTuning,
};
pub use secrets::{EnvSecretsProvider, SecretsProvider, StageSecrets, StaticSecretsProvider};
pub use topology::{StageDefinition, Topology, TopologyBuilder};
pub use validation::validate_topology;
