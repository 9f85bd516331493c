// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Topology validation, run once before a pipeline is wired.
//!
//! # Validation Pipeline
//!
//! 1. **Uniqueness**: stage names are unique across the whole table and
//!    enabled stages do not share a queue
//! 2. **Per-stage checks** (enabled stages only): at least one input,
//!    structurally valid patterns, a registered handler, non-zero workers,
//!    deliveries and durations, and a lease window that outlasts the
//!    handler budget
//! 3. **Cycle detection**: DFS over the stage graph, where an edge A -> B
//!    exists when A's output `detail_type` is named exactly by one of B's
//!    inputs. Only run when the earlier checks pass.
//!
//! All errors from steps 1 and 2 are accumulated so an operator sees every
//! problem at once.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::config::{HandlerMap, StageDefinition, Topology};
use crate::errors::ValidationError;
use crate::observability::messages::validation::{
    CyclicRoutingDetected, ValidationCompleted, ValidationFailed, ValidationStarted,
};
use crate::observability::messages::StructuredLog;

/// Validates a topology against the handlers available to run it.
///
/// # Returns
///
/// * `Ok(())` - Safe to wire
/// * `Err(Vec<ValidationError>)` - Every problem found
pub fn validate_topology(
    topology: &Topology,
    handlers: &HandlerMap,
) -> Result<(), Vec<ValidationError>> {
    ValidationStarted {
        stage_count: topology.stages().len(),
        enabled_count: topology.enabled_stages().count(),
    }
    .log();

    let mut errors = validate_unique_stage_names(topology);
    errors.extend(validate_unique_queue_names(topology));
    for stage in topology.enabled_stages() {
        errors.extend(validate_stage(stage, handlers));
    }

    if errors.is_empty() {
        if let Err(cycle_error) = validate_acyclic_routing(topology) {
            errors.push(cycle_error);
        }
    }

    if errors.is_empty() {
        ValidationCompleted {
            stage_count: topology.stages().len(),
        }
        .log();
        Ok(())
    } else {
        ValidationFailed {
            error_count: errors.len(),
        }
        .log();
        Err(errors)
    }
}

fn validate_unique_stage_names(topology: &Topology) -> Vec<ValidationError> {
    let mut seen = HashSet::new();
    topology
        .stages()
        .iter()
        .filter(|stage| !seen.insert(stage.name.as_str()))
        .map(|stage| ValidationError::DuplicateStage {
            stage: stage.name.clone(),
        })
        .collect()
}

fn validate_unique_queue_names(topology: &Topology) -> Vec<ValidationError> {
    let mut owners: HashMap<&str, &str> = HashMap::new();
    let mut errors = Vec::new();
    for stage in topology.enabled_stages() {
        match owners.get(stage.queue_name.as_str()) {
            Some(first) => errors.push(ValidationError::DuplicateQueue {
                queue: stage.queue_name.clone(),
                first: first.to_string(),
                second: stage.name.clone(),
            }),
            None => {
                owners.insert(stage.queue_name.as_str(), stage.name.as_str());
            }
        }
    }
    errors
}

fn validate_stage(stage: &StageDefinition, handlers: &HandlerMap) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if stage.inputs.is_empty() {
        errors.push(ValidationError::NoInputs {
            stage: stage.name.clone(),
        });
    }

    for (index, pattern) in stage.inputs.iter().enumerate() {
        if let Err(reason) = pattern.validate() {
            errors.push(ValidationError::InvalidPattern {
                stage: stage.name.clone(),
                index,
                reason,
            });
        }
    }

    if !handlers.contains_key(&stage.handler) {
        errors.push(ValidationError::UnknownHandler {
            stage: stage.name.clone(),
            handler: stage.handler.clone(),
        });
    }

    if stage.worker.workers == 0 {
        errors.push(ValidationError::ZeroWorkers {
            stage: stage.name.clone(),
        });
    }

    if stage.queue.max_receive_count == 0 {
        errors.push(ValidationError::ZeroReceiveCount {
            stage: stage.name.clone(),
        });
    }

    let durations: [(&'static str, Duration); 5] = [
        ("visibility timeout", stage.worker.visibility_timeout),
        ("retention", stage.queue.retention),
        ("handler timeout", stage.worker.handler_timeout),
        ("poll interval", stage.worker.poll_interval),
        ("max poll interval", stage.worker.max_poll_interval),
    ];
    for (field, duration) in durations {
        if duration.is_zero() {
            errors.push(ValidationError::ZeroDuration {
                stage: stage.name.clone(),
                field,
            });
        }
    }

    // a lease that lapses mid-attempt hands the item to a second worker
    if stage.worker.handler_timeout >= stage.worker.visibility_timeout {
        errors.push(ValidationError::LeaseShorterThanBudget {
            stage: stage.name.clone(),
            visibility_timeout: stage.worker.visibility_timeout,
            handler_timeout: stage.worker.handler_timeout,
        });
    }

    errors
}

/// Three-colour DFS over the routing graph of enabled stages.
///
/// Gray nodes are on the current path; reaching one again closes a cycle,
/// which is reported as the path segment from that node back to itself.
fn validate_acyclic_routing(topology: &Topology) -> Result<(), ValidationError> {
    let stages: Vec<&StageDefinition> = topology.enabled_stages().collect();

    let mut graph: HashMap<&str, Vec<&str>> = HashMap::new();
    for producer in &stages {
        let consumers = stages
            .iter()
            .filter(|consumer| {
                consumer.inputs.iter().any(|pattern| {
                    pattern
                        .exact_detail_types()
                        .contains(&producer.output_detail_type)
                })
            })
            .map(|consumer| consumer.name.as_str())
            .collect();
        graph.insert(producer.name.as_str(), consumers);
    }

    let mut visited = HashSet::new();
    let mut on_path = HashSet::new();
    let mut path = Vec::new();

    // walk in table order so the reported cycle is stable
    for stage in &stages {
        if !visited.contains(stage.name.as_str()) {
            if let Some(cycle) = dfs_cycle(
                stage.name.as_str(),
                &graph,
                &mut visited,
                &mut on_path,
                &mut path,
            ) {
                let labels: Vec<&str> = cycle.iter().map(String::as_str).collect();
                CyclicRoutingDetected { cycle: &labels }.log();
                return Err(ValidationError::CyclicRouting { cycle });
            }
        }
    }
    Ok(())
}

fn dfs_cycle<'a>(
    node: &'a str,
    graph: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    on_path: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    visited.insert(node);
    on_path.insert(node);
    path.push(node);

    for &next in graph.get(node).into_iter().flatten() {
        if on_path.contains(next) {
            let start = path.iter().position(|n| *n == next).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
            cycle.push(next.to_string());
            return Some(cycle);
        }
        if !visited.contains(next) {
            if let Some(cycle) = dfs_cycle(next, graph, visited, on_path, path) {
                return Some(cycle);
            }
        }
    }

    on_path.remove(node);
    path.pop();
    None
}
