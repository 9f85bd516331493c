// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeSet;

use super::pattern::EventPattern;
use crate::events::EventEnvelope;

/// A pattern-to-queue mapping. Static once the table is built.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteBinding {
    name: String,
    pattern: EventPattern,
    destination: String,
}

impl RouteBinding {
    pub fn new(
        name: impl Into<String>,
        pattern: EventPattern,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            pattern,
            destination: destination.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &EventPattern {
        &self.pattern
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }
}

/// The full set of route bindings, read-only after construction.
///
/// Resolution is a linear scan that returns every matching binding: bindings
/// are OR-composed, so their order has no effect on the result set, only on
/// the order destinations are reported in.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    bindings: Vec<RouteBinding>,
}

impl RoutingTable {
    pub fn builder() -> RoutingTableBuilder {
        RoutingTableBuilder::default()
    }

    /// Every binding whose pattern matches `envelope`.
    pub fn resolve<'a>(&'a self, envelope: &EventEnvelope) -> Vec<&'a RouteBinding> {
        self.bindings
            .iter()
            .filter(|binding| binding.pattern.matches(envelope))
            .collect()
    }

    pub fn bindings(&self) -> &[RouteBinding] {
        &self.bindings
    }

    /// Distinct destination queue names referenced by any binding.
    pub fn destinations(&self) -> BTreeSet<&str> {
        self.bindings.iter().map(|b| b.destination.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct RoutingTableBuilder {
    bindings: Vec<RouteBinding>,
}

impl RoutingTableBuilder {
    pub fn bind(mut self, binding: RouteBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn route(
        self,
        name: impl Into<String>,
        pattern: EventPattern,
        destination: impl Into<String>,
    ) -> Self {
        self.bind(RouteBinding::new(name, pattern, destination))
    }

    pub fn extend(mut self, bindings: impl IntoIterator<Item = RouteBinding>) -> Self {
        self.bindings.extend(bindings);
        self
    }

    pub fn build(self) -> RoutingTable {
        RoutingTable {
            bindings: self.bindings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::DetailType;
    use crate::routing::Matcher;

    fn standardization_fan_out() -> RoutingTable {
        let completed = || {
            EventPattern::new()
                .source(["stitch.worker"])
                .detail_type([DetailType::BlockStandardizationCompleted])
        };
        RoutingTable::builder()
            .route("document_summary-0", completed(), "summary-queue")
            .route(
                "seed_questions-0",
                completed().with("metadata.seed_questions_list", vec![Matcher::exists()]),
                "seed-questions-queue",
            )
            .route(
                "feature_extraction-0",
                completed().with("metadata.feature_types", vec![Matcher::exists()]),
                "feature-extraction-queue",
            )
            .build()
    }

    fn standardized(with_features: bool, with_questions: bool) -> EventEnvelope {
        let mut builder =
            EventEnvelope::builder("stitch.worker", DetailType::BlockStandardizationCompleted)
                .metadata_entry("document_id", "D1");
        if with_features {
            builder = builder.metadata_entry("feature_types", serde_json::json!(["tables"]));
        }
        if with_questions {
            builder = builder.metadata_entry("seed_questions_list", serde_json::json!(["why?"]));
        }
        builder.build()
    }

    fn destinations(table: &RoutingTable, envelope: &EventEnvelope) -> Vec<String> {
        table
            .resolve(envelope)
            .iter()
            .map(|b| b.destination().to_string())
            .collect()
    }

    #[test]
    fn every_matching_binding_fires() {
        let table = standardization_fan_out();
        assert_eq!(
            destinations(&table, &standardized(true, true)),
            vec!["summary-queue", "seed-questions-queue", "feature-extraction-queue"]
        );
    }

    #[test]
    fn non_matching_bindings_do_not_fire() {
        let table = standardization_fan_out();
        assert_eq!(
            destinations(&table, &standardized(true, false)),
            vec!["summary-queue", "feature-extraction-queue"]
        );
        assert_eq!(
            destinations(&table, &standardized(false, false)),
            vec!["summary-queue"]
        );
    }

    #[test]
    fn unrelated_events_resolve_to_nothing() {
        let table = standardization_fan_out();
        let envelope = EventEnvelope::builder("storage", DetailType::ObjectCreated).build();
        assert!(table.resolve(&envelope).is_empty());
    }

    #[test]
    fn destinations_are_deduplicated() {
        let table = RoutingTable::builder()
            .route("a", EventPattern::new().source(["x"]), "q1")
            .route("b", EventPattern::new().source(["y"]), "q1")
            .route("c", EventPattern::new().source(["z"]), "q2")
            .build();
        assert_eq!(table.len(), 3);
        assert_eq!(table.destinations().into_iter().collect::<Vec<_>>(), vec!["q1", "q2"]);
    }
}
