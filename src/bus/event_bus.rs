// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::PublishError;
use crate::events::{EnvelopeId, EventEnvelope};
use crate::observability::messages::bus::{EnvelopePublished, EnvelopeRejected, EnvelopeUnmatched};
use crate::observability::messages::StructuredLog;
use crate::queue::WorkQueue;
use crate::routing::RoutingTable;

/// What `publish` did with an envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishReceipt {
    pub envelope_id: EnvelopeId,
    pub published_at: DateTime<Utc>,
    /// One entry per matching binding, in table order. Empty when nothing matched.
    pub destinations: Vec<String>,
}

impl PublishReceipt {
    pub fn is_unmatched(&self) -> bool {
        self.destinations.is_empty()
    }
}

/// The distribution point between publishers and stage queues.
///
/// `publish` validates the envelope, stamps `published_at`, resolves the
/// routing table and enqueues an owned clone onto every matching queue
/// before returning. The table and queue map are fixed at construction, so
/// any number of workers can publish concurrently; each queue serializes
/// its own enqueues.
pub struct EventBus {
    routes: RoutingTable,
    queues: HashMap<String, Arc<dyn WorkQueue>>,
}

impl EventBus {
    /// Fails if two queues share a name or a binding targets a queue that
    /// is not in `queues`.
    pub fn new(
        routes: RoutingTable,
        queues: impl IntoIterator<Item = Arc<dyn WorkQueue>>,
    ) -> Result<Self, PublishError> {
        let mut by_name: HashMap<String, Arc<dyn WorkQueue>> = HashMap::new();
        for queue in queues {
            let name = queue.name().to_string();
            if by_name.contains_key(&name) {
                return Err(PublishError::DuplicateQueue(name));
            }
            by_name.insert(name, queue);
        }
        let queues = by_name;

        if let Some(binding) = routes
            .bindings()
            .iter()
            .find(|binding| !queues.contains_key(binding.destination()))
        {
            return Err(PublishError::UnknownQueue {
                route: binding.name().to_string(),
                queue: binding.destination().to_string(),
            });
        }

        Ok(Self { routes, queues })
    }

    pub fn routes(&self) -> &RoutingTable {
        &self.routes
    }

    pub fn queue(&self, name: &str) -> Option<&Arc<dyn WorkQueue>> {
        self.queues.get(name)
    }

    pub fn queues(&self) -> impl Iterator<Item = &Arc<dyn WorkQueue>> {
        self.queues.values()
    }

    pub async fn publish(&self, envelope: EventEnvelope) -> Result<PublishReceipt, PublishError> {
        if let Err(error) = envelope.validate() {
            EnvelopeRejected {
                envelope_id: &envelope.id(),
                source: envelope.source(),
                detail_type: envelope.detail_type().as_str(),
                error: &error,
            }
            .log();
            return Err(error.into());
        }

        let published_at = Utc::now();
        let envelope = envelope.stamped(published_at);
        let matched = self.routes.resolve(&envelope);

        if matched.is_empty() {
            EnvelopeUnmatched {
                envelope_id: &envelope.id(),
                source: envelope.source(),
                detail_type: envelope.detail_type().as_str(),
            }
            .log();
            return Ok(PublishReceipt {
                envelope_id: envelope.id(),
                published_at,
                destinations: Vec::new(),
            });
        }

        let mut destinations = Vec::with_capacity(matched.len());
        for binding in matched {
            let queue = self.queues.get(binding.destination()).ok_or_else(|| {
                PublishError::UnknownQueue {
                    route: binding.name().to_string(),
                    queue: binding.destination().to_string(),
                }
            })?;
            queue
                .enqueue(envelope.clone())
                .await
                .map_err(|source| PublishError::Enqueue {
                    queue: binding.destination().to_string(),
                    source,
                })?;
            destinations.push(binding.destination().to_string());
        }

        EnvelopePublished {
            envelope_id: &envelope.id(),
            detail_type: envelope.detail_type().as_str(),
            document_id: envelope.document_id(),
            destinations: &destinations,
        }
        .log();

        Ok(PublishReceipt {
            envelope_id: envelope.id(),
            published_at,
            destinations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{DetailType, IngestionDetail};
    use crate::queue::{InMemoryDeadLetterSink, InMemoryWorkQueue, QueueOptions};
    use crate::routing::{EventPattern, Matcher};
    use std::time::Duration;

    const VISIBILITY: Duration = Duration::from_secs(30);

    fn queue(name: &str) -> Arc<dyn WorkQueue> {
        Arc::new(InMemoryWorkQueue::new(
            name,
            QueueOptions::default(),
            Arc::new(InMemoryDeadLetterSink::new()),
        ))
    }

    fn ingestion_bus() -> (EventBus, Arc<dyn WorkQueue>) {
        let extraction = queue("extraction");
        let routes = RoutingTable::builder()
            .route(
                "document_extraction-0",
                EventPattern::new()
                    .source(["storage"])
                    .detail_type([DetailType::ObjectCreated])
                    .with("detail.bucket.name", vec![Matcher::exact("docs")])
                    .with("detail.object.key", vec![Matcher::prefix("jdtest/")]),
                "extraction",
            )
            .build();
        let bus = EventBus::new(routes, [extraction.clone()]).unwrap();
        (bus, extraction)
    }

    #[tokio::test]
    async fn matching_upload_lands_on_extraction_queue_once() {
        let (bus, extraction) = ingestion_bus();
        let envelope =
            EventEnvelope::object_created("storage", &IngestionDetail::new("docs", "jdtest/a.pdf"));
        let id = envelope.id();

        let receipt = bus.publish(envelope).await.unwrap();
        assert_eq!(receipt.envelope_id, id);
        assert_eq!(receipt.destinations, vec!["extraction"]);
        assert_eq!(extraction.stats().await.waiting, 1);

        let item = extraction.lease(VISIBILITY).await.unwrap().unwrap();
        assert_eq!(item.envelope().id(), id);
        assert_eq!(item.envelope().published_at(), Some(receipt.published_at));
    }

    #[tokio::test]
    async fn unmatched_upload_is_dropped_without_error() {
        let (bus, extraction) = ingestion_bus();
        let envelope =
            EventEnvelope::object_created("storage", &IngestionDetail::new("docs", "elsewhere/a.pdf"));

        let receipt = bus.publish(envelope).await.unwrap();
        assert!(receipt.is_unmatched());
        assert_eq!(extraction.stats().await.waiting, 0);
    }

    #[tokio::test]
    async fn invalid_envelope_is_rejected_before_routing() {
        let (bus, extraction) = ingestion_bus();
        let envelope = EventEnvelope::builder("stitch.worker", DetailType::DocumentExtractionCompleted)
            .status(crate::events::StageStatus::Completed)
            .build();

        let err = bus.publish(envelope).await.unwrap_err();
        assert!(matches!(err, PublishError::InvalidEnvelope(_)));
        assert_eq!(extraction.stats().await.waiting, 0);
    }

    #[tokio::test]
    async fn binding_to_unknown_queue_fails_construction() {
        let routes = RoutingTable::builder()
            .route("orphan", EventPattern::new().source(["storage"]), "missing")
            .build();
        let err = EventBus::new(routes, [queue("extraction")]).err().unwrap();
        assert!(matches!(err, PublishError::UnknownQueue { .. }));
    }

    #[tokio::test]
    async fn queues_sharing_a_name_fail_construction() {
        let routes = RoutingTable::builder()
            .route("a-0", EventPattern::new().detail_type([DetailType::from("GoA")]), "shared")
            .build();
        let err = EventBus::new(routes, [queue("shared"), queue("shared")]).err().unwrap();
        assert!(matches!(err, PublishError::DuplicateQueue(ref name) if name == "shared"));
    }

    #[tokio::test]
    async fn overlapping_bindings_on_one_queue_enqueue_one_copy_each() {
        let summary = queue("summary");
        let routes = RoutingTable::builder()
            .route(
                "summary-0",
                EventPattern::new().detail_type([DetailType::BlockStandardizationCompleted]),
                "summary",
            )
            .route(
                "summary-1",
                EventPattern::new().with("metadata.document_id", vec![Matcher::exists()]),
                "summary",
            )
            .build();
        let bus = EventBus::new(routes, [summary.clone()]).unwrap();

        let envelope =
            EventEnvelope::builder("stitch.worker", DetailType::BlockStandardizationCompleted)
                .metadata_entry("document_id", "D1")
                .status(crate::events::StageStatus::Completed)
                .build();
        let id = envelope.id();
        let receipt = bus.publish(envelope).await.unwrap();

        assert_eq!(receipt.destinations, vec!["summary", "summary"]);
        assert_eq!(summary.stats().await.waiting, 2);
        let first = summary.lease(VISIBILITY).await.unwrap().unwrap();
        let second = summary.lease(VISIBILITY).await.unwrap().unwrap();
        assert_eq!(first.envelope().id(), id);
        assert_eq!(second.envelope().id(), id);
        assert_ne!(first.receipt_handle(), second.receipt_handle());
    }

    #[tokio::test]
    async fn fan_out_copies_are_independent() {
        let summary = queue("summary");
        let features = queue("features");
        let completed = || {
            EventPattern::new().detail_type([DetailType::BlockStandardizationCompleted])
        };
        let routes = RoutingTable::builder()
            .route("summary", completed(), "summary")
            .route(
                "features",
                completed().with("metadata.feature_types", vec![Matcher::exists()]),
                "features",
            )
            .build();
        let bus = EventBus::new(routes, [summary.clone(), features.clone()]).unwrap();

        let envelope =
            EventEnvelope::builder("stitch.worker", DetailType::BlockStandardizationCompleted)
                .metadata_entry("document_id", "D1")
                .metadata_entry("feature_types", serde_json::json!(["tables"]))
                .status(crate::events::StageStatus::Completed)
                .build();
        let receipt = bus.publish(envelope).await.unwrap();
        assert_eq!(receipt.destinations, vec!["summary", "features"]);

        // resolving one copy leaves the other untouched
        let item = summary.lease(VISIBILITY).await.unwrap().unwrap();
        summary.acknowledge(item.receipt_handle()).await.unwrap();
        assert_eq!(features.stats().await.waiting, 1);
    }
}
