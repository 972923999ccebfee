//! Projection processor for feeding events to projections.

use event_store::{EventEnvelope, EventStore};
use futures_util::StreamExt;

use crate::Result;
use crate::projection::Projection;

/// Processes events from an event store and delivers them to projections.
///
/// Supports catch-up (replay everything a projection hasn't seen), single
/// event delivery, and full rebuilds.
pub struct ProjectionProcessor<S: EventStore> {
    store: S,
    projections: Vec<Box<dyn Projection>>,
}

impl<S: EventStore> ProjectionProcessor<S> {
    /// Creates a new processor with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            projections: Vec::new(),
        }
    }

    /// Registers a projection with this processor.
    pub fn register(&mut self, projection: Box<dyn Projection>) {
        self.projections.push(projection);
    }

    /// Returns the number of registered projections.
    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    /// Runs catch-up processing: streams all events from the store and
    /// delivers them to each projection that hasn't already seen them.
    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<()> {
        let mut stream = self.store.stream_all_events().await?;
        let mut event_index: u64 = 0;

        while let Some(result) = stream.next().await {
            let event = result?;
            event_index += 1;

            for projection in &self.projections {
                let pos = projection.position().await;
                if pos.events_processed < event_index {
                    projection.handle(&event).await?;
                    metrics::counter!("projections_events_processed").increment(1);
                }
            }
        }

        tracing::debug!(events_processed = event_index, "catch-up complete");

        Ok(())
    }

    /// Delivers a single event to all registered projections.
    #[tracing::instrument(skip(self, event), fields(event_type = %event.event_type))]
    pub async fn process_event(&self, event: &EventEnvelope) -> Result<()> {
        for projection in &self.projections {
            projection.handle(event).await?;
        }
        Ok(())
    }

    /// Resets all projections and replays all events from the store.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<()> {
        for projection in &self.projections {
            projection.reset().await?;
        }
        self.run_catch_up().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::ProjectionPosition;
    use async_trait::async_trait;
    use common::AggregateId;
    use event_store::{AppendOptions, InMemoryEventStore, Version};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// A simple counting projection for testing.
    struct CountingProjection {
        count: Arc<RwLock<u64>>,
        position: Arc<RwLock<ProjectionPosition>>,
    }

    impl CountingProjection {
        fn new() -> Self {
            Self {
                count: Arc::new(RwLock::new(0)),
                position: Arc::new(RwLock::new(ProjectionPosition::zero())),
            }
        }
    }

    #[async_trait]
    impl Projection for CountingProjection {
        fn name(&self) -> &'static str {
            "CountingProjection"
        }

        async fn handle(&self, _event: &EventEnvelope) -> Result<()> {
            *self.count.write().await += 1;
            let mut pos = self.position.write().await;
            *pos = pos.advance();
            Ok(())
        }

        async fn position(&self) -> ProjectionPosition {
            *self.position.read().await
        }

        async fn reset(&self) -> Result<()> {
            *self.count.write().await = 0;
            *self.position.write().await = ProjectionPosition::zero();
            Ok(())
        }
    }

    fn test_event(aggregate_id: AggregateId, version: Version) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(aggregate_id)
            .aggregate_type("Booking")
            .event_type("BookingCreated")
            .version(version)
            .payload_raw(serde_json::json!({}))
            .build()
    }

    #[tokio::test]
    async fn catch_up_processes_all_events() {
        let store = InMemoryEventStore::new();
        let agg_id = AggregateId::new();

        store
            .append(
                vec![
                    test_event(agg_id, Version::new(1)),
                    test_event(agg_id, Version::new(2)),
                ],
                AppendOptions::new(),
            )
            .await
            .unwrap();

        let projection = CountingProjection::new();
        let count = projection.count.clone();

        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(projection));
        processor.run_catch_up().await.unwrap();

        assert_eq!(*count.read().await, 2);
    }

    #[tokio::test]
    async fn catch_up_is_incremental() {
        let store = InMemoryEventStore::new();
        let agg_id = AggregateId::new();

        store
            .append(
                vec![test_event(agg_id, Version::new(1))],
                AppendOptions::new(),
            )
            .await
            .unwrap();

        let projection = CountingProjection::new();
        let count = projection.count.clone();

        let mut processor = ProjectionProcessor::new(store.clone());
        processor.register(Box::new(projection));
        processor.run_catch_up().await.unwrap();
        assert_eq!(*count.read().await, 1);

        // A second catch-up without new events delivers nothing twice.
        processor.run_catch_up().await.unwrap();
        assert_eq!(*count.read().await, 1);

        store
            .append(
                vec![test_event(agg_id, Version::new(2))],
                AppendOptions::new(),
            )
            .await
            .unwrap();
        processor.run_catch_up().await.unwrap();
        assert_eq!(*count.read().await, 2);
    }

    #[tokio::test]
    async fn rebuild_resets_then_replays() {
        let store = InMemoryEventStore::new();
        let agg_id = AggregateId::new();

        store
            .append(
                vec![test_event(agg_id, Version::new(1))],
                AppendOptions::new(),
            )
            .await
            .unwrap();

        let projection = CountingProjection::new();
        let count = projection.count.clone();

        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(projection));
        processor.run_catch_up().await.unwrap();
        processor.rebuild_all().await.unwrap();

        assert_eq!(*count.read().await, 1);
    }
}
