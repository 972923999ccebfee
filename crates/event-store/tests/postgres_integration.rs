//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p event-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use event_store::{
    AggregateId, AppendOptions, EventEnvelope, EventStore, EventStoreError, PostgresEventStore,
    Version,
};
use futures_util::StreamExt;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for the schema setup
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/0001_create_domain_events.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and a cleared table
async fn get_test_store() -> PostgresEventStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE domain_events")
        .execute(&pool)
        .await
        .unwrap();

    PostgresEventStore::new(pool)
}

fn seating_event(aggregate_id: AggregateId, version: Version, event_type: &str) -> EventEnvelope {
    EventEnvelope::builder()
        .aggregate_id(aggregate_id)
        .aggregate_type("ScreeningSeating")
        .event_type(event_type)
        .version(version)
        .payload_raw(serde_json::json!({"seats": ["A1", "A2"]}))
        .build()
}

#[tokio::test]
#[serial_test::serial]
async fn append_and_retrieve_events() {
    let store = get_test_store().await;
    let aggregate_id = AggregateId::new();

    let event = seating_event(aggregate_id, Version::first(), "SeatingOpened");
    let result = store.append(vec![event], AppendOptions::expect_new()).await;
    assert_eq!(result.unwrap(), Version::first());

    let events = store.events_for_aggregate(aggregate_id).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "SeatingOpened");
    assert_eq!(events[0].version, Version::first());
}

#[tokio::test]
#[serial_test::serial]
async fn append_batch_is_atomic() {
    let store = get_test_store().await;
    let aggregate_id = AggregateId::new();

    let events = vec![
        seating_event(aggregate_id, Version::new(1), "SeatingOpened"),
        seating_event(aggregate_id, Version::new(2), "SeatsHeld"),
        seating_event(aggregate_id, Version::new(3), "SeatsReleased"),
    ];

    let result = store.append(events, AppendOptions::expect_new()).await;
    assert_eq!(result.unwrap(), Version::new(3));

    let stored = store.events_for_aggregate(aggregate_id).await.unwrap();
    assert_eq!(stored.len(), 3);
}

#[tokio::test]
#[serial_test::serial]
async fn stale_expected_version_is_rejected() {
    let store = get_test_store().await;
    let aggregate_id = AggregateId::new();

    store
        .append(
            vec![seating_event(aggregate_id, Version::first(), "SeatingOpened")],
            AppendOptions::expect_new(),
        )
        .await
        .unwrap();

    let result = store
        .append(
            vec![seating_event(aggregate_id, Version::first(), "SeatsHeld")],
            AppendOptions::expect_new(),
        )
        .await;

    assert!(matches!(
        result,
        Err(EventStoreError::ConcurrencyConflict { .. })
    ));

    // The losing append must leave no partial state behind.
    let stored = store.events_for_aggregate(aggregate_id).await.unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
#[serial_test::serial]
async fn unique_constraint_backstops_unchecked_appends() {
    let store = get_test_store().await;
    let aggregate_id = AggregateId::new();

    store
        .append(
            vec![seating_event(aggregate_id, Version::first(), "SeatingOpened")],
            AppendOptions::new(),
        )
        .await
        .unwrap();

    // Same version, no expected-version check: the DB constraint must fire.
    let result = store
        .append(
            vec![seating_event(aggregate_id, Version::first(), "SeatsHeld")],
            AppendOptions::new(),
        )
        .await;

    assert!(matches!(
        result,
        Err(EventStoreError::ConcurrencyConflict { .. })
    ));
}

#[tokio::test]
#[serial_test::serial]
async fn concurrent_appends_only_one_wins() {
    let store = get_test_store().await;
    let aggregate_id = AggregateId::new();

    store
        .append(
            vec![seating_event(aggregate_id, Version::first(), "SeatingOpened")],
            AppendOptions::expect_new(),
        )
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .append(
                    vec![seating_event(aggregate_id, Version::new(2), "SeatsHeld")],
                    AppendOptions::expect_version(Version::first()),
                )
                .await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }

    assert_eq!(successes, 1);
    let stored = store.events_for_aggregate(aggregate_id).await.unwrap();
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
#[serial_test::serial]
async fn events_by_type_across_aggregates() {
    let store = get_test_store().await;
    let id1 = AggregateId::new();
    let id2 = AggregateId::new();

    store
        .append(
            vec![seating_event(id1, Version::first(), "SeatsHeld")],
            AppendOptions::new(),
        )
        .await
        .unwrap();
    store
        .append(
            vec![seating_event(id2, Version::first(), "SeatsHeld")],
            AppendOptions::new(),
        )
        .await
        .unwrap();

    let held = store.events_by_type("SeatsHeld").await.unwrap();
    assert_eq!(held.len(), 2);
}

#[tokio::test]
#[serial_test::serial]
async fn stream_all_events_in_global_order() {
    let store = get_test_store().await;
    let id1 = AggregateId::new();
    let id2 = AggregateId::new();

    store
        .append(
            vec![seating_event(id1, Version::first(), "SeatingOpened")],
            AppendOptions::new(),
        )
        .await
        .unwrap();
    store
        .append(
            vec![seating_event(id2, Version::first(), "SeatingOpened")],
            AppendOptions::new(),
        )
        .await
        .unwrap();

    let stream = store.stream_all_events().await.unwrap();
    let events: Vec<_> = stream.collect().await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].as_ref().unwrap().aggregate_id, id1);
    assert_eq!(events[1].as_ref().unwrap().aggregate_id, id2);
}

#[tokio::test]
#[serial_test::serial]
async fn aggregate_version_reflects_latest_event() {
    let store = get_test_store().await;
    let aggregate_id = AggregateId::new();

    assert!(
        store
            .aggregate_version(aggregate_id)
            .await
            .unwrap()
            .is_none()
    );

    store
        .append(
            vec![
                seating_event(aggregate_id, Version::new(1), "SeatingOpened"),
                seating_event(aggregate_id, Version::new(2), "SeatsHeld"),
            ],
            AppendOptions::new(),
        )
        .await
        .unwrap();

    assert_eq!(
        store.aggregate_version(aggregate_id).await.unwrap(),
        Some(Version::new(2))
    );
}
