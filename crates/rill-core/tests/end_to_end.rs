use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::json;
use tokio::sync::Mutex;

use rill_core::app::{BuildContext, Stream};
use rill_core::domain::{
    ConsumerOptions, HandlerRef, Operation, Record, RecordInput, Schema, StreamError, StreamProps,
    Target, Timestamp,
};
use rill_core::impls::{ConsumerDispatcher, DispatchOutcome, RetryPolicy, SimulatorBackend};
use rill_core::ports::{ConsumerHandler, Fetched, FixedClock, HandlerError, StreamClient};

const HOUR: Duration = Duration::from_secs(60 * 60);

fn clock() -> FixedClock {
    FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap())
}

fn sim_context(clock: &FixedClock) -> BuildContext {
    BuildContext::new(Target::Sim).with_clock(Arc::new(clock.clone()))
}

#[tokio::test]
async fn ingest_put_get_then_expire() {
    let clock = clock();
    let mut ctx = sim_context(&clock);
    let props = StreamProps::new()
        .with_horizon(HOUR)
        .with_read(2)
        .with_write(2);
    let stream =
        Stream::with_schema(&mut ctx, "Events", props, Schema::object([("x", Schema::Number)]))
            .unwrap();

    let t = Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap());
    let record = stream
        .ingest(
            RecordInput::new(json!({ "x": 1 }))
                .with_id("a")
                .with_timestamp(t),
        )
        .unwrap();
    assert_eq!(record.id().as_str(), "a");
    assert_eq!(record.timestamp(), t);

    // the runtime only sees the serialized manifest
    let manifest_json = stream.client_manifest().to_json().unwrap();
    let backend = SimulatorBackend::new(Arc::new(clock.clone()));
    let client = backend.connect(&manifest_json).await.unwrap();

    client.put(vec![record.clone()]).await.unwrap();
    assert_eq!(client.get().await.unwrap(), Some(Fetched::One(record)));

    clock.advance(2 * HOUR);
    assert_eq!(client.get().await.unwrap(), None);
}

#[tokio::test]
async fn wire_envelope_survives_the_trip() {
    let clock = clock();
    let mut ctx = sim_context(&clock);
    let stream = Stream::with_schema(
        &mut ctx,
        "wire",
        StreamProps::default(),
        Schema::object([("x", Schema::Number)]),
    )
    .unwrap();
    let record = stream
        .ingest(RecordInput::new(json!({ "x": 2.5 })).with_id("w1"))
        .unwrap();

    let wire = record.encode();
    let decoded = Record::decode(&wire).unwrap();
    assert_eq!(decoded, record);
    assert_eq!(decoded.encode(), wire);
}

#[test]
fn push_only_provider_rejects_get_at_build_time() {
    let mut ctx = BuildContext::new(Target::Azure);
    let stream = Stream::new(&mut ctx, "hub", StreamProps::default()).unwrap();

    assert!(stream.require_operations(&[Operation::Put]).is_ok());
    let err = stream
        .require_operations(&[Operation::Put, Operation::Get])
        .unwrap_err();
    assert_eq!(
        err,
        StreamError::UnsupportedOperation {
            operation: Operation::Get,
            provider: "partitioned_log".to_string(),
        }
    );
}

struct Collect(Mutex<Vec<Record>>);

#[async_trait]
impl ConsumerHandler for Collect {
    async fn handle(&self, records: &[Record]) -> Result<(), HandlerError> {
        self.0.lock().await.extend_from_slice(records);
        Ok(())
    }
}

#[tokio::test]
async fn bound_consumer_receives_records_in_order() {
    let clock = clock();
    let mut ctx = sim_context(&clock);
    let mut stream = Stream::new(&mut ctx, "orders", StreamProps::default()).unwrap();
    let descriptor = stream
        .set_consumer(
            HandlerRef::new("audit", "bundle/audit.js"),
            ConsumerOptions::default()
                .with_max_batch_size(10)
                .with_max_wait(Duration::from_millis(20)),
        )
        .unwrap();
    let manifest = stream.client_manifest();

    let backend = SimulatorBackend::new(Arc::new(clock.clone()));
    let producer = backend.connect(&manifest.to_json().unwrap()).await.unwrap();
    let consumer = backend.connect_consumer(&manifest, &descriptor).await.unwrap();

    let records: Vec<Record> = (0..3)
        .map(|i| {
            stream
                .ingest(RecordInput::new(json!({ "n": i })).with_id(format!("o{i}")))
                .unwrap()
        })
        .collect();
    producer.put(records.clone()).await.unwrap();

    let handler = Arc::new(Collect(Mutex::new(Vec::new())));
    let dispatcher = ConsumerDispatcher::new(
        Arc::new(consumer),
        handler.clone(),
        stream.bindings()[0].clone(),
    )
    .with_retry(RetryPolicy::new(Duration::from_millis(1), 2.0, 2));

    assert_eq!(
        dispatcher.poll_once().await.unwrap(),
        DispatchOutcome::Delivered {
            records: 3,
            attempts: 1
        }
    );
    assert_eq!(*handler.0.lock().await, records);
    assert_eq!(dispatcher.poll_once().await.unwrap(), DispatchOutcome::Idle);
}
