use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rill_core::app::{BuildContext, ClientManifest, Stream};
use rill_core::domain::{
    BindingDescriptor, ConsumerBinding, ConsumerOptions, HandlerRef, Operation, Record,
    RecordInput, Schema, StreamProps, Target,
};
use rill_core::impls::{ConsumerDispatcher, RetryPolicy, SimulatorBackend};
use rill_core::ports::{ConsumerHandler, HandlerError, StreamClient, SystemClock};

#[derive(Debug, Deserialize)]
struct Reading {
    x: f64,
}

/// handler: 最初の n 回はわざと失敗する
struct PrintHandler {
    remaining_failures: AtomicU32,
}

impl PrintHandler {
    fn new(n: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(n),
        }
    }
}

#[async_trait]
impl ConsumerHandler for PrintHandler {
    async fn handle(&self, records: &[Record]) -> Result<(), HandlerError> {
        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(HandlerError::new(format!("intentional failure (left={left})")));
        }

        for record in records {
            let reading: Reading = serde_json::from_value(record.payload().clone())
                .map_err(|e| HandlerError::new(format!("json decode: {e}")))?;
            println!("consumed: id={} x={}", record.id(), reading.x);
        }
        Ok(())
    }
}

/// props は JSON ファイルから（省略時はデフォルト）
fn load_props() -> Result<StreamProps, Box<dyn Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&raw)?)
        }
        None => Ok(StreamProps::default()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // --- build time ---
    let mut ctx = BuildContext::new(Target::Sim);
    let mut stream = Stream::with_schema(
        &mut ctx,
        "Readings",
        load_props()?,
        Schema::object([("x", Schema::Number)]),
    )?;
    stream.require_operations(&[Operation::Put, Operation::Get, Operation::Metadata])?;

    let descriptor = stream.set_consumer(
        HandlerRef::new("print-readings", "bundle/print.js"),
        ConsumerOptions::default().with_max_wait(Duration::from_millis(200)),
    )?;
    let descriptor_json = serde_json::to_string_pretty(&descriptor)?;
    println!("binding: {descriptor_json}");

    // records leave the build stage as envelopes
    let wire = [1.0, 2.5, 4.0]
        .iter()
        .map(|x| stream.ingest(RecordInput::new(json!({ "x": x }))).map(|r| r.encode()))
        .collect::<Result<Vec<_>, _>>()?;

    let manifest_json = stream.client_manifest().to_json()?;
    println!("manifest: {manifest_json}");

    // --- run time: only the serialized manifest, descriptor and envelopes cross over ---
    let manifest = ClientManifest::from_json(&manifest_json)?;
    let descriptor: BindingDescriptor = serde_json::from_str(&descriptor_json)?;
    let backend = SimulatorBackend::new(Arc::new(SystemClock));
    let producer = backend.connect(&manifest_json).await?;
    let consumer = backend.connect_consumer(&manifest, &descriptor).await?;

    let records = wire
        .iter()
        .map(|s| Record::decode(s))
        .collect::<Result<Vec<_>, _>>()?;
    producer.put(records).await?;

    if let Some(fetched) = producer.get().await? {
        println!("producer view: {} record(s)", fetched.len());
    }

    let dispatcher = ConsumerDispatcher::new(
        Arc::new(consumer),
        Arc::new(PrintHandler::new(2)),
        ConsumerBinding::new(descriptor.handler.clone(), descriptor.options),
    )
    .with_retry(RetryPolicy::new(Duration::from_millis(50), 2.0, 5));

    let outcome = dispatcher.poll_once().await?;
    info!(?outcome, "dispatch finished");

    let meta = producer.metadata().await?;
    println!(
        "metadata: name={} records={} evicted={}",
        meta.name, meta.record_count, meta.evicted_count
    );
    Ok(())
}
