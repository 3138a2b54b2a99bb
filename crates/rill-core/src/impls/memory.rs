//! InMemory simulator - 開発・テスト用のストリーム実装
//!
//! # 学習ポイント
//! - tokio::sync::Mutex + Notify による bounded wait の get
//! - consumer group ごとの cursor（sequence number）
//! - horizon による eviction（Clock port 経由なのでテストで時間を進められる）
//!
//! Several clients may share one log (one per consumer group, or many
//! clones of the same client). Each group reads with its own cursor.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::app::ClientManifest;
use crate::domain::{
    BindingDescriptor, Operation, OperationSet, ProviderKind, Record, RecordId, RejectedRecord,
    Schema, StartingPosition, StreamConfig, StreamError, StreamMetadata, Timestamp,
};
use crate::ports::{Clock, Fetched, StreamClient};

/// Records accepted per `put` for each write capacity unit.
pub const RECORDS_PER_WRITE_UNIT: usize = 500;

/// Records returned per `get` for each read capacity unit.
pub const RECORDS_PER_READ_UNIT: usize = 100;

pub const DEFAULT_GROUP: &str = "default";

#[derive(Debug)]
struct Entry {
    seq: u64,
    record: Record,
}

#[derive(Debug)]
struct StreamLog {
    config: StreamConfig,
    schema: Schema,
    entries: VecDeque<Entry>,
    ids: HashSet<RecordId>,
    next_seq: u64,
    evicted: u64,
    /// group -> next sequence number to read
    cursors: HashMap<String, u64>,
}

impl StreamLog {
    fn new(config: StreamConfig, schema: Schema) -> Self {
        Self {
            config,
            schema,
            entries: VecDeque::new(),
            ids: HashSet::new(),
            next_seq: 0,
            evicted: 0,
            cursors: HashMap::new(),
        }
    }

    /// Drop records that fell behind the horizon.
    fn evict(&mut self, now: Timestamp) -> usize {
        let cutoff = self.config.retention_cutoff(now);
        let before = self.entries.len();
        let ids = &mut self.ids;
        self.entries.retain(|e| {
            let keep = e.record.timestamp() >= cutoff;
            if !keep {
                ids.remove(e.record.id());
            }
            keep
        });
        let evicted = before - self.entries.len();
        self.evicted += evicted as u64;
        evicted
    }

    fn append(&mut self, records: Vec<Record>, now: Timestamp) -> (Vec<RecordId>, Vec<RejectedRecord>) {
        let limit = self.config.write_capacity as usize * RECORDS_PER_WRITE_UNIT;
        let cutoff = self.config.retention_cutoff(now);
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        for (i, record) in records.into_iter().enumerate() {
            let id = record.id().clone();
            let rejection = if self.schema != Schema::Any && record.schema() != &self.schema {
                Some(RejectedRecord::permanent(
                    id.clone(),
                    "record schema does not match the stream schema",
                ))
            } else if record.timestamp() < cutoff {
                Some(RejectedRecord::permanent(
                    id.clone(),
                    "record is older than the stream horizon",
                ))
            } else if self.ids.contains(&id) {
                // Same id and content is a retried write.
                if self.entries.iter().any(|e| e.record == record) {
                    accepted.push(id);
                    continue;
                }
                Some(RejectedRecord::permanent(
                    id.clone(),
                    "record id already used with different content",
                ))
            } else if i >= limit {
                Some(RejectedRecord::transient(
                    id.clone(),
                    format!("write capacity of {limit} records per put exceeded"),
                ))
            } else {
                None
            };

            match rejection {
                Some(rejection) => rejected.push(rejection),
                None => {
                    self.ids.insert(id.clone());
                    self.entries.push_back(Entry {
                        seq: self.next_seq,
                        record,
                    });
                    self.next_seq += 1;
                    accepted.push(id);
                }
            }
        }
        (accepted, rejected)
    }

    fn register_cursor(&mut self, group: &str, position: StartingPosition) {
        let start = match position {
            StartingPosition::Latest => self.next_seq,
            StartingPosition::TrimHorizon => 0,
        };
        self.cursors.entry(group.to_string()).or_insert(start);
    }

    fn read(&mut self, group: &str, max: usize) -> Vec<Record> {
        let cursor = self.cursors.get(group).copied().unwrap_or(0);
        let mut last_seq = None;
        let batch: Vec<Record> = self
            .entries
            .iter()
            .filter(|e| e.seq >= cursor)
            .take(max)
            .map(|e| {
                last_seq = Some(e.seq);
                e.record.clone()
            })
            .collect();
        if let Some(seq) = last_seq {
            self.cursors.insert(group.to_string(), seq + 1);
        }
        batch
    }

    fn metadata(&self) -> StreamMetadata {
        let timestamps = self.entries.iter().map(|e| e.record.timestamp());
        StreamMetadata {
            name: self.config.name.clone(),
            record_count: self.entries.len(),
            oldest_timestamp: timestamps.clone().min(),
            newest_timestamp: timestamps.max(),
            evicted_count: self.evicted,
        }
    }
}

#[derive(Debug)]
struct SharedLog {
    state: Mutex<StreamLog>,
    notify: Notify,
}

/// Hosts simulated streams by name. Clones share the same streams.
#[derive(Clone)]
pub struct SimulatorBackend {
    streams: Arc<Mutex<HashMap<String, Arc<SharedLog>>>>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for SimulatorBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatorBackend").finish_non_exhaustive()
    }
}

impl SimulatorBackend {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            streams: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    /// Connect from a serialized client manifest using the default group.
    pub async fn connect(&self, manifest_json: &str) -> Result<InMemoryStreamClient, StreamError> {
        let manifest = ClientManifest::from_json(manifest_json)?;
        self.connect_group(&manifest, DEFAULT_GROUP, StartingPosition::TrimHorizon)
            .await
    }

    /// Client for a consumer binding: its own cursor, batch size and wait.
    pub async fn connect_consumer(
        &self,
        manifest: &ClientManifest,
        descriptor: &BindingDescriptor,
    ) -> Result<InMemoryStreamClient, StreamError> {
        let client = self
            .connect_group(
                manifest,
                descriptor.handler.id.as_str(),
                descriptor.options.starting_position,
            )
            .await?;
        Ok(client
            .with_max_batch(descriptor.options.max_batch_size as usize)
            .with_wait(descriptor.options.max_wait()))
    }

    pub async fn connect_group(
        &self,
        manifest: &ClientManifest,
        group: &str,
        position: StartingPosition,
    ) -> Result<InMemoryStreamClient, StreamError> {
        let name = manifest.config.name.clone();
        let log = {
            let mut streams = self.streams.lock().await;
            streams
                .entry(name.clone())
                .or_insert_with(|| {
                    Arc::new(SharedLog {
                        state: Mutex::new(StreamLog::new(
                            manifest.config.clone(),
                            manifest.schema.clone(),
                        )),
                        notify: Notify::new(),
                    })
                })
                .clone()
        };

        {
            let mut state = log.state.lock().await;
            if state.config != manifest.config || state.schema != manifest.schema {
                return Err(StreamError::Configuration(format!(
                    "stream `{name}` is already hosted with a different definition"
                )));
            }
            state.register_cursor(group, position);
        }

        debug!(target: "rill::client", stream = %name, group, "client connected");
        Ok(InMemoryStreamClient {
            log,
            name,
            group: group.to_string(),
            clock: self.clock.clone(),
            provider: manifest.provider,
            operations: manifest.operations.clone(),
            max_batch: manifest.config.read_capacity as usize * RECORDS_PER_READ_UNIT,
            wait: Duration::ZERO,
        })
    }
}

/// Runtime client for a simulated stream.
#[derive(Clone)]
pub struct InMemoryStreamClient {
    log: Arc<SharedLog>,
    name: String,
    group: String,
    clock: Arc<dyn Clock>,
    provider: ProviderKind,
    operations: OperationSet,
    max_batch: usize,
    wait: Duration,
}

impl fmt::Debug for InMemoryStreamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryStreamClient")
            .field("name", &self.name)
            .field("group", &self.group)
            .field("provider", &self.provider)
            .field("operations", &self.operations)
            .field("max_batch", &self.max_batch)
            .field("wait", &self.wait)
            .finish_non_exhaustive()
    }
}

impl InMemoryStreamClient {
    /// How long `get` waits for data before returning `None`.
    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch.max(1);
        self
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    fn ensure(&self, operation: Operation) -> Result<(), StreamError> {
        if self.operations.contains(&operation) {
            Ok(())
        } else {
            Err(StreamError::UnsupportedOperation {
                operation,
                provider: self.provider.to_string(),
            })
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::from_datetime(self.clock.now())
    }
}

#[async_trait]
impl StreamClient for InMemoryStreamClient {
    async fn put(&self, records: Vec<Record>) -> Result<(), StreamError> {
        self.ensure(Operation::Put)?;
        if records.is_empty() {
            return Err(StreamError::EmptyBatch);
        }
        let count = records.len();

        let (accepted, rejected) = {
            let mut state = self.log.state.lock().await;
            let now = self.now();
            state.evict(now);
            state.append(records, now)
        };
        if !accepted.is_empty() {
            self.log.notify.notify_waiters();
        }

        if rejected.is_empty() {
            debug!(target: "rill::client", stream = %self.name, records = count, "put");
            Ok(())
        } else {
            warn!(
                target: "rill::client",
                stream = %self.name,
                accepted = accepted.len(),
                rejected = rejected.len(),
                "put partially failed"
            );
            Err(StreamError::PartialPut { accepted, rejected })
        }
    }

    async fn get(&self) -> Result<Option<Fetched>, StreamError> {
        self.ensure(Operation::Get)?;
        let deadline = Instant::now() + self.wait;

        loop {
            // Register interest before looking, so a put in between is not missed.
            let notified = self.log.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.log.state.lock().await;
                let evicted = state.evict(self.now());
                if evicted > 0 {
                    debug!(target: "rill::client", stream = %self.name, evicted, "evicted expired records");
                }
                let batch = state.read(&self.group, self.max_batch);
                if !batch.is_empty() {
                    debug!(
                        target: "rill::client",
                        stream = %self.name,
                        group = %self.group,
                        records = batch.len(),
                        "get"
                    );
                    return Ok(Fetched::from_batch(batch));
                }
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }
            let _ = tokio::time::timeout_at(deadline, notified).await;
        }
    }

    async fn metadata(&self) -> Result<StreamMetadata, StreamError> {
        self.ensure(Operation::Metadata)?;
        let mut state = self.log.state.lock().await;
        state.evict(self.now());
        Ok(state.metadata())
    }

    async fn schema(&self) -> Result<Record, StreamError> {
        self.ensure(Operation::Schema)?;
        let state = self.log.state.lock().await;
        Ok(Record::schema_carrier(
            RecordId::new(format!("{}.schema", self.name)),
            self.now(),
            &state.schema,
        ))
    }

    async fn config(&self) -> Result<serde_json::Value, StreamError> {
        self.ensure(Operation::Config)?;
        let state = self.log.state.lock().await;
        serde_json::to_value(&state.config).map_err(|e| StreamError::Provider(e.to_string()))
    }
}
