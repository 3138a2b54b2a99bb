//! Concrete stream variants.
//!
//! Each variant maps the abstract shard-equivalent capacity onto its native
//! model and declares which inflight operations deployed code may call.

use crate::domain::envelope;
use crate::domain::{
    all_operations, ConsumerOptions, EventSource, Operation, OperationSet, ProviderKind, Record,
    StreamConfig, StreamError,
};
use crate::ports::{NativeCapacity, StreamVariant};

const KIB_PER_MIB: u64 = 1024;

/// Kinesis-like shard store: every shard takes 1 MiB/s in and serves 2 MiB/s out.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShardLogStream;

impl ShardLogStream {
    pub const MAX_RECORD_BYTES: usize = 1024 * 1024;
}

impl StreamVariant for ShardLogStream {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ShardLog
    }

    fn supported_operations(&self) -> OperationSet {
        all_operations()
    }

    fn native_capacity(&self, config: &StreamConfig) -> NativeCapacity {
        let shards = config.read_capacity.max(config.write_capacity);
        NativeCapacity {
            unit: "shard".into(),
            count: shards,
            read_kib_per_sec: u64::from(shards) * 2 * KIB_PER_MIB,
            write_kib_per_sec: u64::from(shards) * KIB_PER_MIB,
        }
    }

    fn event_source(&self, options: &ConsumerOptions) -> EventSource {
        EventSource::Poll {
            batch_size: options.max_batch_size,
            interval_ms: options.max_wait_ms,
        }
    }

    fn ingest(&self, record: Record) -> Result<Record, StreamError> {
        check_size(record, Self::MAX_RECORD_BYTES)
    }
}

/// Event-Hub-like partitioned log. Push-only: consumers cannot `get`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartitionedLogStream;

impl PartitionedLogStream {
    pub const MAX_RECORD_BYTES: usize = 256 * 1024;
    pub const MIN_PARTITIONS: u32 = 2;
}

impl StreamVariant for PartitionedLogStream {
    fn kind(&self) -> ProviderKind {
        ProviderKind::PartitionedLog
    }

    fn supported_operations(&self) -> OperationSet {
        [
            Operation::Put,
            Operation::Metadata,
            Operation::Schema,
            Operation::Config,
        ]
        .into_iter()
        .collect()
    }

    fn native_capacity(&self, config: &StreamConfig) -> NativeCapacity {
        // Throughput units are shared across partitions.
        let units = u64::from(config.read_capacity.max(config.write_capacity));
        NativeCapacity {
            unit: "partition".into(),
            count: config.write_capacity.max(Self::MIN_PARTITIONS),
            read_kib_per_sec: units * 2 * KIB_PER_MIB,
            write_kib_per_sec: units * KIB_PER_MIB,
        }
    }

    fn event_source(&self, options: &ConsumerOptions) -> EventSource {
        EventSource::Push {
            max_batch_size: options.max_batch_size,
            max_wait_ms: options.max_wait_ms,
        }
    }

    fn consumer_grants(&self) -> OperationSet {
        OperationSet::new()
    }

    fn ingest(&self, record: Record) -> Result<Record, StreamError> {
        check_size(record, Self::MAX_RECORD_BYTES)
    }
}

/// In-memory simulator, backed by `impls::memory`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatorStream;

impl StreamVariant for SimulatorStream {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Simulator
    }

    fn supported_operations(&self) -> OperationSet {
        all_operations()
    }

    fn native_capacity(&self, config: &StreamConfig) -> NativeCapacity {
        NativeCapacity {
            unit: "slot".into(),
            count: config.write_capacity,
            read_kib_per_sec: u64::from(config.read_capacity) * 2 * KIB_PER_MIB,
            write_kib_per_sec: u64::from(config.write_capacity) * KIB_PER_MIB,
        }
    }

    fn event_source(&self, options: &ConsumerOptions) -> EventSource {
        EventSource::Poll {
            batch_size: options.max_batch_size,
            interval_ms: options.max_wait_ms,
        }
    }
}

fn check_size(record: Record, limit: usize) -> Result<Record, StreamError> {
    let size = envelope::encode(&record).len();
    if size > limit {
        return Err(StreamError::RecordTooLarge {
            id: record.id().clone(),
            size,
            limit,
        });
    }
    Ok(record)
}
