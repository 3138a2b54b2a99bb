//! StreamVariant port - プロバイダごとの差分
//!
//! The abstract `Stream` delegates every provider-specific decision to a
//! variant: which inflight operations exist, how capacity maps onto native
//! units, how consumers are wired and what extra ingest checks apply.
//! Variants are chosen once at build time by `app::ProviderFactory`.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::domain::{
    ConsumerOptions, EventSource, Operation, OperationSet, ProviderKind, Record, StreamConfig,
    StreamError,
};

/// Capacity expressed in the provider's own units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCapacity {
    /// Native unit name (`shard`, `partition`, ...).
    pub unit: String,
    pub count: u32,
    pub read_kib_per_sec: u64,
    pub write_kib_per_sec: u64,
}

pub trait StreamVariant: Debug + Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn supported_operations(&self) -> OperationSet;

    fn native_capacity(&self, config: &StreamConfig) -> NativeCapacity;

    /// How the provider delivers records to a consumer bound with `options`.
    fn event_source(&self, options: &ConsumerOptions) -> EventSource;

    /// Operations a bound consumer must be granted. Polling consumers read
    /// with `get`; pushed consumers need nothing on the stream.
    fn consumer_grants(&self) -> OperationSet {
        [Operation::Get].into_iter().collect()
    }

    /// Provider-specific checks on an already validated record.
    fn ingest(&self, record: Record) -> Result<Record, StreamError> {
        Ok(record)
    }
}
