//! StreamClient port - デプロイ後のコードが呼ぶ唯一の API
//!
//! Implementations must be safe to call from many concurrent callers. The
//! client is not a sequencing authority: concurrent `put` calls from
//! different callers have no ordering guarantee.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::{Operation, Record, StreamError, StreamMetadata};

/// Result of a `get`: one record or a batch, depending on the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    One(Record),
    Many(Vec<Record>),
}

impl Fetched {
    pub fn from_batch(mut records: Vec<Record>) -> Option<Self> {
        match records.len() {
            0 => None,
            1 => records.pop().map(Fetched::One),
            _ => Some(Fetched::Many(records)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Fetched::One(_) => 1,
            Fetched::Many(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_records(self) -> Vec<Record> {
        match self {
            Fetched::One(record) => vec![record],
            Fetched::Many(records) => records,
        }
    }
}

#[async_trait]
pub trait StreamClient: Send + Sync {
    /// Write one or more records. Zero records is an `EmptyBatch` error and a
    /// partial failure is reported as `PartialPut`.
    async fn put(&self, records: Vec<Record>) -> Result<(), StreamError>;

    /// Next record(s) reachable from this client's cursor, or `None`.
    /// Waits at most the provider's configured bound.
    async fn get(&self) -> Result<Option<Fetched>, StreamError>;

    async fn metadata(&self) -> Result<StreamMetadata, StreamError>;

    /// Schema carrier describing the stream's accepted shape.
    async fn schema(&self) -> Result<Record, StreamError>;

    /// Effective stream configuration.
    async fn config(&self) -> Result<serde_json::Value, StreamError>;

    async fn put_within(&self, records: Vec<Record>, deadline: Duration) -> Result<(), StreamError> {
        match tokio::time::timeout(deadline, self.put(records)).await {
            Ok(result) => result,
            Err(_) => Err(StreamError::Timeout {
                operation: Operation::Put,
                waited_ms: deadline.as_millis() as u64,
            }),
        }
    }

    async fn get_within(&self, deadline: Duration) -> Result<Option<Fetched>, StreamError> {
        match tokio::time::timeout(deadline, self.get()).await {
            Ok(result) => result,
            Err(_) => Err(StreamError::Timeout {
                operation: Operation::Get,
                waited_ms: deadline.as_millis() as u64,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RecordId, Schema, Timestamp};

    /// A client whose writes never complete.
    struct StalledClient;

    #[async_trait]
    impl StreamClient for StalledClient {
        async fn put(&self, _records: Vec<Record>) -> Result<(), StreamError> {
            std::future::pending().await
        }

        async fn get(&self) -> Result<Option<Fetched>, StreamError> {
            std::future::pending().await
        }

        async fn metadata(&self) -> Result<StreamMetadata, StreamError> {
            Ok(StreamMetadata::default())
        }

        async fn schema(&self) -> Result<Record, StreamError> {
            Ok(Record::schema_carrier(
                RecordId::new("stalled.schema"),
                Timestamp::from_millis(0),
                &Schema::Any,
            ))
        }

        async fn config(&self) -> Result<serde_json::Value, StreamError> {
            Ok(serde_json::Value::Null)
        }
    }

    #[tokio::test]
    async fn put_within_times_out() {
        let record =
            Record::try_new(RecordId::new("a"), Timestamp::from_millis(1), serde_json::json!(1), Schema::Any)
                .unwrap();

        let err = StalledClient
            .put_within(vec![record], Duration::from_millis(15))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            StreamError::Timeout {
                operation: Operation::Put,
                waited_ms: 15
            }
        );
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn get_within_times_out() {
        let err = StalledClient
            .get_within(Duration::from_millis(5))
            .await
            .unwrap_err();
        assert!(matches!(err, StreamError::Timeout { operation: Operation::Get, .. }));
    }

    #[test]
    fn fetched_shape_follows_batch_size() {
        let r = |id: &str| {
            Record::try_new(RecordId::new(id), Timestamp::from_millis(1), serde_json::json!(1), Schema::Any)
                .unwrap()
        };
        assert_eq!(Fetched::from_batch(vec![]), None);
        assert!(matches!(Fetched::from_batch(vec![r("a")]), Some(Fetched::One(_))));
        let many = Fetched::from_batch(vec![r("a"), r("b")]).unwrap();
        assert_eq!(many.len(), 2);
    }
}
