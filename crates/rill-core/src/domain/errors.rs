//! Errors - ストリーム操作のエラー型と分類
//!
//! Build-time errors (configuration, duplicate consumers, unsupported
//! operations) are fatal and block synthesis. Run-time errors are always
//! returned to the caller as an explicit `Err`.

use thiserror::Error;

use super::ids::{HandlerId, RecordId};
use super::operation::Operation;
use super::provider::Target;

/// ErrorKind は実行エラーの分類
///
/// - Transient: 一時的なエラー（リトライ推奨）
/// - Permanent: 恒久的なエラー（リトライ無意味）
/// - Infrastructure: プロバイダ側の障害
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Infrastructure,
}

/// A record that a provider refused during a `put`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    pub id: RecordId,
    pub reason: String,
    /// Whether putting the same record again may succeed.
    pub retryable: bool,
}

impl RejectedRecord {
    /// Refused for now (capacity, throttling). A later put may succeed.
    pub fn transient(id: RecordId, reason: impl Into<String>) -> Self {
        Self {
            id,
            reason: reason.into(),
            retryable: true,
        }
    }

    /// Refused for good (schema mismatch, expired, conflicting id).
    pub fn permanent(id: RecordId, reason: impl Into<String>) -> Self {
        Self {
            id,
            reason: reason.into(),
            retryable: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StreamError {
    #[error("invalid stream configuration: {0}")]
    Configuration(String),

    #[error("payload does not match schema: {}", violations.join("; "))]
    SchemaValidation { violations: Vec<String> },

    #[error("malformed record envelope: {0}")]
    Decode(String),

    #[error("consumer {0} is already registered on this stream")]
    DuplicateConsumer(HandlerId),

    #[error("put requires at least one record")]
    EmptyBatch,

    #[error("record {id} is {size} bytes, over the {limit} byte limit of this provider")]
    RecordTooLarge { id: RecordId, size: usize, limit: usize },

    #[error("operation `{operation}` is not supported by the {provider} provider")]
    UnsupportedOperation { operation: Operation, provider: String },

    #[error("no stream provider registered for target={target} type={fqn}")]
    UnknownProvider { target: Target, fqn: String },

    #[error("a stream provider is already registered for target={target} type={fqn}")]
    DuplicateProvider { target: Target, fqn: String },

    #[error("put partially failed: {} accepted, {} rejected", accepted.len(), rejected.len())]
    PartialPut {
        accepted: Vec<RecordId>,
        rejected: Vec<RejectedRecord>,
    },

    #[error("{operation} timed out after {waited_ms}ms")]
    Timeout { operation: Operation, waited_ms: u64 },

    #[error("throughput exceeded: {0}")]
    Throttled(String),

    #[error("provider failure: {0}")]
    Provider(String),
}

impl StreamError {
    pub fn schema(violations: Vec<String>) -> Self {
        Self::SchemaValidation { violations }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StreamError::PartialPut { rejected, .. } => {
                if rejected.iter().any(|r| r.retryable) {
                    ErrorKind::Transient
                } else {
                    ErrorKind::Permanent
                }
            }
            StreamError::Timeout { .. }
            | StreamError::Throttled(_) => ErrorKind::Transient,
            StreamError::Provider(_) => ErrorKind::Infrastructure,
            _ => ErrorKind::Permanent,
        }
    }

    /// Transient errors may be retried by the caller or a provider policy.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}
