//! ConsumerHandler port - ストリームのコンシューマ契約
//!
//! Delivery is at-least-once: a handler may see the same record again after
//! a retry, so it must be idempotent or deduplicate by record id.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::Record;

/// Failure reported by a handler. Triggers the provider's retry policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HandlerError(String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[async_trait]
pub trait ConsumerHandler: Send + Sync {
    /// Records arrive in provider emission order within one batch.
    async fn handle(&self, records: &[Record]) -> Result<(), HandlerError>;
}
