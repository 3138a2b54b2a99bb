//! Consumer bindings and the descriptors handed to the wiring layer.
//!
//! A handler is a deployable unit that runs in its own process, so it is
//! referenced by identity and code location, never by an in-process callable.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::errors::StreamError;
use super::ids::HandlerId;
use super::operation::OperationSet;
use super::provider::{ProviderKind, Target};

pub const DEFAULT_MAX_BATCH_SIZE: u32 = 100;
pub const MAX_BATCH_SIZE_LIMIT: u32 = 10_000;
pub const DEFAULT_MAX_WAIT_MS: u64 = 1_000;

/// Opaque reference to a deployable consumer function.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandlerRef {
    pub id: HandlerId,
    /// Code location (bundle path, image, ...) understood by the deployer.
    pub location: String,
}

impl HandlerRef {
    pub fn new(id: impl Into<HandlerId>, location: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            location: location.into(),
        }
    }
}

/// Where a new consumer starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartingPosition {
    /// Only records written after the consumer is attached.
    Latest,
    /// Oldest retained record.
    #[default]
    TrimHorizon,
}

/// Batch-delivery options for a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerOptions {
    pub max_batch_size: u32,
    pub max_wait_ms: u64,
    pub starting_position: StartingPosition,
}

impl Default for ConsumerOptions {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_wait_ms: DEFAULT_MAX_WAIT_MS,
            starting_position: StartingPosition::default(),
        }
    }
}

impl ConsumerOptions {
    pub fn with_max_batch_size(mut self, size: u32) -> Self {
        self.max_batch_size = size;
        self
    }

    pub fn with_max_wait(mut self, wait: Duration) -> Self {
        self.max_wait_ms = wait.as_millis() as u64;
        self
    }

    pub fn with_starting_position(mut self, position: StartingPosition) -> Self {
        self.starting_position = position;
        self
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    pub fn validate(&self) -> Result<(), StreamError> {
        if !(1..=MAX_BATCH_SIZE_LIMIT).contains(&self.max_batch_size) {
            return Err(StreamError::Configuration(format!(
                "max_batch_size must be within 1..={MAX_BATCH_SIZE_LIMIT}, got {}",
                self.max_batch_size
            )));
        }
        if self.max_wait_ms == 0 {
            return Err(StreamError::Configuration(
                "max_wait_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Association between a stream and a handler. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerBinding {
    handler: HandlerRef,
    options: ConsumerOptions,
}

impl ConsumerBinding {
    pub fn new(handler: HandlerRef, options: ConsumerOptions) -> Self {
        Self { handler, options }
    }

    pub fn handler(&self) -> &HandlerRef {
        &self.handler
    }

    pub fn options(&self) -> &ConsumerOptions {
        &self.options
    }
}

/// How the concrete provider delivers records to the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EventSource {
    /// The platform polls the stream and invokes the handler with batches.
    Poll { batch_size: u32, interval_ms: u64 },
    /// The stream pushes batches to the handler.
    Push { max_batch_size: u32, max_wait_ms: u64 },
}

/// Build-time artifact describing one consumer-to-stream attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingDescriptor {
    pub stream: String,
    pub fqn: String,
    pub target: Target,
    pub provider: ProviderKind,
    pub handler: HandlerRef,
    pub options: ConsumerOptions,
    /// Operations the handler must be granted on the stream.
    pub grants: OperationSet,
    pub event_source: EventSource,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn default_options_are_reasonable() {
        let o = ConsumerOptions::default();
        assert_eq!(o.max_batch_size, 100);
        assert_eq!(o.max_wait(), Duration::from_secs(1));
        assert_eq!(o.starting_position, StartingPosition::TrimHorizon);
        assert!(o.validate().is_ok());
    }

    #[rstest]
    #[case::zero_batch(ConsumerOptions::default().with_max_batch_size(0))]
    #[case::huge_batch(ConsumerOptions::default().with_max_batch_size(10_001))]
    #[case::zero_wait(ConsumerOptions::default().with_max_wait(Duration::ZERO))]
    fn invalid_options_are_rejected(#[case] options: ConsumerOptions) {
        assert!(matches!(options.validate(), Err(StreamError::Configuration(_))));
    }

    #[test]
    fn options_without_fields_get_defaults() {
        let o: ConsumerOptions = serde_json::from_str(r#"{"max_batch_size": 10}"#).unwrap();
        assert_eq!(o.max_batch_size, 10);
        assert_eq!(o.max_wait_ms, DEFAULT_MAX_WAIT_MS);
    }

    #[test]
    fn event_source_is_tagged_by_mode() {
        let poll = EventSource::Poll {
            batch_size: 10,
            interval_ms: 500,
        };
        let v = serde_json::to_value(poll).unwrap();
        assert_eq!(
            v,
            serde_json::json!({"mode": "poll", "batch_size": 10, "interval_ms": 500})
        );
    }
}
