//! Stream configuration: retention horizon and provisioned capacity.
//!
//! `StreamProps` is the open input (every field optional, partial JSON is
//! fine). `StreamConfig` is the effective, validated configuration after
//! defaults are applied. It is immutable once a stream is constructed.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::errors::StreamError;
use super::record::Timestamp;

/// Default retention horizon (24 hours).
pub const DEFAULT_HORIZON: Duration = Duration::from_secs(24 * 60 * 60);

/// Default read/write capacity in shard-equivalent units.
pub const DEFAULT_CAPACITY: u32 = 1;

const MAX_NAME_LEN: usize = 128;

/// Options for a stream. Absent fields pick up defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamProps {
    /// Unique within the build context; generated when absent.
    pub name: Option<String>,

    /// Data horizon in milliseconds.
    pub horizon_ms: Option<u64>,

    /// Provisioned read capacity.
    pub read: Option<u32>,

    /// Provisioned write capacity.
    pub write: Option<u32>,
}

impl StreamProps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sub-millisecond horizons round up to 1ms; huge ones saturate.
    pub fn with_horizon(mut self, horizon: Duration) -> Self {
        let mut ms = u64::try_from(horizon.as_millis()).unwrap_or(u64::MAX);
        if ms == 0 && !horizon.is_zero() {
            ms = 1;
        }
        self.horizon_ms = Some(ms);
        self
    }

    pub fn with_read(mut self, read: u32) -> Self {
        self.read = Some(read);
        self
    }

    pub fn with_write(mut self, write: u32) -> Self {
        self.write = Some(write);
        self
    }
}

/// Provisioned throughput in abstract shard-equivalent units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity {
    pub read: u32,
    pub write: u32,
}

/// Effective stream configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    pub name: String,

    #[serde(rename = "horizon_ms", with = "duration_ms")]
    pub horizon: Duration,

    #[serde(rename = "read")]
    pub read_capacity: u32,

    #[serde(rename = "write")]
    pub write_capacity: u32,
}

impl StreamConfig {
    /// Validate `props` and apply defaults.
    ///
    /// `generate_name` is only called when the props carry no name.
    pub fn configure(
        props: &StreamProps,
        generate_name: impl FnOnce() -> String,
    ) -> Result<Self, StreamError> {
        let horizon = match props.horizon_ms {
            Some(0) => {
                return Err(StreamError::Configuration(
                    "horizon must be greater than zero".into(),
                ));
            }
            Some(ms) => Duration::from_millis(ms),
            None => DEFAULT_HORIZON,
        };
        let read_capacity = positive("read", props.read)?;
        let write_capacity = positive("write", props.write)?;

        let name = match &props.name {
            Some(name) => {
                validate_name(name)?;
                name.clone()
            }
            None => generate_name(),
        };

        Ok(Self {
            name,
            horizon,
            read_capacity,
            write_capacity,
        })
    }

    pub fn capacity(&self) -> Capacity {
        Capacity {
            read: self.read_capacity,
            write: self.write_capacity,
        }
    }

    /// Records strictly older than the returned timestamp are evictable.
    pub fn retention_cutoff(&self, now: Timestamp) -> Timestamp {
        now.saturating_sub(self.horizon)
    }
}

fn positive(field: &str, value: Option<u32>) -> Result<u32, StreamError> {
    match value {
        Some(0) => Err(StreamError::Configuration(format!(
            "{field} capacity must be a positive integer"
        ))),
        Some(v) => Ok(v),
        None => Ok(DEFAULT_CAPACITY),
    }
}

fn validate_name(name: &str) -> Result<(), StreamError> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(StreamError::Configuration(format!(
            "stream name must be 1..={MAX_NAME_LEN} characters"
        )));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(StreamError::Configuration(format!(
            "stream name `{name}` contains invalid character `{c}`"
        )));
    }
    Ok(())
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn generated() -> String {
        "stream-generated".to_string()
    }

    #[test]
    fn empty_props_yield_defaults() {
        let cfg = StreamConfig::configure(&StreamProps::default(), generated).unwrap();
        assert_eq!(cfg.horizon, Duration::from_secs(24 * 3600));
        assert_eq!(cfg.read_capacity, 1);
        assert_eq!(cfg.write_capacity, 1);
        assert_eq!(cfg.name, "stream-generated");
    }

    #[test]
    fn explicit_props_are_kept() {
        let props = StreamProps::new()
            .with_name("clicks")
            .with_horizon(Duration::from_secs(3600))
            .with_read(2)
            .with_write(3);
        let cfg = StreamConfig::configure(&props, || unreachable!()).unwrap();
        assert_eq!(cfg.name, "clicks");
        assert_eq!(cfg.horizon, Duration::from_secs(3600));
        assert_eq!(cfg.capacity(), Capacity { read: 2, write: 3 });
    }

    #[rstest]
    #[case::zero_horizon(StreamProps::new().with_horizon(Duration::ZERO))]
    #[case::zero_read(StreamProps::new().with_read(0))]
    #[case::zero_write(StreamProps::new().with_write(0))]
    #[case::empty_name(StreamProps::new().with_name(""))]
    #[case::bad_name(StreamProps::new().with_name("has space"))]
    fn invalid_props_are_rejected(#[case] props: StreamProps) {
        let err = StreamConfig::configure(&props, generated).unwrap_err();
        assert!(matches!(err, StreamError::Configuration(_)));
    }

    #[rstest]
    #[case::sub_millisecond(Duration::from_micros(500), 1)]
    #[case::exact(Duration::from_millis(1500), 1500)]
    #[case::saturates(Duration::MAX, u64::MAX)]
    fn horizon_is_converted_to_millis(#[case] horizon: Duration, #[case] ms: u64) {
        let props = StreamProps::new().with_horizon(horizon);
        assert_eq!(props.horizon_ms, Some(ms));
        let cfg = StreamConfig::configure(&props, generated).unwrap();
        assert_eq!(cfg.horizon, Duration::from_millis(ms));
    }

    #[test]
    fn partial_json_props_pick_up_defaults() {
        let props: StreamProps = serde_json::from_str(r#"{ "read": 4 }"#).unwrap();
        let cfg = StreamConfig::configure(&props, generated).unwrap();
        assert_eq!(cfg.read_capacity, 4);
        assert_eq!(cfg.write_capacity, 1);
        assert_eq!(cfg.horizon, DEFAULT_HORIZON);
    }

    #[test]
    fn config_serializes_with_wire_names() {
        let cfg = StreamConfig::configure(&StreamProps::new().with_name("s"), generated).unwrap();
        let v = serde_json::to_value(&cfg).unwrap();
        assert_eq!(
            v,
            serde_json::json!({"name": "s", "horizon_ms": 86_400_000u64, "read": 1, "write": 1})
        );
        let back: StreamConfig = serde_json::from_value(v).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn retention_cutoff_subtracts_horizon() {
        let props = StreamProps::new().with_horizon(Duration::from_secs(60));
        let cfg = StreamConfig::configure(&props, generated).unwrap();
        let now = Timestamp::from_millis(1_000_000);
        assert_eq!(cfg.retention_cutoff(now), Timestamp::from_millis(940_000));
    }
}
