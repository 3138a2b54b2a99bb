//! Record: the unit of data moving through a stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use super::errors::StreamError;
use super::ids::RecordId;
use super::schema::Schema;

/// Epoch milliseconds at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.timestamp_millis())
    }

    pub fn as_millis(self) -> i64 {
        self.0
    }

    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.0)
    }

    pub fn saturating_sub(self, d: Duration) -> Self {
        let ms = i64::try_from(d.as_millis()).unwrap_or(i64::MAX);
        Self(self.0.saturating_sub(ms))
    }

    pub fn saturating_add(self, d: Duration) -> Self {
        let ms = i64::try_from(d.as_millis()).unwrap_or(i64::MAX);
        Self(self.0.saturating_add(ms))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(at) => write!(f, "{}", at.to_rfc3339()),
            None => write!(f, "{}ms", self.0),
        }
    }
}

/// A record whose payload conforms to its schema.
///
/// Fields are private so the invariant holds for every value built through
/// `try_new` (or `envelope::decode`, which goes through it).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    id: RecordId,
    timestamp: Timestamp,
    #[serde(rename = "data")]
    payload: Value,
    schema: Schema,
}

impl Record {
    pub fn try_new(
        id: RecordId,
        timestamp: Timestamp,
        payload: Value,
        schema: Schema,
    ) -> Result<Self, StreamError> {
        if id.is_empty() {
            return Err(StreamError::schema(vec!["record id must not be empty".into()]));
        }
        schema.validate(&payload)?;
        Ok(Self {
            id,
            timestamp,
            payload,
            schema,
        })
    }

    /// A record whose payload is the JSON form of `schema`; clients return
    /// it from `schema()`. Its own schema is `Any`, so it survives
    /// `encode` / `decode` like any other record.
    pub fn schema_carrier(id: RecordId, timestamp: Timestamp, schema: &Schema) -> Self {
        Self {
            id,
            timestamp,
            payload: schema.to_value(),
            schema: Schema::Any,
        }
    }

    /// The schema held in the payload of a schema carrier.
    pub fn carried_schema(&self) -> Option<Schema> {
        serde_json::from_value(self.payload.clone()).ok()
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

/// Externally supplied data, before it is converted into a `Record`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordInput {
    #[serde(default)]
    pub id: Option<RecordId>,

    #[serde(default)]
    pub timestamp: Option<Timestamp>,

    pub data: Value,

    /// Falls back to the stream's declared schema when absent.
    #[serde(default)]
    pub schema: Option<Schema>,
}

impl RecordInput {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<RecordId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn try_new_validates_payload() {
        let schema = Schema::object([("x", Schema::Number)]);
        let ok = Record::try_new(RecordId::new("a"), Timestamp::from_millis(1), json!({"x": 1}), schema.clone());
        assert!(ok.is_ok());

        let err = Record::try_new(RecordId::new("a"), Timestamp::from_millis(1), json!({"x": "no"}), schema)
            .unwrap_err();
        assert!(matches!(err, StreamError::SchemaValidation { .. }));
    }

    #[test]
    fn empty_id_is_rejected() {
        let err = Record::try_new(RecordId::new(""), Timestamp::from_millis(1), json!(1), Schema::Any)
            .unwrap_err();
        assert!(matches!(err, StreamError::SchemaValidation { .. }));
    }

    #[test]
    fn schema_carrier_holds_a_valid_payload() {
        let schema = Schema::object([("x", Schema::Number)]);
        let carrier = Record::schema_carrier(RecordId::new("s.schema"), Timestamp::from_millis(1), &schema);

        assert_eq!(carrier.schema(), &Schema::Any);
        assert_eq!(carrier.carried_schema(), Some(schema));

        let decoded = Record::decode(&carrier.encode()).unwrap();
        assert_eq!(decoded, carrier);
    }

    #[test]
    fn timestamp_converts_from_datetime() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let ts = Timestamp::from_datetime(at);
        assert_eq!(ts.as_millis(), at.timestamp_millis());
        assert_eq!(ts.to_datetime(), Some(at));
        assert_eq!(
            ts.saturating_add(Duration::from_secs(1)).as_millis(),
            at.timestamp_millis() + 1000
        );
    }

    #[test]
    fn record_input_parses_partial_json() {
        let input: RecordInput = serde_json::from_str(r#"{"data": {"x": 1}}"#).unwrap();
        assert_eq!(input.id, None);
        assert_eq!(input.timestamp, None);
        assert_eq!(input.data, json!({"x": 1}));
    }
}
