//! Envelope - レコードの運搬用フォーマット（encode / decode）
//!
//! Wire form is a JSON object with the keys `id`, `timestamp`, `data` and
//! `schema`. `encode` builds a `serde_json::Value` whose object keys are kept
//! sorted, so the output is deterministic and `encode(decode(s)) == s` for
//! every `s` that came out of `encode`.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::errors::StreamError;
use super::ids::RecordId;
use super::record::{Record, Timestamp};
use super::schema::Schema;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WireRecord {
    id: RecordId,
    timestamp: Timestamp,
    data: Value,
    schema: Schema,
}

/// Serialize a record into its transport string. Never fails.
pub fn encode(record: &Record) -> String {
    let mut wire = Map::new();
    wire.insert("id".into(), Value::from(record.id().as_str()));
    wire.insert("timestamp".into(), Value::from(record.timestamp().as_millis()));
    wire.insert("data".into(), record.payload().clone());
    wire.insert("schema".into(), record.schema().to_value());
    Value::Object(wire).to_string()
}

/// Parse a transport string back into a record.
///
/// - `Decode` when the string is not a well-formed envelope
/// - `SchemaValidation` when the payload does not conform to the attached schema
pub fn decode(wire: &str) -> Result<Record, StreamError> {
    let raw: WireRecord =
        serde_json::from_str(wire).map_err(|e| StreamError::Decode(e.to_string()))?;
    if raw.id.is_empty() {
        return Err(StreamError::Decode("record id must not be empty".into()));
    }
    Record::try_new(raw.id, raw.timestamp, raw.data, raw.schema)
}

impl Record {
    pub fn encode(&self) -> String {
        encode(self)
    }

    pub fn decode(wire: &str) -> Result<Record, StreamError> {
        decode(wire)
    }
}
