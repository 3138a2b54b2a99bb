use serde::{Deserialize, Serialize};

use super::record::Timestamp;

/// Read-only snapshot of a stream's operational facts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMetadata {
    pub name: String,
    pub record_count: usize,
    pub oldest_timestamp: Option<Timestamp>,
    pub newest_timestamp: Option<Timestamp>,
    /// Records dropped because they fell behind the horizon.
    pub evicted_count: u64,
}
