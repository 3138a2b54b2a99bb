//! Deployment targets and provider kinds used to resolve a concrete stream.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Global type identifier of the abstract stream resource.
pub const STREAM_FQN: &str = "rill.cloud.Stream";

/// Deployment target a build is resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Aws,
    Azure,
    Sim,
}

impl Target {
    pub fn as_str(self) -> &'static str {
        match self {
            Target::Aws => "aws",
            Target::Azure => "azure",
            Target::Sim => "sim",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aws" => Ok(Target::Aws),
            "azure" => Ok(Target::Azure),
            "sim" => Ok(Target::Sim),
            other => Err(format!("unknown target `{other}`")),
        }
    }
}

/// The family of concrete engine backing a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Kinesis-like shard store.
    ShardLog,
    /// Event-Hub-like partitioned log.
    PartitionedLog,
    /// In-memory simulator.
    Simulator,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderKind::ShardLog => "shard_log",
            ProviderKind::PartitionedLog => "partitioned_log",
            ProviderKind::Simulator => "simulator",
        };
        f.write_str(s)
    }
}
