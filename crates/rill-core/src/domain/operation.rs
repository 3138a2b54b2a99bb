//! Inflight operations a provider may expose to deployed code.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Put,
    Get,
    Metadata,
    Schema,
    Config,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Put,
        Operation::Get,
        Operation::Metadata,
        Operation::Schema,
        Operation::Config,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Put => "put",
            Operation::Get => "get",
            Operation::Metadata => "metadata",
            Operation::Schema => "schema",
            Operation::Config => "config",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered set so descriptors and manifests serialize deterministically.
pub type OperationSet = BTreeSet<Operation>;

pub fn all_operations() -> OperationSet {
    Operation::ALL.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_serialize_lowercase() {
        let s = serde_json::to_string(&Operation::Metadata).unwrap();
        assert_eq!(s, "\"metadata\"");
        assert_eq!(Operation::Get.to_string(), "get");
    }

    #[test]
    fn operation_set_is_ordered() {
        let set: OperationSet = [Operation::Config, Operation::Put, Operation::Get]
            .into_iter()
            .collect();
        let s = serde_json::to_string(&set).unwrap();
        assert_eq!(s, r#"["put","get","config"]"#);
        assert_eq!(all_operations().len(), 5);
    }
}
