//! ClientManifest - ビルド時と実行時をつなぐ唯一のデータ
//!
//! The runtime client is created from this serialized document, never from a
//! live `Stream`, so no build-time object crosses the deployment boundary.

use serde::{Deserialize, Serialize};

use crate::domain::{OperationSet, ProviderKind, Schema, StreamConfig, StreamError, Target};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientManifest {
    pub fqn: String,
    pub target: Target,
    pub provider: ProviderKind,
    pub config: StreamConfig,
    pub schema: Schema,
    pub operations: OperationSet,
}

impl ClientManifest {
    pub fn to_json(&self) -> Result<String, StreamError> {
        serde_json::to_string(self).map_err(|e| StreamError::Configuration(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, StreamError> {
        serde_json::from_str(json).map_err(|e| StreamError::Decode(format!("client manifest: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{all_operations, StreamProps, STREAM_FQN};

    #[test]
    fn manifest_survives_serialization() {
        let config =
            StreamConfig::configure(&StreamProps::new().with_name("m"), String::new).unwrap();
        let manifest = ClientManifest {
            fqn: STREAM_FQN.to_string(),
            target: Target::Sim,
            provider: ProviderKind::Simulator,
            config,
            schema: Schema::object([("x", Schema::Number)]),
            operations: all_operations(),
        };

        let json = manifest.to_json().unwrap();
        assert_eq!(ClientManifest::from_json(&json).unwrap(), manifest);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = ClientManifest::from_json("{").unwrap_err();
        assert!(matches!(err, StreamError::Decode(_)));
    }
}
