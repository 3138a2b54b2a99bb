//! ProviderFactory - (target, type identifier) から具体的な variant を解決
//!
//! Resolution happens once, when a `Stream` is constructed. Nothing is
//! looked up again at run time.

use std::collections::HashMap;

use crate::domain::{StreamError, Target, STREAM_FQN};
use crate::impls::{PartitionedLogStream, ShardLogStream, SimulatorStream};
use crate::ports::StreamVariant;

pub type VariantCtor = fn() -> Box<dyn StreamVariant>;

#[derive(Debug, Clone, Default)]
pub struct ProviderFactory {
    providers: HashMap<(Target, String), VariantCtor>,
}

impl ProviderFactory {
    /// Empty factory. Use `with_defaults` for the built-in variants.
    pub fn new() -> Self {
        Self::default()
    }

    /// `aws` → shard log, `azure` → partitioned log, `sim` → simulator.
    pub fn with_defaults() -> Self {
        let mut factory = Self::new();
        let builtin: [(Target, VariantCtor); 3] = [
            (Target::Aws, shard_log),
            (Target::Azure, partitioned_log),
            (Target::Sim, simulator),
        ];
        for (target, ctor) in builtin {
            factory.providers.insert((target, STREAM_FQN.to_string()), ctor);
        }
        factory
    }

    pub fn register(
        &mut self,
        target: Target,
        fqn: impl Into<String>,
        ctor: VariantCtor,
    ) -> Result<(), StreamError> {
        let key = (target, fqn.into());
        if self.providers.contains_key(&key) {
            return Err(StreamError::DuplicateProvider {
                target,
                fqn: key.1,
            });
        }
        self.providers.insert(key, ctor);
        Ok(())
    }

    pub fn resolve(&self, target: Target, fqn: &str) -> Result<Box<dyn StreamVariant>, StreamError> {
        self.providers
            .get(&(target, fqn.to_string()))
            .map(|ctor| ctor())
            .ok_or_else(|| StreamError::UnknownProvider {
                target,
                fqn: fqn.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

fn shard_log() -> Box<dyn StreamVariant> {
    Box::new(ShardLogStream)
}

fn partitioned_log() -> Box<dyn StreamVariant> {
    Box::new(PartitionedLogStream)
}

fn simulator() -> Box<dyn StreamVariant> {
    Box::new(SimulatorStream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProviderKind;
    use rstest::rstest;

    #[rstest]
    #[case::aws(Target::Aws, ProviderKind::ShardLog)]
    #[case::azure(Target::Azure, ProviderKind::PartitionedLog)]
    #[case::sim(Target::Sim, ProviderKind::Simulator)]
    fn defaults_resolve_per_target(#[case] target: Target, #[case] kind: ProviderKind) {
        let factory = ProviderFactory::with_defaults();
        let variant = factory.resolve(target, STREAM_FQN).unwrap();
        assert_eq!(variant.kind(), kind);
    }

    #[test]
    fn unknown_type_is_an_error() {
        let factory = ProviderFactory::with_defaults();
        let err = factory.resolve(Target::Aws, "rill.cloud.Queue").unwrap_err();
        assert!(matches!(err, StreamError::UnknownProvider { .. }));
    }

    #[test]
    fn double_registration_is_rejected() {
        let mut factory = ProviderFactory::new();
        factory
            .register(Target::Sim, STREAM_FQN, simulator)
            .unwrap();
        let err = factory
            .register(Target::Sim, STREAM_FQN, shard_log)
            .unwrap_err();
        assert!(matches!(err, StreamError::DuplicateProvider { .. }));
        assert_eq!(factory.len(), 1);
    }
}
