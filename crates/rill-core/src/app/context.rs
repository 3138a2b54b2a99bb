//! BuildContext - ビルド時の明示的なコンテキスト
//!
//! Replaces any "current app" lookup: every build-time constructor takes the
//! context explicitly. It carries the deployment target, the provider
//! factory, the clock and id ports, and the set of stream names already
//! claimed in this deployment scope.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::{StreamError, Target};
use crate::ports::{Clock, IdGenerator, StreamVariant, SystemClock, UlidGenerator};

use super::factory::ProviderFactory;

pub struct BuildContext {
    target: Target,
    factory: ProviderFactory,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    names: HashSet<String>,
}

impl BuildContext {
    pub fn new(target: Target) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self {
            target,
            factory: ProviderFactory::with_defaults(),
            ids: Arc::new(UlidGenerator::new(clock.clone())),
            clock,
            names: HashSet::new(),
        }
    }

    /// Swap the clock. The id generator follows it.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.ids = Arc::new(UlidGenerator::new(clock.clone()));
        self.clock = clock;
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_factory(mut self, factory: ProviderFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub fn ids(&self) -> Arc<dyn IdGenerator> {
        self.ids.clone()
    }

    pub fn resolve(&self, fqn: &str) -> Result<Box<dyn StreamVariant>, StreamError> {
        self.factory.resolve(self.target, fqn)
    }

    /// Reserve a stream name for this deployment scope.
    pub fn claim_name(&mut self, name: &str) -> Result<(), StreamError> {
        if !self.names.insert(name.to_string()) {
            return Err(StreamError::Configuration(format!(
                "a stream named `{name}` already exists in this deployment"
            )));
        }
        Ok(())
    }

    pub fn claimed_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}
