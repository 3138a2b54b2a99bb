//! Stream - ビルド時のストリームリソース
//!
//! Holds the effective configuration, the declared schema, the consumer
//! bindings (in registration order) and the provider variant resolved from
//! the build context. A `Stream` never holds live data; records belong to the
//! provider at run time.
//!
//! # Fail-fast 設計
//! - invalid props → `Configuration`
//! - same handler twice → `DuplicateConsumer`
//! - code calling an operation the provider lacks → `UnsupportedOperation`

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::{
    BindingDescriptor, ConsumerBinding, ConsumerOptions, HandlerRef, Operation, OperationSet,
    ProviderKind, Record, RecordInput, Schema, StreamConfig, StreamError, StreamProps, Target,
    Timestamp, STREAM_FQN,
};
use crate::ports::{Clock, IdGenerator, NativeCapacity, StreamVariant};

use super::context::BuildContext;
use super::manifest::ClientManifest;

pub struct Stream {
    config: StreamConfig,
    schema: Schema,
    target: Target,
    variant: Box<dyn StreamVariant>,
    bindings: Vec<ConsumerBinding>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl Stream {
    /// A stream that accepts any payload.
    pub fn new(ctx: &mut BuildContext, id: &str, props: StreamProps) -> Result<Self, StreamError> {
        Self::with_schema(ctx, id, props, Schema::Any)
    }

    pub fn with_schema(
        ctx: &mut BuildContext,
        id: &str,
        props: StreamProps,
        schema: Schema,
    ) -> Result<Self, StreamError> {
        let ids = ctx.ids();
        let config = Self::configure(&props, || default_name(id, ids.as_ref()))?;
        let variant = ctx.resolve(STREAM_FQN)?;
        ctx.claim_name(&config.name)?;

        info!(
            target: "rill::build",
            stream = %config.name,
            provider = %variant.kind(),
            horizon_ms = config.horizon.as_millis() as u64,
            read = config.read_capacity,
            write = config.write_capacity,
            "stream configured"
        );

        Ok(Self {
            config,
            schema,
            target: ctx.target(),
            variant,
            bindings: Vec::new(),
            clock: ctx.clock(),
            ids,
        })
    }

    /// Validate props and apply defaults.
    pub fn configure(
        props: &StreamProps,
        generate_name: impl FnOnce() -> String,
    ) -> Result<StreamConfig, StreamError> {
        StreamConfig::configure(props, generate_name)
    }

    /// Convert external data into the canonical envelope.
    ///
    /// Assigns id and timestamp when absent and validates the payload. Does
    /// not write anything: writing goes through a `StreamClient`.
    pub fn ingest(&self, data: RecordInput) -> Result<Record, StreamError> {
        let schema = match data.schema {
            Some(schema) if self.schema != Schema::Any && schema != self.schema => {
                return Err(StreamError::schema(vec![format!(
                    "record schema does not match the schema of stream `{}`",
                    self.config.name
                )]));
            }
            Some(schema) => schema,
            None => self.schema.clone(),
        };
        let id = data.id.unwrap_or_else(|| self.ids.generate_record_id());
        let timestamp = data
            .timestamp
            .unwrap_or_else(|| Timestamp::from_datetime(self.clock.now()));

        let record = Record::try_new(id, timestamp, data.data, schema)?;
        self.variant.ingest(record)
    }

    /// Register a consumer. Handlers are deduplicated by identity.
    pub fn set_consumer(
        &mut self,
        handler: HandlerRef,
        options: ConsumerOptions,
    ) -> Result<BindingDescriptor, StreamError> {
        if self.bindings.iter().any(|b| b.handler().id == handler.id) {
            return Err(StreamError::DuplicateConsumer(handler.id));
        }
        options.validate()?;

        let binding = ConsumerBinding::new(handler, options);
        let descriptor = self.describe(&binding);
        debug!(
            target: "rill::build",
            stream = %self.config.name,
            handler = %binding.handler().id,
            position = self.bindings.len(),
            "consumer registered"
        );
        self.bindings.push(binding);
        Ok(descriptor)
    }

    pub fn supported_operations(&self) -> OperationSet {
        self.variant.supported_operations()
    }

    /// Reject code that calls an operation the selected provider lacks.
    pub fn require_operations(&self, operations: &[Operation]) -> Result<(), StreamError> {
        let supported = self.supported_operations();
        match operations.iter().find(|op| !supported.contains(op)) {
            Some(op) => Err(StreamError::UnsupportedOperation {
                operation: *op,
                provider: self.variant.kind().to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn bindings(&self) -> &[ConsumerBinding] {
        &self.bindings
    }

    pub fn binding_descriptors(&self) -> Vec<BindingDescriptor> {
        self.bindings.iter().map(|b| self.describe(b)).collect()
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn provider(&self) -> ProviderKind {
        self.variant.kind()
    }

    pub fn native_capacity(&self) -> NativeCapacity {
        self.variant.native_capacity(&self.config)
    }

    /// The only build-time output the runtime client is created from.
    pub fn client_manifest(&self) -> ClientManifest {
        ClientManifest {
            fqn: STREAM_FQN.to_string(),
            target: self.target,
            provider: self.variant.kind(),
            config: self.config.clone(),
            schema: self.schema.clone(),
            operations: self.supported_operations(),
        }
    }

    fn describe(&self, binding: &ConsumerBinding) -> BindingDescriptor {
        BindingDescriptor {
            stream: self.config.name.clone(),
            fqn: STREAM_FQN.to_string(),
            target: self.target,
            provider: self.variant.kind(),
            handler: binding.handler().clone(),
            options: *binding.options(),
            grants: self
                .variant
                .consumer_grants()
                .intersection(&self.supported_operations())
                .copied()
                .collect(),
            event_source: self.variant.event_source(binding.options()),
        }
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("config", &self.config)
            .field("schema", &self.schema)
            .field("target", &self.target)
            .field("variant", &self.variant)
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

fn default_name(id: &str, ids: &dyn IdGenerator) -> String {
    let prefix: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c.to_ascii_lowercase() } else { '-' })
        .take(64)
        .collect();
    if prefix.is_empty() {
        ids.generate_name_suffix()
    } else {
        format!("{prefix}-{}", ids.generate_name_suffix())
    }
}
