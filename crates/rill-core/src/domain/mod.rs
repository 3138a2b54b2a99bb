//! Domain model (ids, config, schema, records, bindings, errors).
//!
//! Build-time types here are plain data. Nothing in this module performs
//! I/O; the runtime surface lives in `ports` and `impls`.

pub mod binding;
pub mod config;
pub mod envelope;
pub mod errors;
pub mod ids;
pub mod metadata;
pub mod operation;
pub mod provider;
pub mod record;
pub mod schema;

pub use binding::{
    BindingDescriptor, ConsumerBinding, ConsumerOptions, EventSource, HandlerRef,
    StartingPosition,
};
pub use config::{Capacity, StreamConfig, StreamProps, DEFAULT_CAPACITY, DEFAULT_HORIZON};
pub use errors::{ErrorKind, RejectedRecord, StreamError};
pub use ids::{HandlerId, RecordId};
pub use metadata::StreamMetadata;
pub use operation::{all_operations, Operation, OperationSet};
pub use provider::{ProviderKind, Target, STREAM_FQN};
pub use record::{Record, RecordInput, Timestamp};
pub use schema::Schema;
