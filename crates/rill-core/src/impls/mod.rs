//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **ShardLogStream / PartitionedLogStream / SimulatorStream**: StreamVariant
//! - **SimulatorBackend / InMemoryStreamClient**: 開発・テスト用のストリーム
//! - **ConsumerDispatcher**: get → handle → retry / park のループ
//! - **RetryPolicy**: handler 失敗時の指数バックオフ

pub mod dispatch;
pub mod memory;
pub mod retry;
pub mod variants;

pub use self::dispatch::{ConsumerDispatcher, DispatchOutcome, DispatcherHandle, ParkedBatch};
pub use self::memory::{
    InMemoryStreamClient, SimulatorBackend, DEFAULT_GROUP, RECORDS_PER_READ_UNIT,
    RECORDS_PER_WRITE_UNIT,
};
pub use self::retry::RetryPolicy;
pub use self::variants::{PartitionedLogStream, ShardLogStream, SimulatorStream};
