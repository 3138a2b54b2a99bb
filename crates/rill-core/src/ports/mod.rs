//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は具体的なストリームエンジン（シャードログ、パーティションログ、
//! インメモリシミュレータ）への境界を提供し、実装の詳細を隠蔽します。

pub mod clock;
pub mod consumer;
pub mod id_generator;
pub mod stream_client;
pub mod variant;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::consumer::{ConsumerHandler, HandlerError};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::stream_client::{Fetched, StreamClient};
pub use self::variant::{NativeCapacity, StreamVariant};
