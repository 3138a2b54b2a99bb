//! App - ビルド時のアプリケーション層
//!
//! # 主要コンポーネント
//! - **BuildContext**: target / factory / clock / ids を明示的に運ぶ
//! - **ProviderFactory**: (target, type identifier) → variant
//! - **Stream**: configure / ingest / set_consumer / supported_operations
//! - **ClientManifest**: 実行時クライアントへ渡すシリアライズ済み設定

pub mod context;
pub mod factory;
pub mod manifest;
pub mod stream;

pub use self::context::BuildContext;
pub use self::factory::{ProviderFactory, VariantCtor};
pub use self::manifest::ClientManifest;
pub use self::stream::Stream;
