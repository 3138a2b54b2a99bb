//! rill-core
//!
//! Core building blocks for declaring managed data streams once and running
//! them on several cloud providers.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, config, schema, record, envelope, binding, errors）
//! - **ports**: 抽象化レイヤー（StreamClient, ConsumerHandler, StreamVariant, Clock, IdGenerator）
//! - **app**: ビルド時のロジック（BuildContext, ProviderFactory, Stream, ClientManifest）
//! - **impls**: 実装（variants, SimulatorBackend, ConsumerDispatcher, RetryPolicy）
//!
//! Build time and run time only meet through `app::ClientManifest`: a
//! `Stream` is synthesized into a manifest, and a runtime client is connected
//! from that manifest.

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
