//! recap-core
//!
//! セッションのトランスクリプトから「経験の要約」を作り、
//! day → week → month の時間バケットに畳み込んで保存する。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task, outcome, calendar, record）
//! - **ports**: 抽象化レイヤー（TaskQueue, DedupLedger, ExclusiveLease, RecordStore, Summarizer, ...）
//! - **impls**: ファイルシステム / 子プロセスによる実装
//! - **app**: アプリケーションロジック（builder, coordinator, rollup, inspect）
//! - **config**: 設定とストレージレイアウト
//! - **observability**: ログ初期化

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod ports;

pub use config::{Config, StoreLayout};
pub use error::{RecapError, Result, SummarizerError};
