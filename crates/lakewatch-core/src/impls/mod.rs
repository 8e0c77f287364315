//! Impls - ports の実装
//!
//! - **HttpMonitorClient**: REST API（本番用）
//! - **InMemoryMonitorClient**: 開発・テスト・dry-run 用

pub mod http_client;
pub mod inmem_client;

pub use self::http_client::HttpMonitorClient;
pub use self::inmem_client::InMemoryMonitorClient;
