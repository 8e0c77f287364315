//! Ports - 抽象化レイヤー
//!
//! 外部システム（品質モニタリング基盤、時刻、ID 生成）へのインターフェースを
//! trait として定義し、実装の詳細を隠蔽します。

pub mod clock;
pub mod id_generator;
pub mod monitor_client;

pub use self::clock::{Clock, ManualClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::monitor_client::MonitorClient;
