//! State - リモート操作のステータス語彙
//!
//! モニタのプロビジョニング状態と refresh ジョブの状態は、プラットフォーム側の
//! 列挙値をそのまま文字列で返してきます。未知の値が来ても捨てずに `Other` に保持し、
//! 失敗時のメッセージにそのまま載せられるようにしています。

use std::fmt;

use serde::{Deserialize, Serialize};

/// Provisioning status of a monitor.
///
/// State transitions observed on the platform:
/// - Pending -> Active
/// - Pending -> Error | Failed
/// - Active -> DeletePending (after delete)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MonitorStatus {
    Pending,
    Active,
    DeletePending,
    Error,
    Failed,
    /// A value this crate does not know about, kept verbatim.
    Other(String),
}

impl MonitorStatus {
    pub fn as_str(&self) -> &str {
        match self {
            MonitorStatus::Pending => "MONITOR_STATUS_PENDING",
            MonitorStatus::Active => "MONITOR_STATUS_ACTIVE",
            MonitorStatus::DeletePending => "MONITOR_STATUS_DELETE_PENDING",
            MonitorStatus::Error => "MONITOR_STATUS_ERROR",
            MonitorStatus::Failed => "MONITOR_STATUS_FAILED",
            MonitorStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for MonitorStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "MONITOR_STATUS_PENDING" => MonitorStatus::Pending,
            "MONITOR_STATUS_ACTIVE" => MonitorStatus::Active,
            "MONITOR_STATUS_DELETE_PENDING" => MonitorStatus::DeletePending,
            "MONITOR_STATUS_ERROR" => MonitorStatus::Error,
            "MONITOR_STATUS_FAILED" => MonitorStatus::Failed,
            _ => MonitorStatus::Other(value),
        }
    }
}

impl From<MonitorStatus> for String {
    fn from(value: MonitorStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of one refresh job.
///
/// - Pending -> Running -> Success
/// - Pending | Running -> Failed | Canceled
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RefreshState {
    Pending,
    Running,
    Success,
    Failed,
    Canceled,
    Other(String),
}

impl RefreshState {
    pub fn as_str(&self) -> &str {
        match self {
            RefreshState::Pending => "PENDING",
            RefreshState::Running => "RUNNING",
            RefreshState::Success => "SUCCESS",
            RefreshState::Failed => "FAILED",
            RefreshState::Canceled => "CANCELED",
            RefreshState::Other(raw) => raw,
        }
    }
}

impl From<String> for RefreshState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PENDING" => RefreshState::Pending,
            "RUNNING" => RefreshState::Running,
            "SUCCESS" => RefreshState::Success,
            "FAILED" => RefreshState::Failed,
            "CANCELED" => RefreshState::Canceled,
            _ => RefreshState::Other(value),
        }
    }
}

impl From<RefreshState> for String {
    fn from(value: RefreshState) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RefreshState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
