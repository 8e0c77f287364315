//! Monitor configuration and the records the platform returns about monitors.
//!
//! Field names follow the platform's JSON so these types double as request and
//! response bodies. Optional fields the platform may omit carry `#[serde(default)]`.

use serde::{Deserialize, Serialize};

use super::granularity::Granularity;
use super::ids::{RefreshId, TableName};
use super::metric::CustomMetric;
use super::state::{MonitorStatus, RefreshState};

/// Kind of model whose predictions are monitored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProblemType {
    #[serde(rename = "PROBLEM_TYPE_REGRESSION")]
    Regression,
    #[serde(rename = "PROBLEM_TYPE_CLASSIFICATION")]
    Classification,
}

/// Inference-log profile: which columns hold predictions, labels and model versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceLog {
    pub problem_type: ProblemType,
    pub prediction_col: String,
    pub timestamp_col: String,
    pub granularities: Vec<Granularity>,
    /// Column that slices metrics per model version.
    pub model_id_col: String,

    /// Ground-truth column. Without it only prediction drift is computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_col: Option<String>,

    /// Classification only: column with predicted class probabilities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_proba_col: Option<String>,
}

/// Body of a create-monitor request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateMonitor {
    pub assets_dir: String,
    pub output_schema_name: String,
    pub inference_log: InferenceLog,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_table_name: Option<TableName>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_metrics: Vec<CustomMetric>,
}

/// Body of an update-monitor request. The platform replaces the whole
/// configuration, so every field of the current monitor must be resent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateMonitor {
    pub output_schema_name: String,
    pub inference_log: InferenceLog,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_table_name: Option<TableName>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_metrics: Vec<CustomMetric>,
}

/// Monitor as reported by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorInfo {
    pub table_name: TableName,
    pub status: MonitorStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_metrics_table_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drift_metrics_table_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets_dir: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_table_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference_log: Option<InferenceLog>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_metrics: Vec<CustomMetric>,
}

/// What started a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefreshTrigger {
    Manual,
    Schedule,
    #[serde(other)]
    Unknown,
}

/// One refresh job of a monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorRefreshInfo {
    pub refresh_id: RefreshId,
    pub state: RefreshState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time_ms: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time_ms: Option<i64>,

    /// Failure detail when the refresh did not succeed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<RefreshTrigger>,
}

/// Response of the list-refreshes call, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshList {
    #[serde(default)]
    pub refreshes: Vec<MonitorRefreshInfo>,
}
