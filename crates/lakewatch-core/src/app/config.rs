//! WorkflowConfig - ワークフロー設定（JSON ファイル）
//!
//! 接続情報（host / token）はここに含めません。CLI のフラグか環境変数から渡します。

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{
    CustomMetric, InferenceLog, MetricError, MetricKind, MetricTemplate, MonitorStatus,
    OutputType, RefreshState, TABLE_INPUT, TableName,
};
use crate::wait::{RetryPolicy, WaitSpec};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Everything needed to provision and refresh one inference monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowConfig {
    /// Table holding the predictions to monitor.
    pub table: TableName,

    /// Reference snapshot for baseline drift. Without it only consecutive windows are compared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_table: Option<TableName>,

    /// Schema for the metric tables. Defaults to the monitored table's schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<String>,

    /// Workspace directory for the generated dashboard.
    pub assets_dir: String,

    pub inference_log: InferenceLog,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_metrics: Vec<MetricConfig>,

    #[serde(default)]
    pub polling: PollingConfig,
}

/// One custom metric as written in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricConfig {
    pub kind: MetricKind,
    pub name: String,
    /// Template with `{{placeholder}}` slots.
    pub definition: String,

    #[serde(default = "default_input_columns")]
    pub input_columns: Vec<String>,

    #[serde(default = "default_output_type")]
    pub output_type: OutputType,
}

fn default_input_columns() -> Vec<String> {
    vec![TABLE_INPUT.to_string()]
}

fn default_output_type() -> OutputType {
    OutputType::Double
}

impl MetricConfig {
    pub fn new(kind: MetricKind, name: impl Into<String>, template: &MetricTemplate) -> Self {
        Self {
            kind,
            name: name.into(),
            definition: template.to_definition(),
            input_columns: default_input_columns(),
            output_type: default_output_type(),
        }
    }

    pub fn build(&self) -> Result<CustomMetric, MetricError> {
        let template = MetricTemplate::parse(&self.definition)?;
        let builder = match self.kind {
            MetricKind::Aggregate => CustomMetric::aggregate(&self.name, template),
            MetricKind::Derived => CustomMetric::derived(&self.name, template),
            MetricKind::Drift => CustomMetric::drift(&self.name, template),
        };
        builder
            .input_columns(self.input_columns.iter().cloned())
            .output(self.output_type)
            .build()
    }
}

/// Pacing of the two waits and of transient-error retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollingConfig {
    pub monitor_interval_secs: u64,
    pub refresh_interval_secs: u64,
    /// Upper bound for each wait. Unset waits indefinitely.
    pub deadline_secs: Option<u64>,
    pub fetch_retries: u32,
    pub retry_base_delay_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            monitor_interval_secs: 10,
            refresh_interval_secs: 30,
            deadline_secs: None,
            fetch_retries: 3,
            retry_base_delay_secs: 2,
        }
    }
}

impl PollingConfig {
    fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }

    pub fn monitor_spec(&self) -> WaitSpec<MonitorStatus> {
        WaitSpec::monitor_provisioning()
            .with_interval(Duration::from_secs(self.monitor_interval_secs))
            .with_deadline(self.deadline())
    }

    pub fn refresh_spec(&self) -> WaitSpec<RefreshState> {
        WaitSpec::refresh()
            .with_interval(Duration::from_secs(self.refresh_interval_secs))
            .with_deadline(self.deadline())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_secs(self.retry_base_delay_secs),
            max_retries: self.fetch_retries,
            ..RetryPolicy::default()
        }
    }
}

impl WorkflowConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn output_schema_name(&self) -> String {
        self.output_schema
            .clone()
            .unwrap_or_else(|| self.table.schema_name())
    }

    /// Checks that do not need the platform. Metric templates are checked by `build_metrics`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let log = &self.inference_log;
        if log.granularities.is_empty() {
            return Err(ConfigError::Invalid(
                "inference_log.granularities must not be empty".into(),
            ));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = log.granularities.iter().find(|g| !seen.insert(**g)) {
            return Err(ConfigError::Invalid(format!("duplicate granularity {dup}")));
        }
        for (field, value) in [
            ("prediction_col", &log.prediction_col),
            ("timestamp_col", &log.timestamp_col),
            ("model_id_col", &log.model_id_col),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("inference_log.{field} is empty")));
            }
        }
        if self.baseline_table.as_ref() == Some(&self.table) {
            return Err(ConfigError::Invalid(
                "baseline_table must differ from the monitored table".into(),
            ));
        }
        if self.assets_dir.trim().is_empty() {
            return Err(ConfigError::Invalid("assets_dir is empty".into()));
        }
        if self.polling.monitor_interval_secs == 0 || self.polling.refresh_interval_secs == 0 {
            return Err(ConfigError::Invalid("polling intervals must be positive".into()));
        }
        let mut names = HashSet::new();
        if let Some(dup) = self.custom_metrics.iter().find(|m| !names.insert(m.name.as_str())) {
            return Err(ConfigError::Invalid(format!("duplicate metric name {}", dup.name)));
        }
        Ok(())
    }

    pub fn build_metrics(&self) -> Result<Vec<CustomMetric>, MetricError> {
        self.custom_metrics.iter().map(MetricConfig::build).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Granularity, ProblemType};
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "table": "main.retail.silver_transaction_predictions",
        "baseline_table": "main.retail.silver_predictions_baseline",
        "assets_dir": "/Workspace/Users/me/lakewatch",
        "inference_log": {
            "problem_type": "PROBLEM_TYPE_REGRESSION",
            "prediction_col": "Prediction",
            "timestamp_col": "TransactionDate",
            "granularities": ["1 day", "1 week"],
            "model_id_col": "ModelVersion",
            "label_col": "ProductRating"
        },
        "custom_metrics": [
            { "kind": "derived", "name": "weighted_mse", "definition": "weighted_se / weights_sum" }
        ],
        "polling": { "refresh_interval_secs": 5 }
    }"#;

    fn sample() -> WorkflowConfig {
        serde_json::from_str(SAMPLE).unwrap()
    }

    #[test]
    fn parses_sample_with_defaults() {
        let cfg = sample();
        assert_eq!(cfg.inference_log.problem_type, ProblemType::Regression);
        assert_eq!(
            cfg.inference_log.granularities,
            vec![Granularity::OneDay, "1 week".parse().unwrap()]
        );
        assert_eq!(cfg.output_schema_name(), "main.retail");
        assert_eq!(cfg.polling.refresh_interval_secs, 5);
        assert_eq!(cfg.polling.monitor_interval_secs, 10);
        assert_eq!(cfg.custom_metrics[0].input_columns, vec![":table"]);
        assert_eq!(cfg.custom_metrics[0].output_type, OutputType::Double);
        cfg.validate().unwrap();
    }

    #[test]
    fn polling_maps_to_wait_specs() {
        let mut cfg = sample();
        cfg.polling.deadline_secs = Some(600);

        let monitor = cfg.polling.monitor_spec();
        assert_eq!(monitor.interval, Duration::from_secs(10));
        assert_eq!(monitor.in_progress, vec![MonitorStatus::Pending]);
        assert_eq!(monitor.deadline, Some(Duration::from_secs(600)));

        let refresh = cfg.polling.refresh_spec();
        assert_eq!(refresh.interval, Duration::from_secs(5));
        assert_eq!(refresh.accepted, vec![RefreshState::Success]);

        assert_eq!(cfg.polling.retry_policy().max_retries, 3);
    }

    #[test]
    fn rejects_unknown_fields_and_bad_granularities() {
        let typo = SAMPLE.replace("\"assets_dir\"", "\"asset_dir\"");
        assert!(serde_json::from_str::<WorkflowConfig>(&typo).is_err());

        let bad = SAMPLE.replace("\"1 week\"", "\"2 days\"");
        assert!(serde_json::from_str::<WorkflowConfig>(&bad).is_err());
    }

    #[test]
    fn validate_catches_inconsistencies() {
        let mut cfg = sample();
        cfg.inference_log.granularities.push(Granularity::OneDay);
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(msg)) if msg.contains("duplicate granularity")));

        let mut cfg = sample();
        cfg.baseline_table = Some(cfg.table.clone());
        assert!(cfg.validate().is_err());

        let mut cfg = sample();
        cfg.polling.refresh_interval_secs = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = sample();
        cfg.custom_metrics.push(cfg.custom_metrics[0].clone());
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(msg)) if msg.contains("weighted_mse")));
    }

    #[test]
    fn build_metrics_surfaces_template_errors() {
        let mut cfg = sample();
        assert_eq!(cfg.build_metrics().unwrap().len(), 1);

        cfg.custom_metrics[0].definition = "{{labl_col}} / 2".into();
        assert_eq!(
            cfg.build_metrics(),
            Err(MetricError::UnknownPlaceholder("labl_col".into()))
        );
    }

    #[test]
    fn load_reports_path_on_failure() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let cfg = WorkflowConfig::load(file.path()).unwrap();
        assert_eq!(cfg, sample());

        let missing = file.path().with_extension("missing");
        assert!(matches!(WorkflowConfig::load(&missing), Err(ConfigError::Io { .. })));

        let mut broken = tempfile::NamedTempFile::new().unwrap();
        broken.write_all(b"{ not json").unwrap();
        let err = WorkflowConfig::load(broken.path()).unwrap_err();
        assert!(err.to_string().contains(&broken.path().display().to_string()));
    }
}
