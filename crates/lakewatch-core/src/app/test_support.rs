use super::config::{PollingConfig, WorkflowConfig};
use super::metrics::weighted_error_metrics;
use crate::domain::{Granularity, InferenceLog, ProblemType};

/// Regression monitor on `main.retail.predictions` with the weighted-error suite.
pub(crate) fn sample_config() -> WorkflowConfig {
    WorkflowConfig {
        table: "main.retail.predictions".parse().unwrap(),
        baseline_table: Some("main.retail.predictions_baseline".parse().unwrap()),
        output_schema: None,
        assets_dir: "/Workspace/Users/me/lakewatch".into(),
        inference_log: InferenceLog {
            problem_type: ProblemType::Regression,
            prediction_col: "Prediction".into(),
            timestamp_col: "TransactionDate".into(),
            granularities: vec![Granularity::OneDay, "1 week".parse().unwrap()],
            model_id_col: "ModelVersion".into(),
            label_col: Some("ProductRating".into()),
            prediction_proba_col: None,
        },
        custom_metrics: weighted_error_metrics("Critical").unwrap(),
        polling: PollingConfig::default(),
    }
}
