//! Ready-made custom metrics for regression inference monitors.
//!
//! Weighted MSE: misses on rows flagged by a boolean "critical" column count
//! double. Two aggregates (sum of weights, weighted squared error) feed one
//! derived metric. `r2_score_delta` is a drift metric over the built-in `r2_score`.

use crate::domain::Placeholder::{BaseDf, CurrentDf, LabelCol, PredictionCol};
use crate::domain::metric::is_identifier;
use crate::domain::{MetricError, MetricKind, MetricTemplate};

use super::config::MetricConfig;

/// `weights_sum`, `weighted_se`, `weighted_mse` and `r2_score_delta`.
///
/// `critical_col` must be a plain column identifier.
pub fn weighted_error_metrics(critical_col: &str) -> Result<Vec<MetricConfig>, MetricError> {
    if !is_identifier(critical_col) {
        return Err(MetricError::InvalidName(critical_col.to_string()));
    }

    let weights_sum = MetricTemplate::builder()
        .text("sum(CASE\n  WHEN ")
        .slot(PredictionCol)
        .text(" = ")
        .slot(LabelCol)
        .text(" THEN 0\n  WHEN ")
        .slot(PredictionCol)
        .text(" != ")
        .slot(LabelCol)
        .text(format!(" AND {critical_col}=TRUE THEN 2\n  ELSE 1 END)"))
        .build()?;

    let weighted_se = MetricTemplate::builder()
        .text("sum(CASE\n  WHEN ")
        .slot(PredictionCol)
        .text(" = ")
        .slot(LabelCol)
        .text(" THEN 0\n  WHEN ")
        .slot(PredictionCol)
        .text(" != ")
        .slot(LabelCol)
        .text(format!(" AND {critical_col}=TRUE THEN 2 * POWER("))
        .slot(PredictionCol)
        .text(" - ")
        .slot(LabelCol)
        .text(", 2)\n  ELSE POWER(")
        .slot(PredictionCol)
        .text(" - ")
        .slot(LabelCol)
        .text(", 2) END)")
        .build()?;

    let weighted_mse = MetricTemplate::builder()
        .text("weighted_se / weights_sum")
        .build()?;

    let r2_score_delta = MetricTemplate::builder()
        .slot(CurrentDf)
        .text(".r2_score - ")
        .slot(BaseDf)
        .text(".r2_score")
        .build()?;

    Ok(vec![
        MetricConfig::new(MetricKind::Aggregate, "weights_sum", &weights_sum),
        MetricConfig::new(MetricKind::Aggregate, "weighted_se", &weighted_se),
        MetricConfig::new(MetricKind::Derived, "weighted_mse", &weighted_mse),
        MetricConfig::new(MetricKind::Drift, "r2_score_delta", &r2_score_delta),
    ])
}
