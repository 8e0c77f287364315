//! InferenceMonitorWorkflow - 推論モニタのプロビジョニング手順
//!
//! # フロー
//! 1. モニタ作成（API エラーは警告して続行。既に存在する場合など）
//! 2. モニタが ACTIVE になるまで待機
//! 3. 初回 refresh が SUCCESS になるまで待機
//! 4. カスタムメトリクスを付けてモニタ更新（API エラーは警告して続行）
//! 5. refresh を起動して SUCCESS まで待機
//!
//! 待機の失敗はどれも致命的で、その場で中断します。

use std::sync::Arc;

use serde::Serialize;
use tracing::{Instrument, info, info_span, warn};

use super::config::WorkflowConfig;
use crate::domain::{
    ClientError, CreateMonitor, CustomMetric, MonitorInfo, MonitorStatus, RefreshId,
    RefreshState, RunId, TableName, UpdateMonitor, WaitError,
};
use crate::ports::MonitorClient;
use crate::wait::{MonitorProbe, RefreshProbe, WaitOutcome, WaitSpec, Waiter};

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Wait(#[from] WaitError),

    #[error("monitor on {0} has no refreshes")]
    NoRefreshes(TableName),
}

/// Result of waiting on one refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshReport {
    pub refresh_id: RefreshId,
    pub state: RefreshState,
    pub polls: u32,
    pub elapsed_ms: u64,
}

impl RefreshReport {
    fn new(refresh_id: RefreshId, outcome: WaitOutcome<RefreshState>) -> Self {
        Self {
            refresh_id,
            state: outcome.status,
            polls: outcome.polls,
            elapsed_ms: u64::try_from(outcome.elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    pub run_id: RunId,
    pub monitor: MonitorInfo,
    pub initial_refresh: RefreshReport,
    pub metrics_refresh: RefreshReport,
    pub profile_metrics_table: TableName,
    pub drift_metrics_table: TableName,
}

/// Wait until the monitor on `table` leaves PENDING and is ACTIVE.
pub async fn wait_for_monitor(
    client: &dyn MonitorClient,
    waiter: &Waiter,
    table: &TableName,
    spec: &WaitSpec<MonitorStatus>,
) -> Result<WaitOutcome<MonitorStatus>, WaitError> {
    waiter.wait(&MonitorProbe::new(client, table), spec).await
}

/// Wait until one refresh leaves PENDING/RUNNING and is SUCCESS.
pub async fn wait_for_refresh(
    client: &dyn MonitorClient,
    waiter: &Waiter,
    table: &TableName,
    refresh_id: RefreshId,
    spec: &WaitSpec<RefreshState>,
) -> Result<RefreshReport, WaitError> {
    let outcome = waiter
        .wait(&RefreshProbe::new(client, table, refresh_id), spec)
        .await?;
    Ok(RefreshReport::new(refresh_id, outcome))
}

/// Trigger a refresh and wait for it.
pub async fn refresh_and_wait(
    client: &dyn MonitorClient,
    waiter: &Waiter,
    table: &TableName,
    spec: &WaitSpec<RefreshState>,
) -> Result<RefreshReport, WorkflowError> {
    let started = client.run_refresh(table).await?;
    info!(refresh_id = %started.refresh_id, %table, "refresh started");
    Ok(wait_for_refresh(client, waiter, table, started.refresh_id, spec).await?)
}

/// The monitor-provisioning sequence, wired by [`super::WorkflowBuilder`].
pub struct InferenceMonitorWorkflow {
    pub(super) client: Arc<dyn MonitorClient>,
    pub(super) waiter: Waiter,
    pub(super) config: WorkflowConfig,
    pub(super) metrics: Vec<CustomMetric>,
    pub(super) monitor_spec: WaitSpec<MonitorStatus>,
    pub(super) refresh_spec: WaitSpec<RefreshState>,
    pub(super) run_id: RunId,
}

impl InferenceMonitorWorkflow {
    pub fn table(&self) -> &TableName {
        &self.config.table
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn metrics(&self) -> &[CustomMetric] {
        &self.metrics
    }

    pub async fn run(&self) -> Result<WorkflowReport, WorkflowError> {
        let span = info_span!("workflow", run_id = %self.run_id, table = %self.table());
        self.run_steps().instrument(span).await
    }

    async fn run_steps(&self) -> Result<WorkflowReport, WorkflowError> {
        self.create_monitor().await?;
        self.wait_for_monitor().await?;
        let initial_refresh = self.wait_for_initial_refresh().await?;
        self.attach_metrics().await?;
        let metrics_refresh = self.refresh_and_wait().await?;
        let monitor = self.client.get_monitor(self.table()).await?;

        info!(
            initial_refresh = %initial_refresh.refresh_id,
            metrics_refresh = %metrics_refresh.refresh_id,
            "inference monitor ready"
        );
        Ok(WorkflowReport {
            run_id: self.run_id,
            monitor,
            initial_refresh,
            metrics_refresh,
            profile_metrics_table: self.table().profile_metrics_table(),
            drift_metrics_table: self.table().drift_metrics_table(),
        })
    }

    /// Create the monitor. `Ok(None)` when the platform rejected the request
    /// (typically because the monitor exists); the run continues with the existing one.
    pub async fn create_monitor(&self) -> Result<Option<MonitorInfo>, WorkflowError> {
        let request = CreateMonitor {
            assets_dir: self.config.assets_dir.clone(),
            output_schema_name: self.config.output_schema_name(),
            inference_log: self.config.inference_log.clone(),
            baseline_table_name: self.config.baseline_table.clone(),
            custom_metrics: Vec::new(),
        };
        match self.client.create_monitor(self.table(), &request).await {
            Ok(info) => {
                info!(status = %info.status, "monitor created");
                Ok(Some(info))
            }
            Err(err @ ClientError::Api { .. }) => {
                warn!(error = %err, "monitor creation rejected, continuing");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn wait_for_monitor(&self) -> Result<WaitOutcome<MonitorStatus>, WorkflowError> {
        Ok(wait_for_monitor(
            self.client.as_ref(),
            &self.waiter,
            self.table(),
            &self.monitor_spec,
        )
        .await?)
    }

    /// Wait for the most recent refresh, which after creation is the initial one.
    pub async fn wait_for_initial_refresh(&self) -> Result<RefreshReport, WorkflowError> {
        let list = self.client.list_refreshes(self.table()).await?;
        let latest = list
            .refreshes
            .first()
            .ok_or_else(|| WorkflowError::NoRefreshes(self.table().clone()))?;
        self.wait_for_refresh(latest.refresh_id).await
    }

    pub async fn wait_for_refresh(
        &self,
        refresh_id: RefreshId,
    ) -> Result<RefreshReport, WorkflowError> {
        Ok(wait_for_refresh(
            self.client.as_ref(),
            &self.waiter,
            self.table(),
            refresh_id,
            &self.refresh_spec,
        )
        .await?)
    }

    /// Replace the monitor configuration, adding the custom metrics.
    pub async fn attach_metrics(&self) -> Result<Option<MonitorInfo>, WorkflowError> {
        let request = UpdateMonitor {
            output_schema_name: self.config.output_schema_name(),
            inference_log: self.config.inference_log.clone(),
            baseline_table_name: self.config.baseline_table.clone(),
            custom_metrics: self.metrics.clone(),
        };
        match self.client.update_monitor(self.table(), &request).await {
            Ok(info) => {
                info!(metrics = self.metrics.len(), "custom metrics attached");
                Ok(Some(info))
            }
            Err(err @ ClientError::Api { .. }) => {
                warn!(error = %err, "monitor update rejected, continuing");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn refresh_and_wait(&self) -> Result<RefreshReport, WorkflowError> {
        refresh_and_wait(
            self.client.as_ref(),
            &self.waiter,
            self.table(),
            &self.refresh_spec,
        )
        .await
    }

    /// Delete the monitor so the sequence can be run again on the same table.
    pub async fn teardown(&self) -> Result<(), WorkflowError> {
        self.client.delete_monitor(self.table()).await?;
        info!(table = %self.table(), "monitor deleted");
        Ok(())
    }
}
