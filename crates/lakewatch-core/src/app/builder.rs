//! WorkflowBuilder - ワークフローの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンでクライアント・時計・ID 生成器を注入
//! - 起動時検証（Fail-fast 設計）: 設定とカスタムメトリクスは build() で全て検証し、
//!   リモート呼び出しの途中で失敗しないようにする

use std::sync::Arc;

use super::config::{ConfigError, WorkflowConfig};
use super::workflow::InferenceMonitorWorkflow;
use crate::domain::MetricError;
use crate::ports::{Clock, IdGenerator, MonitorClient, SystemClock, UlidGenerator};
use crate::wait::Waiter;

/// WorkflowBuilder は [`InferenceMonitorWorkflow`] を構築
///
/// # 使用例
/// ```ignore
/// let workflow = WorkflowBuilder::new()
///     .config(WorkflowConfig::load(path)?)
///     .client(Arc::new(HttpMonitorClient::new(host, token)?))
///     .build()?;
/// let report = workflow.run().await?;
/// ```
pub struct WorkflowBuilder {
    config: Option<WorkflowConfig>,
    client: Option<Arc<dyn MonitorClient>>,
    clock: Arc<dyn Clock>,
    ids: Option<Box<dyn IdGenerator>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no monitor client was given")]
    MissingClient,

    #[error("no workflow configuration was given")]
    MissingConfig,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("custom metric: {0}")]
    Metric(#[from] MetricError),
}

impl WorkflowBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            client: None,
            clock: Arc::new(SystemClock),
            ids: None,
        }
    }

    pub fn config(mut self, config: WorkflowConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn client(mut self, client: Arc<dyn MonitorClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Drives both the waits' sleeps and the run id timestamp.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Some(Box::new(ids));
        self
    }

    /// # 検証
    /// - client と config が揃っているか
    /// - WorkflowConfig::validate()
    /// - 全カスタムメトリクスのテンプレートと種別ごとの制約
    pub fn build(self) -> Result<InferenceMonitorWorkflow, BuildError> {
        let client = self.client.ok_or(BuildError::MissingClient)?;
        let config = self.config.ok_or(BuildError::MissingConfig)?;
        config.validate()?;
        let metrics = config.build_metrics()?;

        let run_id = match &self.ids {
            Some(ids) => ids.generate_run_id(),
            None => UlidGenerator::new(self.clock.clone()).generate_run_id(),
        };
        let waiter = Waiter::new(self.clock).with_retry(config.polling.retry_policy());

        Ok(InferenceMonitorWorkflow {
            client,
            waiter,
            monitor_spec: config.polling.monitor_spec(),
            refresh_spec: config.polling.refresh_spec(),
            metrics,
            config,
            run_id,
        })
    }
}

impl Default for WorkflowBuilder {
    fn default() -> Self {
        Self::new()
    }
}
