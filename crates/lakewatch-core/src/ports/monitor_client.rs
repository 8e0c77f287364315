//! MonitorClient port - データ品質モニタリング基盤への窓口
//!
//! 実装は起動時に 1 つだけ作り、`Arc<dyn MonitorClient>` として共有します。
//! 途中でクライアントを作り直すことはしません。
//!
//! # 実装
//! - **HttpMonitorClient**: REST API（本番用）
//! - **InMemoryMonitorClient**: スクリプト化された状態遷移（テスト・dry-run 用）

use async_trait::async_trait;

use crate::domain::{
    ClientError, CreateMonitor, MonitorInfo, MonitorRefreshInfo, RefreshId, RefreshList,
    TableName, UpdateMonitor,
};

/// Remote operations on quality monitors, keyed by the monitored table.
#[async_trait]
pub trait MonitorClient: Send + Sync {
    async fn create_monitor(
        &self,
        table: &TableName,
        request: &CreateMonitor,
    ) -> Result<MonitorInfo, ClientError>;

    async fn update_monitor(
        &self,
        table: &TableName,
        request: &UpdateMonitor,
    ) -> Result<MonitorInfo, ClientError>;

    async fn get_monitor(&self, table: &TableName) -> Result<MonitorInfo, ClientError>;

    async fn delete_monitor(&self, table: &TableName) -> Result<(), ClientError>;

    /// Queue a metric refresh. The returned record is usually still PENDING.
    async fn run_refresh(&self, table: &TableName) -> Result<MonitorRefreshInfo, ClientError>;

    async fn list_refreshes(&self, table: &TableName) -> Result<RefreshList, ClientError>;

    async fn get_refresh(
        &self,
        table: &TableName,
        refresh_id: RefreshId,
    ) -> Result<MonitorRefreshInfo, ClientError>;
}
