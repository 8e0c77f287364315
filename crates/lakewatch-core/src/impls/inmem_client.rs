//! InMemoryMonitorClient - 開発・テスト用のモニタリング基盤
//!
//! # 学習ポイント
//! - tokio::sync::Mutex で状態を保護（ロックを跨いで await しない）
//! - ステータスの遷移をスクリプトとして与え、読み取りごとに 1 つ進める
//!
//! 各スクリプトは最後の値で止まります（例: `[Pending, Active]` なら 2 回目以降は常に Active）。

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    ClientError, CreateMonitor, MonitorInfo, MonitorRefreshInfo, MonitorStatus, RefreshId,
    RefreshList, RefreshState, RefreshTrigger, TableName, UpdateMonitor,
};
use crate::ports::MonitorClient;

/// Values handed out one per read; the last one sticks.
#[derive(Debug, Clone)]
struct Script<S> {
    pending: VecDeque<S>,
    current: S,
}

impl<S: Clone> Script<S> {
    fn new(steps: &[S], fallback: S) -> Self {
        let mut pending: VecDeque<S> = steps.iter().cloned().collect();
        let current = pending.pop_front().unwrap_or(fallback);
        Self { pending, current }
    }

    /// Current value, then advance.
    fn read(&mut self) -> S {
        let value = self.current.clone();
        if let Some(next) = self.pending.pop_front() {
            self.current = next;
        }
        value
    }
}

#[derive(Debug)]
struct RefreshEntry {
    info: MonitorRefreshInfo,
    script: Script<RefreshState>,
}

#[derive(Debug)]
struct MonitorEntry {
    info: MonitorInfo,
    status: Script<MonitorStatus>,
    /// Oldest first; listed newest first.
    refreshes: Vec<RefreshEntry>,
}

#[derive(Debug, Default)]
struct State {
    monitors: HashMap<TableName, MonitorEntry>,
    next_refresh_id: i64,
}

/// In-memory stand-in for the monitoring platform.
#[derive(Clone)]
pub struct InMemoryMonitorClient {
    state: Arc<Mutex<State>>,
    provisioning: Vec<MonitorStatus>,
    refresh_script: Vec<RefreshState>,
}

impl InMemoryMonitorClient {
    /// Monitors go PENDING -> ACTIVE; refreshes go PENDING -> RUNNING -> SUCCESS.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                monitors: HashMap::new(),
                next_refresh_id: 1,
            })),
            provisioning: vec![MonitorStatus::Pending, MonitorStatus::Active],
            refresh_script: vec![
                RefreshState::Pending,
                RefreshState::Running,
                RefreshState::Success,
            ],
        }
    }

    /// Status sequence reported by `get_monitor` after a create.
    pub fn with_provisioning(mut self, statuses: Vec<MonitorStatus>) -> Self {
        self.provisioning = statuses;
        self
    }

    /// State sequence reported by `get_refresh` for every new refresh.
    pub fn with_refresh_script(mut self, states: Vec<RefreshState>) -> Self {
        self.refresh_script = states;
        self
    }

    /// Current record for `table`, without advancing any script.
    pub async fn monitor(&self, table: &TableName) -> Option<MonitorInfo> {
        self.state
            .lock()
            .await
            .monitors
            .get(table)
            .map(|entry| entry.info.clone())
    }

    fn not_found(table: &TableName) -> ClientError {
        ClientError::NotFound(format!("monitor on {table}"))
    }

    fn start_refresh(
        &self,
        state: &mut State,
        table: &TableName,
        trigger: RefreshTrigger,
    ) -> Option<MonitorRefreshInfo> {
        let id = RefreshId(state.next_refresh_id);
        let entry = state.monitors.get_mut(table)?;
        state.next_refresh_id += 1;

        let script = Script::new(&self.refresh_script, RefreshState::Success);
        let info = MonitorRefreshInfo {
            refresh_id: id,
            state: script.current.clone(),
            start_time_ms: None,
            end_time_ms: None,
            message: None,
            trigger: Some(trigger),
        };
        entry.refreshes.push(RefreshEntry {
            info: info.clone(),
            script,
        });
        Some(info)
    }
}

impl Default for InMemoryMonitorClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MonitorClient for InMemoryMonitorClient {
    async fn create_monitor(
        &self,
        table: &TableName,
        request: &CreateMonitor,
    ) -> Result<MonitorInfo, ClientError> {
        let mut state = self.state.lock().await;
        if state.monitors.contains_key(table) {
            return Err(ClientError::Api {
                status: 409,
                body: format!("monitor already exists for {table}"),
            });
        }

        let status = Script::new(&self.provisioning, MonitorStatus::Active);
        let info = MonitorInfo {
            table_name: table.clone(),
            status: status.current.clone(),
            monitor_version: Some("0".to_string()),
            profile_metrics_table_name: Some(table.profile_metrics_table().to_string()),
            drift_metrics_table_name: Some(table.drift_metrics_table().to_string()),
            dashboard_id: None,
            assets_dir: Some(request.assets_dir.clone()),
            output_schema_name: Some(request.output_schema_name.clone()),
            baseline_table_name: request.baseline_table_name.as_ref().map(ToString::to_string),
            inference_log: Some(request.inference_log.clone()),
            custom_metrics: request.custom_metrics.clone(),
        };
        state.monitors.insert(
            table.clone(),
            MonitorEntry {
                info: info.clone(),
                status,
                refreshes: Vec::new(),
            },
        );
        // The platform schedules an initial refresh on creation.
        self.start_refresh(&mut state, table, RefreshTrigger::Schedule);
        Ok(info)
    }

    async fn update_monitor(
        &self,
        table: &TableName,
        request: &UpdateMonitor,
    ) -> Result<MonitorInfo, ClientError> {
        let mut state = self.state.lock().await;
        let entry = state
            .monitors
            .get_mut(table)
            .ok_or_else(|| Self::not_found(table))?;

        entry.info.output_schema_name = Some(request.output_schema_name.clone());
        entry.info.inference_log = Some(request.inference_log.clone());
        entry.info.baseline_table_name =
            request.baseline_table_name.as_ref().map(ToString::to_string);
        entry.info.custom_metrics = request.custom_metrics.clone();
        let version: u64 = entry
            .info
            .monitor_version
            .as_deref()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        entry.info.monitor_version = Some((version + 1).to_string());
        Ok(entry.info.clone())
    }

    async fn get_monitor(&self, table: &TableName) -> Result<MonitorInfo, ClientError> {
        let mut state = self.state.lock().await;
        let entry = state
            .monitors
            .get_mut(table)
            .ok_or_else(|| Self::not_found(table))?;
        entry.info.status = entry.status.read();
        Ok(entry.info.clone())
    }

    async fn delete_monitor(&self, table: &TableName) -> Result<(), ClientError> {
        let mut state = self.state.lock().await;
        state
            .monitors
            .remove(table)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(table))
    }

    async fn run_refresh(&self, table: &TableName) -> Result<MonitorRefreshInfo, ClientError> {
        let mut state = self.state.lock().await;
        self.start_refresh(&mut state, table, RefreshTrigger::Manual)
            .ok_or_else(|| Self::not_found(table))
    }

    async fn list_refreshes(&self, table: &TableName) -> Result<RefreshList, ClientError> {
        let state = self.state.lock().await;
        let entry = state
            .monitors
            .get(table)
            .ok_or_else(|| Self::not_found(table))?;
        Ok(RefreshList {
            refreshes: entry.refreshes.iter().rev().map(|r| r.info.clone()).collect(),
        })
    }

    async fn get_refresh(
        &self,
        table: &TableName,
        refresh_id: RefreshId,
    ) -> Result<MonitorRefreshInfo, ClientError> {
        let mut state = self.state.lock().await;
        let entry = state
            .monitors
            .get_mut(table)
            .ok_or_else(|| Self::not_found(table))?;
        let refresh = entry
            .refreshes
            .iter_mut()
            .find(|r| r.info.refresh_id == refresh_id)
            .ok_or_else(|| ClientError::NotFound(format!("refresh {refresh_id} of {table}")))?;
        refresh.info.state = refresh.script.read();
        Ok(refresh.info.clone())
    }
}
