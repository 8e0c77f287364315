//! Status sources: a status read bound to one remote resource.

use std::fmt;

use async_trait::async_trait;

use crate::domain::{ClientError, MonitorStatus, RefreshId, RefreshState, TableName};
use crate::ports::MonitorClient;

/// Reads the current status of one remote resource.
///
/// The resource reference is fixed when the source is built and does not
/// change while a wait is in progress.
#[async_trait]
pub trait StatusSource: Send + Sync {
    type Status: Clone + PartialEq + fmt::Display + Send + Sync;

    /// Human-readable label used in logs and errors.
    fn resource(&self) -> String;

    async fn fetch(&self) -> Result<Self::Status, ClientError>;
}

/// Provisioning status of the monitor on `table`.
pub struct MonitorProbe<'a> {
    client: &'a dyn MonitorClient,
    table: &'a TableName,
}

impl<'a> MonitorProbe<'a> {
    pub fn new(client: &'a dyn MonitorClient, table: &'a TableName) -> Self {
        Self { client, table }
    }
}

#[async_trait]
impl StatusSource for MonitorProbe<'_> {
    type Status = MonitorStatus;

    fn resource(&self) -> String {
        format!("monitor on {}", self.table)
    }

    async fn fetch(&self) -> Result<MonitorStatus, ClientError> {
        Ok(self.client.get_monitor(self.table).await?.status)
    }
}

/// State of one refresh job of the monitor on `table`.
pub struct RefreshProbe<'a> {
    client: &'a dyn MonitorClient,
    table: &'a TableName,
    refresh_id: RefreshId,
}

impl<'a> RefreshProbe<'a> {
    pub fn new(client: &'a dyn MonitorClient, table: &'a TableName, refresh_id: RefreshId) -> Self {
        Self {
            client,
            table,
            refresh_id,
        }
    }
}

#[async_trait]
impl StatusSource for RefreshProbe<'_> {
    type Status = RefreshState;

    fn resource(&self) -> String {
        format!("refresh {} of {}", self.refresh_id, self.table)
    }

    async fn fetch(&self) -> Result<RefreshState, ClientError> {
        Ok(self
            .client
            .get_refresh(self.table, self.refresh_id)
            .await?
            .state)
    }
}
