//! Waiter - 非同期リモート操作の完了待ち
//!
//! # フロー
//! 1. StatusSource::fetch() で現在のステータスを取得
//! 2. in_progress に含まれていれば interval だけ sleep して 1 に戻る
//! 3. 含まれていなければ終端。accepted に含まれれば成功、それ以外は失敗
//!
//! 終端ステータスを観測した後に追加の fetch はしません。
//! 期限（deadline）を設定しない限り、進行中のステータスが続く間は待ち続けます。

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{Instrument, debug, info, info_span, warn};

use super::retry::RetryPolicy;
use super::source::StatusSource;
use crate::domain::{MonitorStatus, RefreshState, WaitError};
use crate::ports::{Clock, SystemClock};

/// Status vocabulary and pacing for one kind of remote operation.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitSpec<S> {
    /// Pause between two status reads.
    pub interval: Duration,

    /// Statuses that mean "keep polling".
    pub in_progress: Vec<S>,

    /// Terminal statuses that count as success.
    pub accepted: Vec<S>,

    /// Give up after this much time has elapsed. `None` waits indefinitely.
    pub deadline: Option<Duration>,
}

impl<S> WaitSpec<S> {
    pub fn new(interval: Duration, in_progress: Vec<S>, accepted: Vec<S>) -> Self {
        Self {
            interval,
            in_progress,
            accepted,
            deadline: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }
}

impl WaitSpec<MonitorStatus> {
    /// Monitor creation: leave PENDING, must become ACTIVE.
    pub fn monitor_provisioning() -> Self {
        Self::new(
            Duration::from_secs(10),
            vec![MonitorStatus::Pending],
            vec![MonitorStatus::Active],
        )
    }
}

impl WaitSpec<RefreshState> {
    /// Refresh job: leave PENDING/RUNNING, must become SUCCESS.
    pub fn refresh() -> Self {
        Self::new(
            Duration::from_secs(30),
            vec![RefreshState::Pending, RefreshState::Running],
            vec![RefreshState::Success],
        )
    }
}

/// Successful end of a wait.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitOutcome<S> {
    pub status: S,
    /// Successful status reads, including the terminal one.
    pub polls: u32,
    pub elapsed: Duration,
}

/// Polls a [`StatusSource`] until it leaves the in-progress set.
#[derive(Clone)]
pub struct Waiter {
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl Waiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub async fn wait<Src>(
        &self,
        source: &Src,
        spec: &WaitSpec<Src::Status>,
    ) -> Result<WaitOutcome<Src::Status>, WaitError>
    where
        Src: StatusSource + ?Sized,
    {
        let resource = source.resource();
        let span = info_span!("wait", resource = %resource);
        self.poll_until_terminal(source, spec, &resource)
            .instrument(span)
            .await
    }

    async fn poll_until_terminal<Src>(
        &self,
        source: &Src,
        spec: &WaitSpec<Src::Status>,
        resource: &str,
    ) -> Result<WaitOutcome<Src::Status>, WaitError>
    where
        Src: StatusSource + ?Sized,
    {
        let started = self.clock.now();
        let mut polls: u32 = 0;

        loop {
            let status = self
                .fetch_with_retry(source, resource, started, spec.deadline)
                .await?;
            polls += 1;
            let elapsed = self.elapsed_since(started);

            if !spec.in_progress.contains(&status) {
                if spec.accepted.contains(&status) {
                    info!(%status, polls, ?elapsed, "operation finished");
                    return Ok(WaitOutcome {
                        status,
                        polls,
                        elapsed,
                    });
                }
                warn!(%status, polls, ?elapsed, "operation ended without success");
                return Err(WaitError::NotSucceeded {
                    resource: resource.to_string(),
                    status: status.to_string(),
                    polls,
                });
            }

            if let Some(deadline) = spec.deadline
                && elapsed >= deadline
            {
                warn!(%status, polls, ?elapsed, "deadline exceeded");
                return Err(WaitError::DeadlineExceeded {
                    resource: resource.to_string(),
                    last_status: status.to_string(),
                    elapsed,
                });
            }

            debug!(%status, polls, "still in progress");
            self.clock.sleep(spec.interval).await;
        }
    }

    fn elapsed_since(&self, started: DateTime<Utc>) -> Duration {
        (self.clock.now() - started).to_std().unwrap_or_default()
    }

    /// Retry sleeps count against `deadline`: a retry that would end past it is not attempted.
    async fn fetch_with_retry<Src>(
        &self,
        source: &Src,
        resource: &str,
        started: DateTime<Utc>,
        deadline: Option<Duration>,
    ) -> Result<Src::Status, WaitError>
    where
        Src: StatusSource + ?Sized,
    {
        let mut attempts: u32 = 0;
        loop {
            match source.fetch().await {
                Ok(status) => return Ok(status),
                Err(err) if err.is_transient() && attempts < self.retry.max_retries => {
                    attempts += 1;
                    let delay = self.retry.next_delay(attempts);
                    if let Some(deadline) = deadline
                        && self.elapsed_since(started) + delay > deadline
                    {
                        warn!(error = %err, attempts, ?delay, "no time left before the deadline, not retrying");
                        return Err(WaitError::Fetch {
                            resource: resource.to_string(),
                            source: err,
                        });
                    }
                    warn!(error = %err, attempts, ?delay, "transient error reading status, retrying");
                    self.clock.sleep(delay).await;
                }
                Err(err) => {
                    return Err(WaitError::Fetch {
                        resource: resource.to_string(),
                        source: err,
                    });
                }
            }
        }
    }
}

impl Default for Waiter {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}
