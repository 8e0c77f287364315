//! Errors - エラー型と分類
//!
//! # 分類
//! - Transient: 一時的なエラー（ネットワーク断、429、5xx）。待機ループ内でのみ再試行する
//! - Permanent: 恒久的なエラー（404、4xx、デコード失敗）。即座に呼び出し元へ返す

use std::time::Duration;

/// ErrorKind は実行エラーの分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
}

/// Failure of one call to the monitoring platform.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("platform returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("invalid workspace host {0}")]
    InvalidHost(String),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Transport(_) => ErrorKind::Transient,
            ClientError::Api { status, .. } if *status == 429 || *status >= 500 => {
                ErrorKind::Transient
            }
            _ => ErrorKind::Permanent,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

/// Why a wait on a remote operation ended without success.
#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    /// The operation reached a terminal status outside the accepted set.
    #[error("{resource} ended in {status} after {polls} poll(s)")]
    NotSucceeded {
        resource: String,
        status: String,
        polls: u32,
    },

    /// The optional deadline passed while the operation was still in progress.
    #[error("{resource} still {last_status} after {elapsed:?}")]
    DeadlineExceeded {
        resource: String,
        last_status: String,
        elapsed: Duration,
    },

    #[error("fetching status of {resource} failed: {source}")]
    Fetch {
        resource: String,
        #[source]
        source: ClientError,
    },
}

impl WaitError {
    /// Observed status for failures that have one.
    pub fn status(&self) -> Option<&str> {
        match self {
            WaitError::NotSucceeded { status, .. } => Some(status),
            WaitError::DeadlineExceeded { last_status, .. } => Some(last_status),
            WaitError::Fetch { .. } => None,
        }
    }
}
