//! Application layer: configuration, wiring and the provisioning workflow.

pub mod builder;
pub mod config;
pub mod metrics;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_support;

pub use self::builder::{BuildError, WorkflowBuilder};
pub use self::config::{ConfigError, MetricConfig, PollingConfig, WorkflowConfig};
pub use self::metrics::weighted_error_metrics;
pub use self::workflow::{
    InferenceMonitorWorkflow, RefreshReport, WorkflowError, WorkflowReport, refresh_and_wait,
    wait_for_monitor, wait_for_refresh,
};
