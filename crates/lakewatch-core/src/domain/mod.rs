//! Domain model (identifiers, status vocabularies, monitor configuration, metrics).

pub mod errors;
pub mod granularity;
pub mod ids;
pub mod metric;
pub mod monitor;
pub mod state;

pub use self::errors::{ClientError, ErrorKind, WaitError};
pub use self::granularity::{Granularity, GranularityError};
pub use self::ids::{RefreshId, RunId, TableName, TableNameError};
pub use self::metric::{
    Bindings, CustomMetric, CustomMetricBuilder, MetricError, MetricKind, MetricTemplate,
    OutputType, Placeholder, TemplateBuilder, TABLE_INPUT,
};
pub use self::monitor::{
    CreateMonitor, InferenceLog, MonitorInfo, MonitorRefreshInfo, ProblemType, RefreshList,
    RefreshTrigger, UpdateMonitor,
};
pub use self::state::{MonitorStatus, RefreshState};
