//! Domain identifiers (strongly-typed references to remote resources).
//!
//! # TableName
//! Unity Catalog のテーブルは常に 3 階層の名前空間（`catalog.schema.table`）で参照します。
//! 文字列のまま持ち回ると、2 階層名や空セグメントがリモートまで届いてから失敗するので、
//! 構築時に検証して以降は不変として扱います。
//!
//! # RunId
//! ワークフロー 1 回の実行を識別する ULID。tracing の span に載せてログを相関させます。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Fully-qualified `catalog.schema.table` name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName {
    catalog: String,
    schema: String,
    table: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableNameError {
    #[error("table name must have exactly three dot-separated parts, got {0:?}")]
    NotThreeLevel(String),

    #[error("table name {0:?} contains an empty or whitespace segment")]
    EmptySegment(String),
}

impl TableName {
    pub fn new(
        catalog: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Result<Self, TableNameError> {
        let name = Self {
            catalog: catalog.into(),
            schema: schema.into(),
            table: table.into(),
        };
        let bad = |s: &str| s.is_empty() || s.chars().any(char::is_whitespace) || s.contains('.');
        if bad(&name.catalog) || bad(&name.schema) || bad(&name.table) {
            return Err(TableNameError::EmptySegment(name.to_string()));
        }
        Ok(name)
    }

    pub fn catalog(&self) -> &str {
        &self.catalog
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// `catalog.schema`, the form the platform expects for `output_schema_name`.
    pub fn schema_name(&self) -> String {
        format!("{}.{}", self.catalog, self.schema)
    }

    /// Sibling table in the same schema with a suffix appended, e.g. `_profile_metrics`.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        Self {
            catalog: self.catalog.clone(),
            schema: self.schema.clone(),
            table: format!("{}{}", self.table, suffix),
        }
    }

    /// Table where the platform writes profile metrics.
    pub fn profile_metrics_table(&self) -> Self {
        self.with_suffix("_profile_metrics")
    }

    /// Table where the platform writes drift metrics.
    pub fn drift_metrics_table(&self) -> Self {
        self.with_suffix("_drift_metrics")
    }
}

impl FromStr for TableName {
    type Err = TableNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        let [catalog, schema, table] = parts.as_slice() else {
            return Err(TableNameError::NotThreeLevel(s.to_string()));
        };
        Self::new(*catalog, *schema, *table)
    }
}

impl TryFrom<String> for TableName {
    type Error = TableNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TableName> for String {
    fn from(value: TableName) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.catalog, self.schema, self.table)
    }
}

/// Identifier the platform assigns to one refresh job of a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefreshId(pub i64);

impl fmt::Display for RefreshId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one workflow run (log correlation only).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(Ulid);

impl RunId {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for RunId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}
