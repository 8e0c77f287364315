//! lakewatch-core
//!
//! Provision a Lakehouse inference monitor and wait for its asynchronous
//! operations (monitor creation, metric refreshes) to finish.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, state, granularity, metric, monitor, errors）
//! - **ports**: 抽象化レイヤー（MonitorClient, Clock, IdGenerator）
//! - **wait**: 終端ステータスまでのポーリング（Waiter, WaitSpec, RetryPolicy）
//! - **impls**: 実装（HttpMonitorClient, InMemoryMonitorClient）
//! - **app**: 設定・構築・ワークフロー（WorkflowConfig, WorkflowBuilder, InferenceMonitorWorkflow）

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod wait;
