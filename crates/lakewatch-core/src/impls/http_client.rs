//! HttpMonitorClient - REST API 経由で品質モニタを操作する本番用クライアント
//!
//! エンドポイントは `/api/2.1/unity-catalog/tables/{table}/monitor` 配下。
//! 認証は Bearer トークン。テーブル名は 1 つのパスセグメントとしてエンコードします。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::{
    ClientError, CreateMonitor, MonitorInfo, MonitorRefreshInfo, RefreshId, RefreshList,
    TableName, UpdateMonitor,
};
use crate::ports::MonitorClient;

const API_PATH: &[&str] = &["api", "2.1", "unity-catalog", "tables"];
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct HttpMonitorClient {
    http: reqwest::Client,
    base: Url,
    token: String,
}

impl HttpMonitorClient {
    /// `host` may be given with or without scheme; `https://` is assumed.
    pub fn new(host: &str, token: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Transport(format!("building HTTP client: {e}")))?;
        Self::with_http_client(http, host, token)
    }

    pub fn with_http_client(
        http: reqwest::Client,
        host: &str,
        token: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let host = host.trim().trim_end_matches('/');
        let raw = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{host}")
        };
        let base = Url::parse(&raw).map_err(|e| ClientError::InvalidHost(format!("{raw}: {e}")))?;
        if base.cannot_be_a_base() || base.query().is_some() || base.fragment().is_some() {
            return Err(ClientError::InvalidHost(raw));
        }
        Ok(Self {
            http,
            base,
            token: token.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    /// `{base}/api/2.1/unity-catalog/tables/{table}/monitor/{tail..}`, every part escaped.
    fn endpoint(&self, table: &TableName, tail: &[&str]) -> Url {
        let mut url = self.base.clone();
        // Checked in `with_http_client`: the base can carry path segments.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(API_PATH)
                .push(&table.to_string())
                .push("monitor")
                .extend(tail);
        }
        url
    }

    fn monitor_url(&self, table: &TableName) -> Url {
        self.endpoint(table, &[])
    }

    fn refreshes_url(&self, table: &TableName) -> Url {
        self.endpoint(table, &["refreshes"])
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(method = method.as_str(), url = url.as_str(), "monitor api request");
        self.http.request(method, url).bearer_auth(&self.token)
    }

    async fn send(&self, req: RequestBuilder, what: &str) -> Result<reqwest::Response, ClientError> {
        let resp = req
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        what: &str,
    ) -> Result<T, ClientError> {
        self.send(req, what)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn send_body<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: &B,
        what: &str,
    ) -> Result<T, ClientError> {
        self.send_json(self.request(method, url).json(body), what).await
    }
}

#[async_trait]
impl MonitorClient for HttpMonitorClient {
    async fn create_monitor(
        &self,
        table: &TableName,
        request: &CreateMonitor,
    ) -> Result<MonitorInfo, ClientError> {
        let what = format!("table {table}");
        self.send_body(Method::POST, self.monitor_url(table), request, &what)
            .await
    }

    async fn update_monitor(
        &self,
        table: &TableName,
        request: &UpdateMonitor,
    ) -> Result<MonitorInfo, ClientError> {
        let what = format!("monitor on {table}");
        self.send_body(Method::PUT, self.monitor_url(table), request, &what)
            .await
    }

    async fn get_monitor(&self, table: &TableName) -> Result<MonitorInfo, ClientError> {
        let what = format!("monitor on {table}");
        self.send_json(self.request(Method::GET, self.monitor_url(table)), &what)
            .await
    }

    async fn delete_monitor(&self, table: &TableName) -> Result<(), ClientError> {
        let what = format!("monitor on {table}");
        self.send(self.request(Method::DELETE, self.monitor_url(table)), &what)
            .await?;
        Ok(())
    }

    async fn run_refresh(&self, table: &TableName) -> Result<MonitorRefreshInfo, ClientError> {
        let what = format!("monitor on {table}");
        self.send_json(self.request(Method::POST, self.refreshes_url(table)), &what)
            .await
    }

    async fn list_refreshes(&self, table: &TableName) -> Result<RefreshList, ClientError> {
        let what = format!("monitor on {table}");
        self.send_json(self.request(Method::GET, self.refreshes_url(table)), &what)
            .await
    }

    async fn get_refresh(
        &self,
        table: &TableName,
        refresh_id: RefreshId,
    ) -> Result<MonitorRefreshInfo, ClientError> {
        let id = refresh_id.to_string();
        let url = self.endpoint(table, &["refreshes", &id]);
        let what = format!("refresh {refresh_id} of {table}");
        self.send_json(self.request(Method::GET, url), &what).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InferenceLog, MonitorStatus, ProblemType, RefreshState};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MONITOR_PATH: &str = "/api/2.1/unity-catalog/tables/main.retail.preds/monitor";

    fn table() -> TableName {
        "main.retail.preds".parse().unwrap()
    }

    fn client(server: &MockServer) -> HttpMonitorClient {
        HttpMonitorClient::new(&server.uri(), "t0k3n").unwrap()
    }

    #[test]
    fn host_without_scheme_defaults_to_https() {
        let c = HttpMonitorClient::new("adb-123.azuredatabricks.net/", "x").unwrap();
        assert_eq!(c.base_url(), "https://adb-123.azuredatabricks.net");
        assert_eq!(
            c.monitor_url(&table()).as_str(),
            "https://adb-123.azuredatabricks.net/api/2.1/unity-catalog/tables/main.retail.preds/monitor"
        );
    }

    #[test]
    fn table_name_is_one_escaped_path_segment() {
        let c = HttpMonitorClient::new("https://h", "x").unwrap();
        let odd: TableName = "main.retail.a?b#c/d".parse().unwrap();
        let url = c.endpoint(&odd, &["refreshes", "7"]);
        assert_eq!(
            url.as_str(),
            "https://h/api/2.1/unity-catalog/tables/main.retail.a%3Fb%23c%2Fd/monitor/refreshes/7"
        );
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }

    #[test]
    fn rejects_unusable_hosts() {
        assert!(matches!(
            HttpMonitorClient::new("https://h/?x=1", "x"),
            Err(ClientError::InvalidHost(_))
        ));
        assert!(matches!(
            HttpMonitorClient::new("https://", "x"),
            Err(ClientError::InvalidHost(_))
        ));
    }

    #[tokio::test]
    async fn reserved_characters_in_table_reach_the_monitor_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(
                "/api/2.1/unity-catalog/tables/main.retail.a%3Fb%23c/monitor",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "table_name": "main.retail.a?b#c",
                "status": "MONITOR_STATUS_ACTIVE"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let odd: TableName = "main.retail.a?b#c".parse().unwrap();
        let info = client(&server).get_monitor(&odd).await.unwrap();
        assert_eq!(info.table_name, odd);
    }

    #[tokio::test]
    async fn get_monitor_sends_bearer_token_and_decodes_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(MONITOR_PATH))
            .and(header("authorization", "Bearer t0k3n"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "table_name": "main.retail.preds",
                "status": "MONITOR_STATUS_ACTIVE",
                "drift_metrics_table_name": "main.retail.preds_drift_metrics"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let info = client(&server).get_monitor(&table()).await.unwrap();
        assert_eq!(info.status, MonitorStatus::Active);
        assert_eq!(
            info.drift_metrics_table_name.as_deref(),
            Some("main.retail.preds_drift_metrics")
        );
    }

    #[tokio::test]
    async fn create_monitor_posts_inference_log() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MONITOR_PATH))
            .and(body_partial_json(json!({
                "output_schema_name": "main.retail",
                "inference_log": { "problem_type": "PROBLEM_TYPE_REGRESSION", "granularities": ["1 day"] }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "table_name": "main.retail.preds",
                "status": "MONITOR_STATUS_PENDING"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = CreateMonitor {
            assets_dir: "/Workspace/lakewatch".into(),
            output_schema_name: "main.retail".into(),
            inference_log: InferenceLog {
                problem_type: ProblemType::Regression,
                prediction_col: "Prediction".into(),
                timestamp_col: "TransactionDate".into(),
                granularities: vec!["1 day".parse().unwrap()],
                model_id_col: "ModelVersion".into(),
                label_col: None,
                prediction_proba_col: None,
            },
            baseline_table_name: None,
            custom_metrics: Vec::new(),
        };
        let info = client(&server).create_monitor(&table(), &request).await.unwrap();
        assert_eq!(info.status, MonitorStatus::Pending);
    }

    #[tokio::test]
    async fn refresh_endpoints() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{MONITOR_PATH}/refreshes")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "refresh_id": 12, "state": "PENDING", "trigger": "MANUAL" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{MONITOR_PATH}/refreshes")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "refreshes": [{ "refresh_id": 12, "state": "RUNNING" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{MONITOR_PATH}/refreshes/12")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "refresh_id": 12, "state": "SUCCESS", "end_time_ms": 5 })),
            )
            .mount(&server)
            .await;

        let c = client(&server);
        let started = c.run_refresh(&table()).await.unwrap();
        assert_eq!(started.refresh_id, RefreshId(12));
        assert_eq!(started.state, RefreshState::Pending);

        let list = c.list_refreshes(&table()).await.unwrap();
        assert_eq!(list.refreshes[0].state, RefreshState::Running);

        let done = c.get_refresh(&table(), RefreshId(12)).await.unwrap();
        assert_eq!(done.state, RefreshState::Success);
        assert_eq!(done.end_time_ms, Some(5));
    }

    #[tokio::test]
    async fn delete_accepts_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(MONITOR_PATH))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).delete_monitor(&table()).await.unwrap();
    }

    #[tokio::test]
    async fn maps_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(MONITOR_PATH))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("{MONITOR_PATH}/refreshes")))
            .respond_with(ResponseTemplate::new(503).set_body_string("try later"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{MONITOR_PATH}/refreshes")))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let c = client(&server);
        assert!(matches!(
            c.get_monitor(&table()).await,
            Err(ClientError::NotFound(what)) if what == "monitor on main.retail.preds"
        ));

        let err = c.run_refresh(&table()).await.unwrap_err();
        assert_eq!(
            err,
            ClientError::Api {
                status: 503,
                body: "try later".into()
            }
        );
        assert!(err.is_transient());

        assert!(matches!(
            c.list_refreshes(&table()).await,
            Err(ClientError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_host_is_transient() {
        let c = HttpMonitorClient::new("http://127.0.0.1:9", "x").unwrap();
        let err = c.get_monitor(&table()).await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        assert!(err.is_transient());
    }
}
