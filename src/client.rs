use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::join_all;
use metrics::{histogram, increment_counter};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DataSourceError, Result};
use crate::frame::frame_from_points;
use crate::models::{MetricFrame, MetricPoint, QueryTarget, TimeRange};
use crate::query::{build_metrics_request, MetricsRequest};

/// Default request timeout (10 seconds)
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connect timeout (10 seconds)
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default health check timeout (5 seconds)
const DEFAULT_HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout configuration for the backend client.
#[derive(Clone, Debug)]
pub struct DataSourceConfig {
    /// Overall request timeout (default: 10s)
    pub request_timeout: Duration,
    /// Connection establishment timeout (default: 10s)
    pub connect_timeout: Duration,
    /// Health check request timeout (default: 5s)
    pub health_check_timeout: Duration,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            health_check_timeout: DEFAULT_HEALTH_CHECK_TIMEOUT,
        }
    }
}

impl DataSourceConfig {
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_health_check_timeout(mut self, timeout: Duration) -> Self {
        self.health_check_timeout = timeout;
        self
    }
}

/// Fetch seam between batch orchestration and the transport. The production
/// implementation is [`HttpFetcher`]; tests substitute scripted ones.
#[async_trait]
pub trait MetricsFetcher: Send + Sync {
    async fn fetch(&self, request: &MetricsRequest) -> Result<Vec<MetricPoint>>;
}

/// reqwest-backed fetcher: executes the request, checks the status, and
/// decodes the body into raw points.
#[derive(Clone)]
pub struct HttpFetcher {
    http: reqwest::Client,
    request_timeout: Duration,
}

impl HttpFetcher {
    pub fn new(config: &DataSourceConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self::with_client(http, config.request_timeout)
    }

    pub fn with_client(http: reqwest::Client, request_timeout: Duration) -> Self {
        Self {
            http,
            request_timeout,
        }
    }

    async fn run(&self, request: &MetricsRequest) -> Result<Vec<MetricPoint>> {
        debug!("Fetching {} {}", request.method, request.url);

        let response = self
            .http
            .request(request.method.clone(), &request.url)
            .timeout(self.request_timeout)
            .send()
            .await?;

        let body = read_success(response).await?;
        let points: Vec<MetricPoint> = serde_json::from_str(&body)?;
        Ok(points)
    }
}

#[async_trait]
impl MetricsFetcher for HttpFetcher {
    async fn fetch(&self, request: &MetricsRequest) -> Result<Vec<MetricPoint>> {
        increment_counter!("datasource_requests_total");
        let started = Instant::now();

        let result = self.run(request).await;

        histogram!(
            "datasource_request_duration_seconds",
            started.elapsed().as_secs_f64()
        );
        if result.is_err() {
            increment_counter!("datasource_request_failures_total");
        }
        result
    }
}

/// Returns the body of a successful response, or a `Backend` error carrying
/// the backend's own message for anything else.
async fn read_success(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(DataSourceError::Backend {
            status: status.as_u16(),
            message: backend_message(&body),
        });
    }
    Ok(response.text().await?)
}

/// Pulls the human-readable text out of a backend error body. The backend
/// wraps errors as `{"error": ...}` (sometimes `{"message": ...}`); anything
/// else is kept as a short excerpt.
fn backend_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<String>,
        message: Option<String>,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(text) = parsed.error.or(parsed.message) {
            return text;
        }
    }
    body.chars().take(200).collect()
}

/// Executes every target of a batch concurrently against the backend.
///
/// Targets are independent: one failing fetch or transform never affects the
/// others. The output carries one `Result` per target, order-aligned with
/// `targets`.
pub async fn execute_batch<F: MetricsFetcher>(
    targets: &[QueryTarget],
    range: Option<&TimeRange>,
    base_url: &str,
    fetcher: &F,
) -> Vec<Result<MetricFrame>> {
    let fetches = targets.iter().map(|target| async move {
        let request = build_metrics_request(
            target,
            base_url,
            range.map(|r| r.from),
            range.map(|r| r.to),
        );
        let points = fetcher.fetch(&request).await?;
        frame_from_points(&points, &target.metric, &target.ref_id)
    });

    let results = join_all(fetches).await;
    for (target, result) in targets.iter().zip(&results) {
        if let Err(e) = result {
            warn!("Target {} failed: {}", target.ref_id, e);
        }
    }
    results
}

/// Facade over the request builder, fetcher and transformer for one backend.
#[derive(Clone)]
pub struct DataSource {
    base_url: String,
    http: reqwest::Client,
    fetcher: HttpFetcher,
    config: DataSourceConfig,
}

impl DataSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_config(base_url, DataSourceConfig::default())
    }

    pub fn with_config(base_url: impl Into<String>, config: DataSourceConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            fetcher: HttpFetcher::with_client(http.clone(), config.request_timeout),
            http,
            config,
        }
    }

    /// Runs one batch of targets. Output order matches input order; each
    /// target carries its own result.
    pub async fn query(
        &self,
        targets: &[QueryTarget],
        range: Option<&TimeRange>,
    ) -> Vec<Result<MetricFrame>> {
        let batch_id = Uuid::new_v4();
        info!("Executing batch {} with {} targets", batch_id, targets.len());

        let results = execute_batch(targets, range, &self.base_url, &self.fetcher).await;

        let failures = results.iter().filter(|r| r.is_err()).count();
        if failures > 0 {
            warn!("Batch {} finished with {} failed targets", batch_id, failures);
        } else {
            debug!("Batch {} finished cleanly", batch_id);
        }
        results
    }

    /// Probes backend connectivity via its health endpoint.
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .http
            .get(&url)
            .timeout(self.config.health_check_timeout)
            .send()
            .await?;

        read_success(response).await?;
        Ok(())
    }

    /// Lists the service names the backend currently holds metrics for.
    pub async fn list_services(&self) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct ServiceRecord {
            service_name: String,
        }

        let records: Vec<ServiceRecord> = self.fetch_listing("services").await?;
        Ok(records.into_iter().map(|r| r.service_name).collect())
    }

    /// Lists the node identifiers the backend currently holds metrics for.
    pub async fn list_nodes(&self) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct NodeRecord {
            node_id: String,
        }

        let records: Vec<NodeRecord> = self.fetch_listing("nodes").await?;
        Ok(records.into_iter().map(|r| r.node_id).collect())
    }

    async fn fetch_listing<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        let url = format!("{}/{}", self.base_url, collection);
        let response = self.http.get(&url).send().await?;
        let body = read_success(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// The configured backend base URL, trailing slash removed.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
