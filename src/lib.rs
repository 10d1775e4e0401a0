//! Query adapter for an Open Horizon metrics backend: builds the backend's
//! HTTP requests from dashboard query targets and converts the returned
//! time-series JSON into columnar frames.

pub mod client;
pub mod error;
pub mod frame;
pub mod logging;
pub mod models;
pub mod query;

pub use client::{execute_batch, DataSource, DataSourceConfig, HttpFetcher, MetricsFetcher};
pub use error::{DataSourceError, Result};
pub use frame::frame_from_points;
pub use models::{
    MetricFrame, MetricPoint, QueryTarget, TargetEntity, TimeRange, NODE_METRICS, SERVICE_METRICS,
};
pub use query::{build_metrics_request, MetricsRequest};
