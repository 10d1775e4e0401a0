use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metric names the backend reports for services.
pub const SERVICE_METRICS: &[&str] = &[
    "cpu_usage",
    "memory_usage",
    "network_in",
    "network_out",
    "disk_usage",
];

/// Metric names the backend reports for nodes.
pub const NODE_METRICS: &[&str] = &[
    "cpu_usage",
    "memory_usage",
    "disk_usage",
    "network_in",
    "network_out",
];

/// One requested metric series within a batch query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryTarget {
    /// Opaque correlation id, copied unchanged onto the resulting frame.
    #[serde(rename = "refId")]
    pub ref_id: String,
    #[serde(flatten)]
    pub entity: TargetEntity,
    /// Name of the numeric field to extract from each returned point.
    pub metric: String,
    /// Caps the number of returned points. Zero counts as "no explicit cap"
    /// and is never sent to the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// The entity a series is scoped to. The `metricType` tag decides which
/// identifier applies; a document carrying both identifiers still
/// deserializes, with the irrelevant one dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "metricType")]
pub enum TargetEntity {
    #[serde(rename = "service")]
    Service {
        #[serde(rename = "serviceName")]
        name: String,
    },
    #[serde(rename = "node")]
    Node {
        #[serde(rename = "nodeId")]
        id: String,
    },
}

impl TargetEntity {
    /// The service name or node identifier this entity selects.
    pub fn entity_id(&self) -> &str {
        match self {
            TargetEntity::Service { name } => name,
            TargetEntity::Node { id } => id,
        }
    }

    /// Path segment under which the backend scopes this entity's metrics.
    pub fn collection(&self) -> &'static str {
        match self {
            TargetEntity::Service { .. } => "services",
            TargetEntity::Node { .. } => "nodes",
        }
    }

    /// Metric names the backend is known to report for this entity type.
    /// Advisory only: requests are never validated against it.
    pub fn known_metrics(&self) -> &'static [&'static str] {
        match self {
            TargetEntity::Service { .. } => SERVICE_METRICS,
            TargetEntity::Node { .. } => NODE_METRICS,
        }
    }
}

/// Absolute query window. `from <= to` is the caller's responsibility.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// A single raw point as returned by the backend: a timestamp plus whatever
/// other fields the record carries (metric values, entity name, row id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricPoint {
    pub timestamp: String,
    #[serde(flatten)]
    pub fields: HashMap<String, serde_json::Value>,
}

impl MetricPoint {
    /// Numeric value of `metric` for this point. `None` when the field is
    /// absent, null, or not a number: a gap in the series, never zero.
    pub fn value(&self, metric: &str) -> Option<f64> {
        self.fields.get(metric).and_then(serde_json::Value::as_f64)
    }
}

/// Columnar result for one target: a time column in epoch milliseconds and
/// a value column, positionally aligned, preserving backend order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricFrame {
    /// Correlation id of the originating target.
    #[serde(rename = "refId")]
    pub ref_id: String,
    /// Name of the value column.
    pub metric: String,
    pub times: Vec<i64>,
    pub values: Vec<Option<f64>>,
}

impl MetricFrame {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}
