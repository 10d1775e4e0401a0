use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;

use crate::models::QueryTarget;

/// A fully-qualified request against the metrics backend. Built fresh for
/// each target and consumed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsRequest {
    pub url: String,
    pub method: Method,
}

/// Renders the backend URL for one target.
///
/// The path is `{base}/services/{name}/metrics` or `{base}/nodes/{id}/metrics`
/// depending on the target's metric type, with the entity identifier
/// percent-encoded. `start_time` and `end_time` appear only for the bounds
/// actually given, `limit` only when greater than zero, and a request with
/// no parameters carries no `?`.
pub fn build_metrics_request(
    target: &QueryTarget,
    base_url: &str,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> MetricsRequest {
    let base = base_url.trim_end_matches('/');
    let mut url = format!(
        "{}/{}/{}/metrics",
        base,
        target.entity.collection(),
        urlencoding::encode(target.entity.entity_id()),
    );

    let mut params: Vec<(&str, String)> = Vec::new();
    if let Some(from) = from {
        params.push(("start_time", format_timestamp(from)));
    }
    if let Some(to) = to {
        params.push(("end_time", format_timestamp(to)));
    }
    match target.limit {
        Some(limit) if limit > 0 => params.push(("limit", limit.to_string())),
        _ => {}
    }

    for (i, (name, value)) in params.iter().enumerate() {
        url.push(if i == 0 { '?' } else { '&' });
        url.push_str(name);
        url.push('=');
        url.push_str(&urlencoding::encode(value));
    }

    MetricsRequest {
        url,
        method: Method::GET,
    }
}

fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
