use std::env;
use std::process;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use openhorizon_datasource::{
    logging, DataSource, QueryTarget, TargetEntity, TimeRange,
};

fn parse_bound(name: &str) -> Option<DateTime<Utc>> {
    match env::var(name) {
        Ok(raw) => match raw.parse::<DateTime<Utc>>() {
            Ok(instant) => Some(instant),
            Err(e) => {
                eprintln!("Invalid {}: {}", name, e);
                process::exit(1);
            }
        },
        Err(_) => None,
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    logging::init_logging();

    let base_url =
        env::var("OPENHORIZON_URL").unwrap_or_else(|_| "http://localhost:5000".to_string());

    // Resolve the target from the command line
    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() != 3 {
        eprintln!("Usage: openhorizon-datasource <service|node> <name> <metric>");
        process::exit(1);
    }

    let entity = match args[0].as_str() {
        "service" => TargetEntity::Service {
            name: args[1].clone(),
        },
        "node" => TargetEntity::Node {
            id: args[1].clone(),
        },
        _ => {
            eprintln!("Invalid metric type. Must be 'service' or 'node'");
            process::exit(1);
        }
    };

    let limit = match env::var("LIMIT") {
        Ok(raw) => match raw.parse::<u32>() {
            Ok(n) => Some(n),
            Err(e) => {
                eprintln!("Invalid LIMIT: {}", e);
                process::exit(1);
            }
        },
        Err(_) => None,
    };

    let range = match (parse_bound("START_TIME"), parse_bound("END_TIME")) {
        (Some(from), Some(to)) => Some(TimeRange { from, to }),
        (None, None) => None,
        _ => {
            eprintln!("START_TIME and END_TIME must be set together");
            process::exit(1);
        }
    };

    let target = QueryTarget {
        ref_id: "A".to_string(),
        entity,
        metric: args[2].clone(),
        limit,
    };

    if !target
        .entity
        .known_metrics()
        .contains(&target.metric.as_str())
    {
        warn!(
            "Metric {} is not in the known {} catalog",
            target.metric, args[0]
        );
    }

    // Probe the backend before querying
    let source = DataSource::new(base_url);
    info!("Checking backend at {}", source.base_url());
    if let Err(e) = source.health_check().await {
        eprintln!("Backend health check failed: {}", e);
        process::exit(1);
    }

    // Run the single-target batch and print each frame as JSON
    let results = source.query(&[target], range.as_ref()).await;
    for result in results {
        match result {
            Ok(frame) => match serde_json::to_string_pretty(&frame) {
                Ok(rendered) => println!("{}", rendered),
                Err(e) => {
                    eprintln!("Failed to render frame: {}", e);
                    process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("Query failed: {}", e);
                process::exit(1);
            }
        }
    }
}
