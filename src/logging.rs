use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Sets up the tracing subscriber for the process.
///
/// `RUST_LOG` controls filtering (default `info`). `LOG_FORMAT=json`
/// switches the output to newline-delimited JSON for log shippers.
pub fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    if matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json")) {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init()
            .expect("Failed to initialize logger");
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_ansi(true)
                    .compact(),
            )
            .try_init()
            .expect("Failed to initialize logger");
    }
}
