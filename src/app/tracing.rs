use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the global subscriber for the engine's own operational events.
///
/// `STRIDE_LOG_FORMAT=json` selects flattened JSON output; anything else uses
/// the compact human format. Filtering follows `RUST_LOG`, defaulting to
/// `default_level`.
pub fn init_tracing(default_level: Level) {
    let use_json = std::env::var("STRIDE_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_str().to_ascii_lowercase()));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if use_json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("tracing subscriber already installed: {e}");
    }
}
