use tracing_subscriber::{
    fmt,
    EnvFilter,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Sets up the tracing subscriber for services embedding the collector.
///
/// Honors `RUST_LOG` when set; defaults to info-level output for this
/// crate otherwise.
pub fn init_logger() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("perf_metrics_query=info"));

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_thread_names(true)
        .with_level(true)
        .with_ansi(true)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .expect("Failed to initialize logger");
}

#[cfg(test)]
mod tests {
    use super::*;

    // Keep this the only test that installs a global subscriber.
    #[test]
    fn installs_the_subscriber() {
        init_logger();
        tracing::info!("logger initialized");
    }
}
