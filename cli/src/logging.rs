//! Stdout logging. Set `DEBUG_LOGGING=1` to enable debug output for the
//! bossfall crates; `RUST_LOG` overrides both defaults.

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub fn init() {
    let debug_logging = std::env::var("DEBUG_LOGGING").is_ok();

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    let filter_directive = if debug_logging {
        "info,bossfall_core=debug,bossfall_cli=debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directive));

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(filter)
        .init();

    tracing::info!(debug_logging, "Bossfall logging initialized");
}
