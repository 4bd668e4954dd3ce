use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_filter(base_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(base_level))
        .unwrap_or_else(|e| panic!("Invalid log filter: {}", e))
}

/// Installs the global subscriber for binaries.
///
/// `RUST_LOG` wins over `base_level` when set. Warnings and errors also go to
/// stderr. Panics if a subscriber is already installed.
pub fn setup_logging(base_level: &str) {
    let console_writer = std::io::stdout.and(std::io::stderr.with_max_level(Level::WARN));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true)
        .with_writer(console_writer);

    tracing_subscriber::registry()
        .with(env_filter(base_level))
        .with(console_layer)
        .try_init()
        .unwrap_or_else(|e| panic!("Logger initialization failed: {}", e));
}

/// Test-friendly variant: output is captured by the test harness and repeated
/// calls from different tests are no-ops.
pub fn try_setup_test_logging(base_level: &str) {
    let test_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .with_test_writer();

    let _ = tracing_subscriber::registry()
        .with(env_filter(base_level))
        .with(test_layer)
        .try_init();
}
