use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::configuration::Environment;

/// Initializes structured logging. Production deployments emit JSON lines;
/// development gets human-readable output. The log level is controlled via
/// the RUST_LOG environment variable and defaults to `info`.
pub fn init_telemetry(environment: &Environment) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match environment {
        Environment::Production => {
            let formatting_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .json();
            tracing_subscriber::registry()
                .with(env_filter)
                .with(formatting_layer)
                .init();
        }
        Environment::Development => {
            let formatting_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(formatting_layer)
                .init();
        }
    }
}
