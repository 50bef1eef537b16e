use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialise structured logging
///
/// JSON lines on stdout, filtered by `RUST_LOG` (default `info`). Records
/// from the `log` facade, such as the request logger's, are forwarded too.
pub fn init_telemetry() {
    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .json();

    // try_init: a second call (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(formatting_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_initialisation_is_harmless() {
        init_telemetry();
        init_telemetry();
        tracing::info!("telemetry initialised");
    }

    #[test]
    fn test_default_filter_parses() {
        assert_eq!(EnvFilter::new(DEFAULT_FILTER).to_string(), DEFAULT_FILTER);
    }
}
