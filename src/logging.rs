use crate::config::LoggingConfig;
use crate::error::{ListingError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// RUST_LOG wins over the configured directive
pub fn build_filter(config: &LoggingConfig, verbose: bool) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let directive = if verbose {
        format!("{},travel_listings=debug", config.filter)
    } else {
        config.filter.clone()
    };
    EnvFilter::try_new(&directive).map_err(|e| ListingError::Config {
        message: format!("invalid log filter {:?}: {}", directive, e),
    })
}

pub fn init_logger(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let filter = build_filter(config, verbose)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .json(),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .compact(),
            )
            .try_init()
    };

    installed.map_err(|e| ListingError::Config {
        message: format!("failed to install logger: {}", e),
    })
}
