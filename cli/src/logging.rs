use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable holding a tracing filter directive (e.g. `dedupcopy=trace`).
pub const LOG_ENV: &str = "DCP_LOG";

/// Install the stderr subscriber.
///
/// `DCP_LOG` wins when set; otherwise the level is `warn`, or `debug` with
/// `--verbose`.
pub fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter_layer =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    // A subscriber may already be installed (e.g. when embedded); keep it
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .without_time()
                .with_target(false),
        )
        .with(filter_layer)
        .try_init();
}
