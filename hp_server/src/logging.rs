//! Structured logging configuration.
//!
//! Log levels come from `RUST_LOG`; without it the server logs at `info`.
//! The room engine logs through the `log` facade. Installing the subscriber
//! also installs a `tracing-log` bridge, so those records land in the same
//! output with their `house_poker::room` / `house_poker::game` targets.
//!
//! ```text
//! RUST_LOG=info,house_poker::game=debug   # every action and deal
//! RUST_LOG=warn,house_poker::room=info    # room lifecycle only
//! ```

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Rooms at `info`, per-action detail only on request, quiet transport.
const DEFAULT_FILTER: &str = "info,house_poker::game=info,hyper=warn,tower_http=warn";

/// Install the global tracing subscriber.
///
/// # Example
///
/// ```no_run
/// use hp_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!(filter = %filter_description(), "Structured logging initialized");
}

fn filter_description() -> String {
    std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| DEFAULT_FILTER.to_string())
}
