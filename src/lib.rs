pub mod aliases;
pub mod api_football;
pub mod config;
pub mod engine;
pub mod error;
pub mod fixtures;
pub mod football_data;
pub mod h2h;
pub mod http_client;
pub mod ingest;
pub mod matchday;
pub mod model;
pub mod provider;
pub mod report;
pub mod resolve;
pub mod store;

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins; otherwise info everywhere and debug for this crate.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,card_bookings=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

/// `.env.local` first so it overrides `.env`.
pub fn load_env() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}
