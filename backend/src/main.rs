//! Backend entry-point: configuration, tracing, storage bootstrap, serve.

use clap::Parser;
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

use backend::server::{self, AppConfig};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let config = AppConfig::parse();
    server::run(config).await
}
