//! Process configuration.
//!
//! Every knob is a flag with an environment fallback; the storage engine is
//! an explicit value enum handed to a constructor, never a conditionally
//! loaded module.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use reqwest::Url;

/// Which storage engine to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DatabaseBackend {
    /// Embedded SQLite file.
    Sqlite,
    /// Networked PostgreSQL.
    Postgres,
}

/// Full process configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "coursegate-backend", about = "Course marketplace backend")]
pub struct AppConfig {
    /// Storage engine to use.
    #[arg(long, env = "DATABASE_BACKEND", value_enum, default_value_t = DatabaseBackend::Sqlite)]
    pub database_backend: DatabaseBackend,

    /// PostgreSQL connection string (networked backend only).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost/coursegate"
    )]
    pub database_url: String,

    /// SQLite database file (embedded backend only).
    #[arg(long, env = "SQLITE_PATH", default_value = "coursegate.db")]
    pub sqlite_path: PathBuf,

    /// Socket address to bind the HTTP server to.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: SocketAddr,

    /// Base URL of the payment gateway API.
    #[arg(
        long,
        env = "PAYMENT_API_BASE",
        default_value = "https://api.stripe.com/"
    )]
    pub payment_api_base: Url,

    /// Secret API key for the payment gateway.
    #[arg(long, env = "PAYMENT_SECRET_KEY", hide_env_values = true)]
    pub payment_secret_key: String,

    /// Shared secret for webhook signature verification.
    #[arg(long, env = "PAYMENT_WEBHOOK_SECRET", hide_env_values = true)]
    pub payment_webhook_secret: String,

    /// Frontend base URL for checkout redirects.
    #[arg(
        long,
        env = "FRONTEND_BASE_URL",
        default_value = "http://localhost:5173"
    )]
    pub frontend_base_url: String,

    /// ISO currency code for checkout line items.
    #[arg(long, env = "CHECKOUT_CURRENCY", default_value = "usd")]
    pub currency: String,

    /// Per-request timeout for payment gateway calls, in seconds.
    #[arg(long, env = "PAYMENT_TIMEOUT_SECONDS", default_value_t = 15)]
    pub payment_timeout_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Vec<String> {
        let mut args = vec![
            "coursegate-backend".to_owned(),
            "--payment-secret-key".to_owned(),
            "sk_test_123".to_owned(),
            "--payment-webhook-secret".to_owned(),
            "whsec_test".to_owned(),
        ];
        args.extend(extra.iter().map(|s| (*s).to_owned()));
        args
    }

    #[test]
    fn defaults_select_the_embedded_backend() {
        let config = AppConfig::parse_from(args(&[]));
        assert_eq!(config.database_backend, DatabaseBackend::Sqlite);
        assert_eq!(config.currency, "usd");
    }

    #[test]
    fn backend_flag_selects_postgres() {
        let config = AppConfig::parse_from(args(&["--database-backend", "postgres"]));
        assert_eq!(config.database_backend, DatabaseBackend::Postgres);
    }
}
