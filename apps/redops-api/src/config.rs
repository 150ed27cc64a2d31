use std::time::Duration;

use crate::gateway::session::DEFAULT_OUTBOUND_CAPACITY;

/// API configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string. When unset the API runs on the
    /// in-memory document store (nothing survives a restart).
    pub database_url: Option<String>,
    /// HMAC secret for signing session tokens.
    pub jwt_secret: String,
    /// Session token lifetime.
    pub token_ttl: Duration,
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Browser origin allowed by CORS (the dashboard dev server by default).
    pub cors_origin: String,
    /// Outbound queue slots per live connection.
    pub ws_buffer_capacity: usize,
    /// Upper bound for a single WebSocket write.
    pub ws_write_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Panics with a descriptive message if a required variable is missing.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            jwt_secret: required_var("JWT_SECRET"),
            token_ttl: Duration::from_secs(parsed_var("TOKEN_TTL_HOURS", 24u64) * 3600),
            port: parsed_var("PORT", 8080),
            cors_origin: std::env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            ws_buffer_capacity: parsed_var("WS_BUFFER_CAPACITY", DEFAULT_OUTBOUND_CAPACITY),
            ws_write_timeout: Duration::from_secs(parsed_var("WS_WRITE_TIMEOUT_SECS", 10)),
        }
    }
}

fn required_var(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} env var is required"))
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
