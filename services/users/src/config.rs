//! Service configuration
//!
//! Built-in defaults overlaid with `USERS_*` environment variables, e.g.
//! `USERS_PORT=8080` or
//! `USERS_ALLOWED_ORIGINS=http://localhost:3000,http://localhost:5500`.

use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_ALLOWED_ORIGINS: [&str; 3] = [
    "http://localhost:3000",
    "http://127.0.0.1:5500",
    "http://localhost:5500",
];

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `development` exposes internal error messages in 500 responses
    pub environment: String,
    pub allowed_origins: Vec<String>,
    /// Requests allowed per client address within one window
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,
    pub body_limit_bytes: usize,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Environment::with_prefix("USERS"))
    }

    fn load(env: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 3000)?
            .set_default("environment", "production")?
            .set_default(
                "allowed_origins",
                DEFAULT_ALLOWED_ORIGINS
                    .iter()
                    .map(|o| o.to_string())
                    .collect::<Vec<_>>(),
            )?
            .set_default("rate_limit_max", 100)?
            .set_default("rate_limit_window_secs", 15 * 60)?
            .set_default("body_limit_bytes", 10 * 1024 * 1024)?
            .add_source(
                env.try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("allowed_origins"),
            )
            .build()?
            .try_deserialize()
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}
