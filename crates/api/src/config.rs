//! Application configuration loaded from environment variables.

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `8080`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `PAYMENT_SERVICE_URL`: base URL of the payment service (default: `"http://localhost:8081"`)
/// - `DATABASE_URL`: PostgreSQL connection string; without it orders are kept in memory
/// - `CORS_ALLOWED_ORIGIN`: the shop frontend origin (default: `"http://localhost:5173"`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub payment_service_url: String,
    pub database_url: Option<String>,
    pub cors_allowed_origin: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            payment_service_url: lookup("PAYMENT_SERVICE_URL")
                .unwrap_or(defaults.payment_service_url),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            cors_allowed_origin: lookup("CORS_ALLOWED_ORIGIN")
                .unwrap_or(defaults.cors_allowed_origin),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            payment_service_url: "http://localhost:8081".to_string(),
            database_url: None,
            cors_allowed_origin: "http://localhost:5173".to_string(),
        }
    }
}
