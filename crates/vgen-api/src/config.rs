//! API configuration.

use std::path::PathBuf;
use std::time::Duration;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
    /// Per-IP limit for `/api` routes
    pub rate_limit_per_minute: u32,
    /// Per-IP limit for `/demo` routes
    pub demo_rate_limit_per_minute: u32,
    /// Request timeout
    pub request_timeout: Duration,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Static UI directory served at `/`
    pub static_dir: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: Vec::new(),
            rate_limit_per_minute: 60,
            demo_rate_limit_per_minute: 10,
            request_timeout: Duration::from_secs(30),
            max_body_size: 10 * 1024 * 1024,
            environment: "development".to_string(),
            static_dir: PathBuf::from("public"),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: env_parse("PORT")
                .or_else(|| env_parse("API_PORT"))
                .unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGIN")
                .map(|s| parse_origins(&s))
                .unwrap_or_default(),
            rate_limit_per_minute: env_parse("RATE_LIMIT_PER_MINUTE")
                .unwrap_or(defaults.rate_limit_per_minute),
            demo_rate_limit_per_minute: env_parse("DEMO_RATE_LIMIT_PER_MINUTE")
                .unwrap_or(defaults.demo_rate_limit_per_minute),
            request_timeout: env_parse("REQUEST_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            max_body_size: env_parse("MAX_BODY_SIZE").unwrap_or(defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            static_dir: std::env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_origins_drops_blanks() {
        assert_eq!(
            parse_origins(" https://a.example, ,https://b.example "),
            vec!["https://a.example", "https://b.example"]
        );
        assert!(parse_origins("").is_empty());
    }

    #[test]
    #[serial]
    fn test_port_prefers_port_over_api_port() {
        std::env::set_var("PORT", "9001");
        std::env::set_var("API_PORT", "9002");
        assert_eq!(ApiConfig::from_env().port, 9001);

        std::env::remove_var("PORT");
        assert_eq!(ApiConfig::from_env().port, 9002);

        std::env::remove_var("API_PORT");
        assert_eq!(ApiConfig::from_env().port, 8000);
    }

    #[test]
    #[serial]
    fn test_defaults() {
        for key in ["RATE_LIMIT_PER_MINUTE", "DEMO_RATE_LIMIT_PER_MINUTE", "CORS_ORIGIN", "ENVIRONMENT"] {
            std::env::remove_var(key);
        }
        let config = ApiConfig::from_env();
        assert_eq!(config.rate_limit_per_minute, 60);
        assert_eq!(config.demo_rate_limit_per_minute, 10);
        assert!(config.cors_origins.is_empty());
        assert!(!config.is_production());
    }
}
