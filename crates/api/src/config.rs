//! Application configuration loaded from environment variables.

use chrono::Duration;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `HOLD_MINUTES` — seat hold window (default: `10`)
/// - `SWEEP_SECONDS` — sweep interval (default: `10`)
/// - `GATEWAY_SECRET` — shared secret for callback signatures
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub hold_minutes: i64,
    pub sweep_seconds: u64,
    pub gateway_secret: String,
    pub log_level: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            hold_minutes: std::env::var("HOLD_MINUTES")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10),
            sweep_seconds: std::env::var("SWEEP_SECONDS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10),
            gateway_secret: std::env::var("GATEWAY_SECRET")
                .unwrap_or_else(|_| "dev-gateway-secret".to_string()),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the hold window as a chrono duration.
    pub fn hold_duration(&self) -> Duration {
        Duration::minutes(self.hold_minutes)
    }

    /// Returns the sweep interval as a std duration.
    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            hold_minutes: 10,
            sweep_seconds: 10,
            gateway_secret: "dev-gateway-secret".to_string(),
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.hold_minutes, 10);
        assert_eq!(config.sweep_seconds, 10);
    }

    #[test]
    fn addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn durations() {
        let config = Config::default();
        assert_eq!(config.hold_duration(), Duration::minutes(10));
        assert_eq!(config.sweep_interval(), std::time::Duration::from_secs(10));
    }
}
