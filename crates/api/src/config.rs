//! Application configuration loaded from environment variables.

/// Server configuration with sensible defaults for everything that has
/// one.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `DATABASE_URL` — PostgreSQL connection string (required to run)
/// - `SQUARE_ACCESS_TOKEN` — payment gateway credential (required to run)
/// - `ENVIRONMENT` — `"production"` targets the live payment gateway,
///   anything else the sandbox (default: `"sandbox"`)
/// - `LOB_API_KEY` — mail carrier credential (required to run)
/// - `RESEND_API_KEY` — email provider credential (required to run)
/// - `EMAIL_FROM` — sender identity for outbound email
/// - `ALERT_WEBHOOK_URL` — chat webhook for operator alerts (required to run)
/// - `SCHEDULER_PERIOD_SECS` — campaign tick period (default: `60`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub square_access_token: Option<String>,
    pub production: bool,
    pub lob_api_key: Option<String>,
    pub resend_api_key: Option<String>,
    pub email_from: String,
    pub alert_webhook_url: Option<String>,
    pub scheduler_period_secs: u64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults where one exists.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            database_url: std::env::var("DATABASE_URL").ok(),
            square_access_token: std::env::var("SQUARE_ACCESS_TOKEN").ok(),
            production: std::env::var("ENVIRONMENT")
                .map(|e| e.eq_ignore_ascii_case("production"))
                .unwrap_or(false),
            lob_api_key: std::env::var("LOB_API_KEY").ok(),
            resend_api_key: std::env::var("RESEND_API_KEY").ok(),
            email_from: std::env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "NoticeFlow <notices@sendmynotice.com>".to_string()),
            alert_webhook_url: std::env::var("ALERT_WEBHOOK_URL").ok(),
            scheduler_period_secs: std::env::var("SCHEDULER_PERIOD_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(60),
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
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            square_access_token: None,
            production: false,
            lob_api_key: None,
            resend_api_key: None,
            email_from: "NoticeFlow <notices@sendmynotice.com>".to_string(),
            alert_webhook_url: None,
            scheduler_period_secs: 60,
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
        assert!(!config.production);
        assert_eq!(config.scheduler_period_secs, 60);
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
}
