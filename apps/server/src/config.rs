//! Server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use tillbook_core::email::EmailCredentials;
use tillbook_core::DEFAULT_CURRENCY_SYMBOL;

/// Default EmailJS REST endpoint.
pub const DEFAULT_EMAILJS_ENDPOINT: &str = "https://api.emailjs.com/api/v1.0/email/send";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    pub bind_addr: SocketAddr,

    /// SQLite database file
    pub db_path: PathBuf,

    /// Base URL the frontend is served from; used in emailed invoice links
    pub public_url: String,

    /// JWT secret key for signing tokens
    pub jwt_secret: String,

    /// JWT access token lifetime in seconds
    pub jwt_access_lifetime_secs: i64,

    /// Symbol printed before amounts
    pub currency_symbol: String,

    /// Whether a checkout may take stock below zero
    pub allow_negative_stock: bool,

    /// Notification template credentials
    pub email: EmailCredentials,

    /// Email provider endpoint
    pub emailjs_endpoint: String,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = ServerConfig {
            bind_addr: env::var("TILLBOOK_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("TILLBOOK_BIND_ADDR".to_string()))?,

            db_path: match env::var("TILLBOOK_DB_PATH") {
                Ok(path) => PathBuf::from(path),
                Err(_) => default_db_path().ok_or_else(|| {
                    ConfigError::MissingRequired("TILLBOOK_DB_PATH (no platform data directory)".to_string())
                })?,
            },

            public_url: env::var("TILLBOOK_PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),

            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| {
                // In production, this MUST be set via environment variable
                "tillbook-dev-secret-change-in-production".to_string()
            }),

            jwt_access_lifetime_secs: env::var("JWT_ACCESS_LIFETIME_SECS")
                .unwrap_or_else(|_| "86400".to_string()) // 1 day
                .parse()
                .map_err(|_| ConfigError::InvalidValue("JWT_ACCESS_LIFETIME_SECS".to_string()))?,

            currency_symbol: env::var("TILLBOOK_CURRENCY_SYMBOL")
                .unwrap_or_else(|_| DEFAULT_CURRENCY_SYMBOL.to_string()),

            allow_negative_stock: parse_bool(
                "TILLBOOK_ALLOW_NEGATIVE_STOCK",
                env::var("TILLBOOK_ALLOW_NEGATIVE_STOCK").ok(),
                true,
            )?,

            email: EmailCredentials {
                service_id: env::var("EMAILJS_SERVICE_ID").unwrap_or_default(),
                template_id: env::var("EMAILJS_TEMPLATE_ID").unwrap_or_default(),
                public_key: env::var("EMAILJS_PUBLIC_KEY").unwrap_or_default(),
            },

            emailjs_endpoint: env::var("EMAILJS_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_EMAILJS_ENDPOINT.to_string()),
        };

        if config.jwt_access_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("JWT_ACCESS_LIFETIME_SECS".to_string()));
        }

        Ok(config)
    }

    /// Configuration for tests: in-memory-friendly defaults, no email.
    pub fn for_tests(db_path: impl Into<PathBuf>) -> Self {
        ServerConfig {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            db_path: db_path.into(),
            public_url: "http://localhost:8080".to_string(),
            jwt_secret: "test-secret".to_string(),
            jwt_access_lifetime_secs: 3600,
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_string(),
            allow_negative_stock: true,
            email: EmailCredentials::default(),
            emailjs_endpoint: DEFAULT_EMAILJS_ENDPOINT.to_string(),
        }
    }
}

fn parse_bool(name: &str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(v) => match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue(name.to_string())),
        },
    }
}

/// `<platform data dir>/tillbook.db`
fn default_db_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "tillbook", "tillbook")
        .map(|dirs| dirs.data_dir().join("tillbook.db"))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("X", None, true).unwrap());
        assert!(!parse_bool("X", Some("off".into()), true).unwrap());
        assert!(parse_bool("X", Some(" YES ".into()), false).unwrap());
        assert!(matches!(
            parse_bool("X", Some("maybe".into()), true),
            Err(ConfigError::InvalidValue(name)) if name == "X"
        ));
    }

    #[test]
    fn test_default_db_path_file_name() {
        if let Some(path) = default_db_path() {
            assert_eq!(path.file_name().and_then(|f| f.to_str()), Some("tillbook.db"));
        }
    }
}
