//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `JWT_SECRET` - HS256 secret used to verify session tokens
//! - `ADMIN_EMAIL` - email claim an admin token must carry
//!
//! ## Optional
//! - `PORT` - listen port (default: 8083)
//! - `DATABASE_URL` - PostgreSQL document store; in-memory store when unset
//! - `NATS_URL` - event bus for domain events
//! - `STRIPE_SECRET_KEY` - enables online checkout
//! - `STRIPE_WEBHOOK_SECRET` - enables the payment webhook
//! - `CURRENCY` - checkout currency (default: usd)
//! - `PUBLIC_URL` - storefront origin used when a request has no `Origin` header
//! - `WEBHOOK_TOLERANCE_SECS` - accepted webhook timestamp skew (default: 300)

use thiserror::Error;

const DEFAULT_PORT: u16 = 8083;
const DEFAULT_WEBHOOK_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(&'static str, String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub nats_url: Option<String>,
    pub auth: AuthConfig,
    pub payments: PaymentConfig,
    pub public_url: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub admin_email: String,
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub stripe_secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub currency: String,
    pub webhook_tolerance_secs: i64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::MissingEnvVar(key));

        let port = match get("PORT") {
            Some(p) => p.parse().map_err(|_| ConfigError::InvalidEnvVar("PORT", p))?,
            None => DEFAULT_PORT,
        };
        let webhook_tolerance_secs = match get("WEBHOOK_TOLERANCE_SECS") {
            Some(t) => t.parse().map_err(|_| ConfigError::InvalidEnvVar("WEBHOOK_TOLERANCE_SECS", t))?,
            None => DEFAULT_WEBHOOK_TOLERANCE_SECS,
        };

        Ok(Self {
            port,
            database_url: get("DATABASE_URL"),
            nats_url: get("NATS_URL"),
            auth: AuthConfig { jwt_secret: require("JWT_SECRET")?, admin_email: require("ADMIN_EMAIL")?.to_lowercase() },
            payments: PaymentConfig {
                stripe_secret_key: get("STRIPE_SECRET_KEY"),
                webhook_secret: get("STRIPE_WEBHOOK_SECRET"),
                currency: get("CURRENCY").unwrap_or_else(|| "usd".to_string()).to_lowercase(),
                webhook_tolerance_secs,
            },
            public_url: get("PUBLIC_URL").unwrap_or_else(|| format!("http://localhost:{port}")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "s3cr3t-value"), ("ADMIN_EMAIL", "Admin@Shop.io")])).unwrap();
        assert_eq!(cfg.port, 8083);
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.auth.admin_email, "admin@shop.io");
        assert_eq!(cfg.payments.currency, "usd");
        assert_eq!(cfg.payments.webhook_tolerance_secs, 300);
        assert_eq!(cfg.public_url, "http://localhost:8083");
    }

    #[test]
    fn test_missing_secret() {
        let err = AppConfig::from_lookup(lookup(&[("ADMIN_EMAIL", "a@b.c"), ("JWT_SECRET", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar("JWT_SECRET")));
    }

    #[test]
    fn test_invalid_port() {
        let err = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "x"), ("ADMIN_EMAIL", "a@b.c"), ("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar("PORT", _)));
    }
}
