//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPIFY_STORE` - Shopify store domain (e.g., your-store.myshopify.com)
//! - `SHOPIFY_ADMIN_ACCESS_TOKEN` - Admin API access token (HIGH PRIVILEGE)
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `SHOPIFY_API_VERSION` - API version (default: 2026-01)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 1.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_API_VERSION: &str = "2026-01";

/// Prefixes Shopify issues on Admin API tokens (custom app, collaborator, partner).
const TOKEN_PREFIXES: &[&str] = &["shpat_", "shpca_", "shppa_"];
const TOKEN_BODY_LEN: usize = 32;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Shopify Admin API configuration
    pub shopify: ShopifyAdminConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Shopify Admin API configuration.
///
/// Implements `Debug` manually to redact the HIGH PRIVILEGE token.
#[derive(Clone)]
pub struct ShopifyAdminConfig {
    /// Shopify store domain (e.g., your-store.myshopify.com)
    pub store: String,
    /// Shopify API version (e.g., 2026-01)
    pub api_version: String,
    /// Admin API access token (HIGH PRIVILEGE - full store access)
    pub access_token: SecretString,
}

impl std::fmt::Debug for ShopifyAdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyAdminConfig")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing, a value does
    /// not parse, or the access token does not look like one Shopify issued.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            host: parse_env("ADMIN_HOST", "127.0.0.1")?,
            port: parse_env("ADMIN_PORT", "3001")?,
            shopify: ShopifyAdminConfig::load(None, None)?,
            sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            sentry_environment: std::env::var("SENTRY_ENVIRONMENT").ok(),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "1.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl ShopifyAdminConfig {
    /// Load the Shopify section alone (used by the CLI).
    ///
    /// `store` and `access_token` override the environment when given.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the store or token are missing or invalid.
    pub fn load(store: Option<String>, access_token: Option<String>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let store = store.map_or_else(|| required("SHOPIFY_STORE"), Ok)?;
        validate_store_domain(&store)?;

        let token = access_token.map_or_else(|| required("SHOPIFY_ADMIN_ACCESS_TOKEN"), Ok)?;
        validate_access_token(&token)?;

        Ok(Self {
            store,
            api_version: std::env::var("SHOPIFY_API_VERSION")
                .unwrap_or_else(|_| DEFAULT_API_VERSION.to_string()),
            access_token: SecretString::from(token),
        })
    }

    /// The GraphQL Admin API endpoint for this store.
    #[must_use]
    pub fn graphql_endpoint(&self) -> String {
        format!(
            "https://{}/admin/api/{}/graphql.json",
            self.store, self.api_version
        )
    }
}

fn required(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Admin API calls must go to the permanent `*.myshopify.com` domain.
fn validate_store_domain(store: &str) -> Result<(), ConfigError> {
    let valid = store
        .strip_suffix(".myshopify.com")
        .is_some_and(|name| !name.is_empty() && !name.contains('/'));
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvVar(
            "SHOPIFY_STORE".to_string(),
            format!("expected <name>.myshopify.com, got '{store}'"),
        ))
    }
}

/// Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut counts: HashMap<char, u32> = HashMap::new();
    let mut total = 0_u32;
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
        total += 1;
    }

    counts
        .values()
        .map(|&n| {
            let p = f64::from(n) / f64::from(total);
            -p * p.log2()
        })
        .sum()
}

/// Reject anything that is not a Shopify-issued Admin API token.
fn validate_access_token(token: &str) -> Result<(), ConfigError> {
    let insecure = |reason: String| {
        ConfigError::InsecureSecret("SHOPIFY_ADMIN_ACCESS_TOKEN".to_string(), reason)
    };

    let body = TOKEN_PREFIXES
        .iter()
        .find_map(|prefix| token.strip_prefix(*prefix))
        .ok_or_else(|| insecure("expected a token starting with shpat_".to_string()))?;
    if body.len() < TOKEN_BODY_LEN {
        return Err(insecure(format!(
            "token body is {} chars, expected {TOKEN_BODY_LEN}",
            body.len()
        )));
    }

    let entropy = shannon_entropy(body);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(insecure(format!(
            "entropy too low ({entropy:.2} bits/char); looks like a placeholder"
        )));
    }
    Ok(())
}
