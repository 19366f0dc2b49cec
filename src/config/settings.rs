//! Application settings and configuration
//!
//! This module provides configuration management for the application,
//! loading settings from environment variables with sensible defaults.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;

use crate::credentials::DEFAULT_REFRESH_THRESHOLD_SECS;
use crate::schema::{ConsistencyLevel, WriteOptions};

/// Shortest session STS allows
const MIN_ROLE_SESSION_SECS: i32 = 900;
/// Longest session STS allows
const MAX_ROLE_SESSION_SECS: i32 = 43_200;

/// Application environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    #[value(alias = "dev")]
    Development,
    #[value(alias = "stage")]
    Staging,
    #[value(alias = "prod")]
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => anyhow::bail!("Invalid environment: {}. Expected: development, staging, or production", s),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    // App settings
    pub app_name: String,
    pub app_version: String,
    pub environment: Environment,
    pub log_level: String,

    // AWS settings
    pub aws_region: String,
    #[serde(skip_serializing)]
    pub aws_access_key_id: Option<String>,
    #[serde(skip_serializing)]
    pub aws_secret_access_key: Option<String>,
    #[serde(skip_serializing)]
    pub aws_session_token: Option<String>,

    // Role chain
    pub control_role_arn: Option<String>,
    pub control_role_session_name: String,
    pub linked_role_arn: Option<String>,
    pub linked_role_session_name: String,
    pub role_external_id: Option<String>,
    pub role_session_duration_seconds: i32,
    pub credential_refresh_threshold_seconds: i64,

    // Store settings
    pub contact_points: Vec<String>,
    pub keyspace: String,
    pub write_consistency: ConsistencyLevel,
    pub write_ttl_seconds: Option<u32>,
    pub statement_cache_capacity: u64,
}

impl Settings {
    /// Load settings from environment variables with defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignored in production typically)
        dotenvy::dotenv().ok();

        let aws_region = env_or_default("AWS_REGION", "us-east-1");

        let settings = Self {
            // App settings
            app_name: env_or_default("APP_NAME", "keyspaces-writer"),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: env_or_default("ENVIRONMENT", "development")
                .parse()
                .unwrap_or_default(),
            log_level: env_or_default("LOG_LEVEL", "info"),

            // AWS settings
            aws_access_key_id: env::var("AWS_ACCESS_KEY_ID").ok(),
            aws_secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
            aws_session_token: env::var("AWS_SESSION_TOKEN").ok(),

            // Role chain
            control_role_arn: env_non_empty("CONTROL_ROLE_ARN"),
            control_role_session_name: env_or_default(
                "CONTROL_ROLE_SESSION_NAME",
                "keyspaces-writer-control",
            ),
            linked_role_arn: env_non_empty("LINKED_ROLE_ARN"),
            linked_role_session_name: env_or_default(
                "LINKED_ROLE_SESSION_NAME",
                "keyspaces-writer-linked",
            ),
            role_external_id: env_non_empty("ROLE_EXTERNAL_ID"),
            role_session_duration_seconds: env_or_default("ROLE_SESSION_DURATION_SECONDS", "900")
                .parse::<i32>()
                .context("Invalid ROLE_SESSION_DURATION_SECONDS value")?,
            credential_refresh_threshold_seconds: env_or_default(
                "CREDENTIAL_REFRESH_THRESHOLD_SECONDS",
                &DEFAULT_REFRESH_THRESHOLD_SECS.to_string(),
            )
            .parse::<i64>()
            .context("Invalid CREDENTIAL_REFRESH_THRESHOLD_SECONDS value")?,

            // Store settings
            contact_points: env_non_empty("CASSANDRA_CONTACT_POINTS")
                .map(|points| parse_list(&points))
                .unwrap_or_else(|| vec![default_contact_point(&aws_region)]),
            keyspace: env_or_default("CASSANDRA_KEYSPACE", "app"),
            write_consistency: env_or_default("WRITE_CONSISTENCY", "LOCAL_QUORUM")
                .parse::<ConsistencyLevel>()
                .context("Invalid WRITE_CONSISTENCY value")?,
            write_ttl_seconds: env_non_empty("WRITE_TTL_SECONDS")
                .map(|ttl| ttl.parse::<u32>())
                .transpose()
                .context("Invalid WRITE_TTL_SECONDS value")?,
            statement_cache_capacity: env_or_default("STATEMENT_CACHE_CAPACITY", "64")
                .parse::<u64>()
                .context("Invalid STATEMENT_CACHE_CAPACITY value")?,

            aws_region,
        };

        // Validate settings
        settings.validate()?;

        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if self.aws_region.trim().is_empty() {
            anyhow::bail!("AWS region cannot be empty");
        }

        if !(MIN_ROLE_SESSION_SECS..=MAX_ROLE_SESSION_SECS)
            .contains(&self.role_session_duration_seconds)
        {
            anyhow::bail!(
                "Role session duration must be between {} and {} seconds",
                MIN_ROLE_SESSION_SECS,
                MAX_ROLE_SESSION_SECS
            );
        }

        if self.credential_refresh_threshold_seconds < 0 {
            anyhow::bail!("Credential refresh threshold cannot be negative");
        }

        // A threshold at or past the session length would refresh on every access
        if self.has_role_chain()
            && self.credential_refresh_threshold_seconds
                >= i64::from(self.role_session_duration_seconds)
        {
            anyhow::bail!("Credential refresh threshold must be shorter than the role session duration");
        }

        if self.aws_access_key_id.is_some() != self.aws_secret_access_key.is_some() {
            anyhow::bail!("AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set together");
        }

        if self.contact_points.is_empty() {
            anyhow::bail!("At least one contact point is required");
        }

        if self.keyspace.trim().is_empty() {
            anyhow::bail!("Keyspace cannot be empty");
        }

        if self.statement_cache_capacity == 0 {
            anyhow::bail!("Statement cache capacity must be > 0");
        }

        if self.is_production() && !self.has_role_chain() {
            tracing::warn!("Running in production with base credentials and no role chain");
        }

        Ok(())
    }

    /// Whether any assume-role hop is configured
    pub fn has_role_chain(&self) -> bool {
        self.control_role_arn.is_some() || self.linked_role_arn.is_some()
    }

    /// Default write options for batches
    pub fn write_options(&self) -> WriteOptions {
        let options = WriteOptions::new().with_consistency(self.write_consistency);
        match self.write_ttl_seconds {
            Some(ttl) => options.with_ttl(ttl),
            None => options,
        }
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "keyspaces-writer".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: Environment::Development,
            log_level: "info".to_string(),
            aws_region: "us-east-1".to_string(),
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_session_token: None,
            control_role_arn: None,
            control_role_session_name: "keyspaces-writer-control".to_string(),
            linked_role_arn: None,
            linked_role_session_name: "keyspaces-writer-linked".to_string(),
            role_external_id: None,
            role_session_duration_seconds: MIN_ROLE_SESSION_SECS,
            credential_refresh_threshold_seconds: DEFAULT_REFRESH_THRESHOLD_SECS,
            contact_points: vec![default_contact_point("us-east-1")],
            keyspace: "app".to_string(),
            write_consistency: ConsistencyLevel::LocalQuorum,
            write_ttl_seconds: None,
            statement_cache_capacity: 64,
        }
    }
}

/// Amazon Keyspaces service endpoint for a region
fn default_contact_point(region: &str) -> String {
    format!("cassandra.{}.amazonaws.com:9142", region)
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Helper function to get environment variable with default
fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.app_name, "keyspaces-writer");
        assert_eq!(settings.contact_points, vec!["cassandra.us-east-1.amazonaws.com:9142"]);
        assert!(!settings.has_role_chain());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("development".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("production".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert!("qa".parse::<Environment>().is_err());
    }

    #[test]
    fn test_production_without_role_chain_still_validates() {
        let mut settings = Settings::default();
        assert!(!settings.is_production());

        settings.environment = Environment::Production;
        assert!(settings.is_production());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_session_duration_bounds() {
        let mut settings = Settings::default();
        settings.role_session_duration_seconds = 600;
        assert!(settings.validate().is_err());

        settings.role_session_duration_seconds = 3600;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_threshold_must_be_shorter_than_session() {
        let mut settings = Settings::default();
        settings.linked_role_arn = Some("arn:aws:iam::1:role/linked".to_string());
        settings.credential_refresh_threshold_seconds = 900;
        assert!(settings.validate().is_err());

        settings.credential_refresh_threshold_seconds = 300;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_access_keys_must_be_paired() {
        let mut settings = Settings::default();
        settings.aws_access_key_id = Some("AKIA".to_string());
        assert!(settings.validate().is_err());

        settings.aws_secret_access_key = Some("secret".to_string());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_write_options_from_settings() {
        let mut settings = Settings::default();
        settings.write_consistency = ConsistencyLevel::EachQuorum;
        settings.write_ttl_seconds = Some(86_400);

        let options = settings.write_options();
        assert_eq!(options.consistency, ConsistencyLevel::EachQuorum);
        assert_eq!(options.ttl_seconds, Some(86_400));
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list("a:9142, b:9142,,"), vec!["a:9142", "b:9142"]);
    }

    #[test]
    fn test_secrets_not_serialized() {
        let mut settings = Settings::default();
        settings.aws_secret_access_key = Some("top-secret".to_string());
        let json = serde_json::to_string(&settings).unwrap();
        assert!(!json.contains("top-secret"));
    }
}
