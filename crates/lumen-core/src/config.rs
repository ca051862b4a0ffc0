//! Configuration management for Lumen.
//!
//! Configuration comes from the process environment (a `.env` file is loaded
//! by the binary before this runs). Startup refuses to proceed when any
//! required variable is missing; the error names all of them at once.

use crate::caption::CaptionParser;
use crate::error::ConfigError;
use crate::store::PollSettings;
use std::fmt;
use std::time::Duration;

/// Root configuration structure for Lumen.
#[derive(Debug, Clone)]
pub struct Config {
    /// Object store settings
    pub storage: StorageConfig,

    /// Caption provider settings
    pub caption: CaptionConfig,

    /// HTTP front end settings
    pub server: ServerConfig,
}

/// Object store settings.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Bucket all objects are stored in
    pub bucket: String,

    /// Bucket region
    pub region: String,

    /// Static access credentials
    pub access_key_id: String,
    pub secret_access_key: String,

    /// Max existence-check attempts during the two rename waits
    pub rename_poll_attempts: u32,

    /// Fixed delay between existence checks in milliseconds
    pub rename_poll_interval_ms: u64,
}

impl StorageConfig {
    /// Polling knobs for the rename visibility waits.
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            max_attempts: self.rename_poll_attempts,
            interval: Duration::from_millis(self.rename_poll_interval_ms),
        }
    }
}

/// Caption provider settings.
#[derive(Debug, Clone)]
pub struct CaptionConfig {
    /// Prediction API token
    pub api_token: String,

    /// Model identifier, either a bare version hash or `owner/model:version`
    pub model: String,

    /// Delay between prediction status polls in milliseconds
    pub poll_interval_ms: u64,

    /// Strategy for extracting the caption from the raw prediction output
    pub output_format: CaptionParser,
}

/// HTTP front end settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Origins allowed by the CORS policy
    pub allowed_origins: Vec<String>,
}

const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_RENAME_POLL_ATTEMPTS: u32 = 6;
const DEFAULT_RENAME_POLL_INTERVAL_MS: u64 = 5000;
const DEFAULT_PREDICTION_POLL_INTERVAL_MS: u64 = 1000;

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an injectable variable lookup.
    ///
    /// Tests use this to avoid touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> std::result::Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut require = |name: &str| match lookup(name) {
            Some(value) if !value.is_empty() => value,
            _ => {
                missing.push(name.to_string());
                String::new()
            }
        };

        let bucket = require("BUCKET_NAME");
        let region = require("AWS_REGION");
        let access_key_id = require("AWS_ACCESS_KEY_ID");
        let secret_access_key = require("AWS_SECRET_ACCESS_KEY");
        let api_token = require("REPLICATE_API_TOKEN");
        let model = require("REPLICATE_MODEL_IDENTIFIER");

        if !missing.is_empty() {
            return Err(ConfigError::MissingEnv(missing));
        }

        let allowed_origins = match lookup("ALLOWED_ORIGINS") {
            Some(value) => value
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            None => vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
        };

        let rename_poll_attempts =
            parse_var(&lookup, "RENAME_POLL_ATTEMPTS", DEFAULT_RENAME_POLL_ATTEMPTS)?;
        let rename_poll_interval_ms = parse_var(
            &lookup,
            "RENAME_POLL_INTERVAL_MS",
            DEFAULT_RENAME_POLL_INTERVAL_MS,
        )?;
        let poll_interval_ms = parse_var(
            &lookup,
            "PREDICTION_POLL_INTERVAL_MS",
            DEFAULT_PREDICTION_POLL_INTERVAL_MS,
        )?;

        let output_format = match lookup("CAPTION_OUTPUT_FORMAT") {
            Some(value) => value
                .parse::<CaptionParser>()
                .map_err(ConfigError::ValidationError)?,
            None => CaptionParser::default(),
        };

        let config = Config {
            storage: StorageConfig {
                bucket,
                region,
                access_key_id,
                secret_access_key,
                rename_poll_attempts,
                rename_poll_interval_ms,
            },
            caption: CaptionConfig {
                api_token,
                model,
                poll_interval_ms,
                output_format,
            },
            server: ServerConfig { allowed_origins },
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.storage.rename_poll_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "RENAME_POLL_ATTEMPTS must be > 0".into(),
            ));
        }
        if self.storage.rename_poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "RENAME_POLL_INTERVAL_MS must be > 0".into(),
            ));
        }
        if self.caption.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "PREDICTION_POLL_INTERVAL_MS must be > 0".into(),
            ));
        }
        if self.server.allowed_origins.is_empty() {
            return Err(ConfigError::ValidationError(
                "ALLOWED_ORIGINS must name at least one origin".into(),
            ));
        }
        Ok(())
    }
}

/// Parse an optional numeric variable, falling back to `default` when unset.
fn parse_var<T, F>(lookup: &F, name: &str, default: T) -> std::result::Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => value
            .parse::<T>()
            .map_err(|e| ConfigError::ValidationError(format!("{name}: {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("BUCKET_NAME", "gallery"),
            ("AWS_REGION", "eu-central-1"),
            ("AWS_ACCESS_KEY_ID", "AKIATEST"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("REPLICATE_API_TOKEN", "r8_test"),
            ("REPLICATE_MODEL_IDENTIFIER", "salesforce/blip:abc123"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<Config, ConfigError> {
        Config::from_lookup(|name| env.get(name).map(|v| v.to_string()))
    }

    #[test]
    fn test_full_env_loads_with_defaults() {
        let config = load(&full_env()).unwrap();
        assert_eq!(config.storage.bucket, "gallery");
        assert_eq!(config.storage.rename_poll_attempts, 6);
        assert_eq!(config.storage.rename_poll_interval_ms, 5000);
        assert_eq!(config.caption.poll_interval_ms, 1000);
        assert_eq!(config.caption.output_format, CaptionParser::ColonDelimited);
        assert_eq!(config.server.allowed_origins, vec!["http://localhost:3000"]);
    }

    #[test]
    fn test_missing_vars_all_named() {
        let mut env = full_env();
        env.remove("BUCKET_NAME");
        env.remove("REPLICATE_API_TOKEN");
        let err = load(&env).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("BUCKET_NAME"));
        assert!(message.contains("REPLICATE_API_TOKEN"));
        assert!(!message.contains("AWS_REGION"));
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let mut env = full_env();
        env.insert("AWS_REGION", "");
        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("AWS_REGION"));
    }

    #[test]
    fn test_allowed_origins_split_and_trimmed() {
        let mut env = full_env();
        env.insert(
            "ALLOWED_ORIGINS",
            "http://localhost:3000, https://gallery.example.com",
        );
        let config = load(&env).unwrap();
        assert_eq!(
            config.server.allowed_origins,
            vec!["http://localhost:3000", "https://gallery.example.com"]
        );
    }

    #[test]
    fn test_invalid_poll_attempts_rejected() {
        let mut env = full_env();
        env.insert("RENAME_POLL_ATTEMPTS", "not-a-number");
        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("RENAME_POLL_ATTEMPTS"));
    }

    #[test]
    fn test_zero_poll_attempts_rejected() {
        let mut env = full_env();
        env.insert("RENAME_POLL_ATTEMPTS", "0");
        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("RENAME_POLL_ATTEMPTS"));
    }

    #[test]
    fn test_output_format_selectable() {
        let mut env = full_env();
        env.insert("CAPTION_OUTPUT_FORMAT", "verbatim");
        let config = load(&env).unwrap();
        assert_eq!(config.caption.output_format, CaptionParser::Verbatim);

        env.insert("CAPTION_OUTPUT_FORMAT", "mystery");
        assert!(load(&env).is_err());
    }

    #[test]
    fn test_poll_settings_conversion() {
        let config = load(&full_env()).unwrap();
        let poll = config.storage.poll_settings();
        assert_eq!(poll.max_attempts, 6);
        assert_eq!(poll.interval, Duration::from_millis(5000));
    }
}
