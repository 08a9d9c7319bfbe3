//! Configuration management infrastructure.
//!
//! Validation policy lives in a TOML file: global defaults plus a list of
//! overrides, each scoped by a context pattern. `into_properties` turns the
//! file into the `SignatureValidationProperties` the validators consume.

use crate::adapters::crl_http_client::CrlHttpConfig;
use crate::domain::constants::{
    DEFAULT_FRESHNESS_SECS, DEFAULT_HISTORICAL_FRESHNESS_SECS, DEFAULT_MAX_CHAIN_DEPTH,
    MAX_FRESHNESS_SECS, MAX_TIMEOUT_SECS,
};
use crate::domain::{
    CertificateExtension, ContextPattern, OnlineFetching, SignatureValidationProperties,
    TimeBasedContext,
};
use crate::infra::error::{ValidatorError, ValidatorResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Validation preferences as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfiguration {
    /// Keep collecting findings after the first INVALID one
    pub continue_after_failure: bool,

    /// Maximum age of revocation data for present-time validation
    pub freshness_seconds: u64,

    /// Maximum age of revocation data when validating at a past instant
    pub historical_freshness_seconds: u64,

    /// Whether revocation data may be downloaded
    pub online_fetching: OnlineFetching,

    /// Maximum number of certificates walked, nested walks included
    pub max_chain_depth: usize,

    /// Bound on a single revocation fetch
    pub fetch_timeout_seconds: u64,

    /// Bound on a whole chain validation
    pub validation_timeout_seconds: u64,

    /// CRL download settings
    pub crl_download: CrlDownloadConfig,

    /// Context-scoped policy overrides, applied in order
    pub overrides: Vec<PolicyOverride>,
}

/// HTTP settings for CRL downloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrlDownloadConfig {
    pub retries_per_url: usize,
    pub retry_delay_ms: u64,
    pub user_agent: String,
}

/// Policy values applying to contexts matching `pattern`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_after_failure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freshness_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online_fetching: Option<OnlineFetching>,
    #[serde(default)]
    pub pattern: ContextPattern,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_extensions: Option<Vec<CertificateExtension>>,
}

impl Default for ValidationConfiguration {
    fn default() -> Self {
        Self {
            continue_after_failure: true,
            freshness_seconds: DEFAULT_FRESHNESS_SECS,
            historical_freshness_seconds: DEFAULT_HISTORICAL_FRESHNESS_SECS,
            online_fetching: OnlineFetching::IfNoOtherOptions,
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
            fetch_timeout_seconds: 10,
            validation_timeout_seconds: 60,
            crl_download: CrlDownloadConfig::default(),
            overrides: Vec::new(),
        }
    }
}

impl Default for CrlDownloadConfig {
    fn default() -> Self {
        let http = CrlHttpConfig::default();
        Self {
            retries_per_url: http.retries_per_url,
            retry_delay_ms: 500,
            user_agent: http.user_agent,
        }
    }
}

impl ValidationConfiguration {
    /// Build the policy object consumed by the validators.
    #[must_use]
    pub fn into_properties(self) -> SignatureValidationProperties {
        let mut properties = SignatureValidationProperties::new();
        properties
            .set_continue_after_failure(ContextPattern::any(), self.continue_after_failure)
            .set_freshness(ContextPattern::any(), Duration::from_secs(self.freshness_seconds))
            .set_freshness(
                ContextPattern::any().time(TimeBasedContext::Historical),
                Duration::from_secs(self.historical_freshness_seconds),
            )
            .set_online_fetching(ContextPattern::any(), self.online_fetching)
            .set_max_chain_depth(self.max_chain_depth)
            .set_fetch_timeout(Duration::from_secs(self.fetch_timeout_seconds))
            .set_validation_timeout(Duration::from_secs(self.validation_timeout_seconds));

        for rule in self.overrides {
            if let Some(value) = rule.continue_after_failure {
                properties.set_continue_after_failure(rule.pattern, value);
            }
            if let Some(secs) = rule.freshness_seconds {
                properties.set_freshness(rule.pattern, Duration::from_secs(secs));
            }
            if let Some(mode) = rule.online_fetching {
                properties.set_online_fetching(rule.pattern, mode);
            }
            if let Some(extensions) = rule.required_extensions {
                properties.set_required_extensions(rule.pattern, extensions);
            }
        }
        properties
    }

    /// HTTP settings for `HttpCrlClient`.
    #[must_use]
    pub fn crl_http_config(&self) -> CrlHttpConfig {
        CrlHttpConfig {
            timeout: Duration::from_secs(self.fetch_timeout_seconds),
            retries_per_url: self.crl_download.retries_per_url,
            retry_delay: Duration::from_millis(self.crl_download.retry_delay_ms),
            user_agent: self.crl_download.user_agent.clone(),
        }
    }
}

/// Configuration manager for handling config files
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new configuration manager with default path
    pub fn new() -> ValidatorResult<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Create a configuration manager with custom path
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> ValidatorResult<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Ok(config_dir.join("sigchain-validator").join("config.toml"))
        } else {
            Ok(PathBuf::from("sigchain-validator-config.toml"))
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub fn load_or_create_default(&self) -> ValidatorResult<ValidationConfiguration> {
        if self.config_path.exists() {
            self.load()
        } else {
            log::info!(
                "Configuration file not found, creating default: {}",
                self.config_path.display()
            );
            let default_config = ValidationConfiguration::default();
            self.save(&default_config)?;
            Ok(default_config)
        }
    }

    /// Load configuration from file
    pub fn load(&self) -> ValidatorResult<ValidationConfiguration> {
        log::info!("Loading configuration from: {}", self.config_path.display());

        let content = fs::read_to_string(&self.config_path).map_err(|e| {
            ValidatorError::ConfigurationError(format!(
                "Failed to read config file {}: {}",
                self.config_path.display(),
                e
            ))
        })?;

        let config: ValidationConfiguration = toml::from_str(&content).map_err(|e| {
            ValidatorError::ConfigurationError(format!("Failed to parse config file: {e}"))
        })?;

        self.validate_config(&config)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &ValidationConfiguration) -> ValidatorResult<()> {
        log::info!("Saving configuration to: {}", self.config_path.display());

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ValidatorError::ConfigurationError(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let content = toml::to_string_pretty(config).map_err(|e| {
            ValidatorError::ConfigurationError(format!("Failed to serialize config: {e}"))
        })?;

        fs::write(&self.config_path, content).map_err(|e| {
            ValidatorError::ConfigurationError(format!(
                "Failed to write config file {}: {}",
                self.config_path.display(),
                e
            ))
        })?;

        Ok(())
    }

    /// Validate configuration values
    pub fn validate_config(&self, config: &ValidationConfiguration) -> ValidatorResult<()> {
        if config.freshness_seconds == 0 || config.historical_freshness_seconds == 0 {
            return Err(ValidatorError::ConfigurationError(
                "Freshness must be greater than 0".to_string(),
            ));
        }
        if config.freshness_seconds > MAX_FRESHNESS_SECS
            || config.historical_freshness_seconds > MAX_FRESHNESS_SECS
        {
            return Err(ValidatorError::ConfigurationError(format!(
                "Freshness must not exceed {MAX_FRESHNESS_SECS} seconds"
            )));
        }
        if config.max_chain_depth == 0 {
            return Err(ValidatorError::ConfigurationError(
                "Maximum chain depth must be greater than 0".to_string(),
            ));
        }
        if config.fetch_timeout_seconds == 0 || config.validation_timeout_seconds == 0 {
            return Err(ValidatorError::ConfigurationError(
                "Timeouts must be greater than 0".to_string(),
            ));
        }
        if config.fetch_timeout_seconds > MAX_TIMEOUT_SECS
            || config.validation_timeout_seconds > MAX_TIMEOUT_SECS
        {
            return Err(ValidatorError::ConfigurationError(format!(
                "Timeouts must not exceed {MAX_TIMEOUT_SECS} seconds"
            )));
        }
        if config.crl_download.retries_per_url == 0 {
            return Err(ValidatorError::ConfigurationError(
                "Retry attempts must be greater than 0".to_string(),
            ));
        }
        for (idx, rule) in config.overrides.iter().enumerate() {
            if rule.freshness_seconds == Some(0) {
                return Err(ValidatorError::ConfigurationError(format!(
                    "Override {}: freshness must be greater than 0",
                    idx + 1
                )));
            }
            if rule.freshness_seconds.is_some_and(|secs| secs > MAX_FRESHNESS_SECS) {
                return Err(ValidatorError::ConfigurationError(format!(
                    "Override {}: freshness must not exceed {MAX_FRESHNESS_SECS} seconds",
                    idx + 1
                )));
            }
        }
        Ok(())
    }

    /// Get the configuration file path
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Export configuration as a portable format
    pub fn export_config(&self, format: ExportFormat) -> ValidatorResult<String> {
        let config = self.load()?;

        match format {
            ExportFormat::Toml => toml::to_string_pretty(&config).map_err(|e| {
                ValidatorError::ConfigurationError(format!("TOML export failed: {e}"))
            }),
            ExportFormat::Json => serde_json::to_string_pretty(&config).map_err(|e| {
                ValidatorError::ConfigurationError(format!("JSON export failed: {e}"))
            }),
            ExportFormat::Yaml => serde_yaml::to_string(&config).map_err(|e| {
                ValidatorError::ConfigurationError(format!("YAML export failed: {e}"))
            }),
        }
    }
}

/// Configuration export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Toml,
    Json,
    Yaml,
}
