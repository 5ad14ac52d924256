//! Configuration structures for quota tiers and run settings.
//!
//! Configuration is layered:
//! - Bundled defaults (include_str! from tollgate.toml)
//! - User overrides (~/.config/tollgate/tollgate.toml, then ./tollgate.toml)
//!
//! Later layers override earlier ones key by key.

use crate::Tier;
use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tollgate_core::{BudgetConfig, CheckpointConfig, DispatchConfig, RetryConfig};
use tollgate_error::{ConfigError, TollgateError, TollgateResult};
use tracing::{debug, instrument};

/// Model-specific quota overrides.
///
/// Only the fields that are set override the tier defaults.
///
/// # Example
///
/// ```toml
/// [providers.openai.tiers.tier1.models."text-embedding-3-small"]
/// rpm = 400
/// tpm = 1_000_000
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct ModelTierConfig {
    /// Requests per minute limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpm: Option<u32>,

    /// Tokens per minute limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tpm: Option<u64>,

    /// Requests per day limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpd: Option<u32>,

    /// Tokens per day limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tpd: Option<u64>,

    /// Specialized units per minute limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upm: Option<u32>,

    /// Maximum concurrent requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent: Option<u32>,
}

/// Quota limits of one provider tier, loadable from TOML.
///
/// `None` means the tier has no such limit.
///
/// ```toml
/// [providers.openai.tiers.free]
/// name = "Free"
/// rpm = 3
/// tpm = 40_000
/// rpd = 200
/// max_concurrent = 2
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TierConfig {
    /// Name of the tier (e.g., "Free", "Tier 1")
    pub name: String,

    /// Requests per minute limit
    #[serde(default)]
    pub rpm: Option<u32>,

    /// Tokens per minute limit
    #[serde(default)]
    pub tpm: Option<u64>,

    /// Requests per day limit
    #[serde(default)]
    pub rpd: Option<u32>,

    /// Tokens per day limit
    #[serde(default)]
    pub tpd: Option<u64>,

    /// Specialized units per minute limit
    #[serde(default)]
    pub upm: Option<u32>,

    /// Maximum concurrent requests
    #[serde(default)]
    pub max_concurrent: Option<u32>,

    /// Model-specific overrides
    #[serde(default)]
    pub models: HashMap<String, ModelTierConfig>,
}

impl Tier for TierConfig {
    fn rpm(&self) -> Option<u32> {
        self.rpm
    }

    fn tpm(&self) -> Option<u64> {
        self.tpm
    }

    fn rpd(&self) -> Option<u32> {
        self.rpd
    }

    fn tpd(&self) -> Option<u64> {
        self.tpd
    }

    fn upm(&self) -> Option<u32> {
        self.upm
    }

    fn max_concurrent(&self) -> Option<u32> {
        self.max_concurrent
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TierConfig {
    /// Returns this tier with the overrides for `model_name` applied.
    ///
    /// Falls back to the tier defaults when the model has no entry.
    pub fn for_model(&self, model_name: &str) -> TierConfig {
        match self.models.get(model_name) {
            Some(model) => TierConfig {
                name: self.name.clone(),
                rpm: model.rpm.or(self.rpm),
                tpm: model.tpm.or(self.tpm),
                rpd: model.rpd.or(self.rpd),
                tpd: model.tpd.or(self.tpd),
                upm: model.upm.or(self.upm),
                max_concurrent: model.max_concurrent.or(self.max_concurrent),
                models: HashMap::new(),
            },
            None => self.clone(),
        }
    }
}

/// Tiers of one provider.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Tier used when none is requested
    pub default_tier: String,

    /// Tier name to tier limits
    pub tiers: HashMap<String, TierConfig>,
}

/// Top-level Tollgate configuration.
///
/// # Example
///
/// ```no_run
/// use tollgate_rate_limit::TollgateConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = TollgateConfig::load()?;
/// let tier = config.get_tier("openai", None).unwrap();
/// println!("OpenAI default tier RPM: {:?}", tier.rpm);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct TollgateConfig {
    /// Provider name to provider tiers
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Fraction of each published limit to use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<BudgetConfig>,

    /// Worker pool settings
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Backoff settings
    #[serde(default)]
    pub retry: RetryConfig,

    /// Checkpoint location and cadence
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
}

impl TollgateConfig {
    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> TollgateResult<Self> {
        debug!("Loading configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                TollgateError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                TollgateError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with precedence: current dir > home dir > bundled.
    ///
    /// User config files are optional and skipped when absent.
    #[instrument]
    pub fn load() -> TollgateResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        const DEFAULT_CONFIG: &str = include_str!("../../../tollgate.toml");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/tollgate/tollgate.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("tollgate").required(false));

        let config: Self = builder
            .build()
            .map_err(|e| {
                TollgateError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                TollgateError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Checks the run settings and budget for nonsensical values.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dispatch.validate()?;
        self.retry.validate()?;
        if let Some(budget) = &self.budget {
            budget.validate()?;
        }
        Ok(())
    }

    /// Get tier configuration for a provider.
    ///
    /// Uses the provider's `default_tier` when `tier_name` is `None`.
    #[instrument(skip(self))]
    pub fn get_tier(&self, provider: &str, tier_name: Option<&str>) -> Option<TierConfig> {
        let provider_config = self.providers.get(provider)?;

        let tier = tier_name.unwrap_or(&provider_config.default_tier);

        debug!(provider, tier, "Looking up tier configuration");

        provider_config.tiers.get(tier).cloned()
    }

    /// Budget from the config file, or the full quota.
    pub fn budget_or_default(&self) -> BudgetConfig {
        self.budget.clone().unwrap_or_default()
    }

    /// Dispatch settings with the worker count capped by the tier's
    /// concurrency limit.
    pub fn dispatch_for<T: Tier + ?Sized>(&self, tier: &T) -> DispatchConfig {
        match tier.max_concurrent() {
            Some(max) if (max as usize) < *self.dispatch.concurrency() => {
                debug!(
                    configured = *self.dispatch.concurrency(),
                    max, "Capping concurrency at tier limit"
                );
                self.dispatch.clone().with_concurrency(max.max(1) as usize)
            }
            _ => self.dispatch.clone(),
        }
    }
}
