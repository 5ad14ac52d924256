//! Budget multipliers for throttling quota usage below the published limits.

use serde::{Deserialize, Serialize};
use tollgate_error::ConfigError;

/// Budget multipliers for throttling API usage.
///
/// Multipliers scale the effective quota capacities without modifying tier
/// configuration. All multipliers are in the range (0.0, 1.0] where 1.0 means
/// full quota usage. Published limits are often optimistic: running at 80% of
/// the advertised RPM keeps the server from answering with 429s.
///
/// # Examples
///
/// ```
/// use tollgate_core::BudgetConfig;
///
/// // Use 80% of RPM, 50% of RPD
/// let conservative = BudgetConfig::builder()
///     .rpm_multiplier(0.8)
///     .rpd_multiplier(0.5)
///     .build();
///
/// assert_eq!(conservative.apply_rpm(500), 400);
///
/// // Default: use full quotas
/// let full = BudgetConfig::default();
/// assert_eq!(*full.rpm_multiplier(), 1.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
#[serde(deny_unknown_fields)]
pub struct BudgetConfig {
    /// Multiplier for requests per minute (0.0-1.0, default 1.0).
    #[serde(default = "default_multiplier")]
    rpm_multiplier: f64,

    /// Multiplier for tokens per minute (0.0-1.0, default 1.0).
    #[serde(default = "default_multiplier")]
    tpm_multiplier: f64,

    /// Multiplier for requests per day (0.0-1.0, default 1.0).
    #[serde(default = "default_multiplier")]
    rpd_multiplier: f64,

    /// Multiplier for tokens per day (0.0-1.0, default 1.0).
    #[serde(default = "default_multiplier")]
    tpd_multiplier: f64,

    /// Multiplier for specialized units per minute (0.0-1.0, default 1.0).
    #[serde(default = "default_multiplier")]
    upm_multiplier: f64,
}

fn default_multiplier() -> f64 {
    1.0
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            rpm_multiplier: 1.0,
            tpm_multiplier: 1.0,
            rpd_multiplier: 1.0,
            tpd_multiplier: 1.0,
            upm_multiplier: 1.0,
        }
    }
}

fn check(name: &str, value: f64) -> Result<(), ConfigError> {
    if value <= 0.0 || value > 1.0 {
        return Err(ConfigError::new(format!(
            "{} multiplier must be in (0.0, 1.0], got {}",
            name, value
        )));
    }
    Ok(())
}

fn scale(limit: u64, multiplier: f64) -> u64 {
    // A configured limit never scales below one.
    ((limit as f64 * multiplier).round() as u64).max(1)
}

impl BudgetConfig {
    /// Creates a new budget config builder.
    pub fn builder() -> BudgetConfigBuilder {
        BudgetConfigBuilder::default()
    }

    /// Validates that all multipliers are in valid range (0.0, 1.0].
    ///
    /// # Errors
    ///
    /// Returns an error if any multiplier is <= 0.0 or > 1.0.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check("RPM", self.rpm_multiplier)?;
        check("TPM", self.tpm_multiplier)?;
        check("RPD", self.rpd_multiplier)?;
        check("TPD", self.tpd_multiplier)?;
        check("UPM", self.upm_multiplier)
    }

    /// Applies this budget to a per-minute request limit.
    pub fn apply_rpm(&self, rpm: u64) -> u64 {
        scale(rpm, self.rpm_multiplier)
    }

    /// Applies this budget to a per-minute token limit.
    pub fn apply_tpm(&self, tpm: u64) -> u64 {
        scale(tpm, self.tpm_multiplier)
    }

    /// Applies this budget to a daily request limit.
    pub fn apply_rpd(&self, rpd: u64) -> u64 {
        scale(rpd, self.rpd_multiplier)
    }

    /// Applies this budget to a daily token limit.
    pub fn apply_tpd(&self, tpd: u64) -> u64 {
        scale(tpd, self.tpd_multiplier)
    }

    /// Applies this budget to a per-minute specialized unit limit.
    pub fn apply_upm(&self, upm: u64) -> u64 {
        scale(upm, self.upm_multiplier)
    }

    /// Merges this budget with another, taking the minimum of each multiplier.
    ///
    /// Used to combine CLI overrides with the configured budget.
    pub fn merge(&self, other: &BudgetConfig) -> BudgetConfig {
        BudgetConfig {
            rpm_multiplier: self.rpm_multiplier.min(other.rpm_multiplier),
            tpm_multiplier: self.tpm_multiplier.min(other.tpm_multiplier),
            rpd_multiplier: self.rpd_multiplier.min(other.rpd_multiplier),
            tpd_multiplier: self.tpd_multiplier.min(other.tpd_multiplier),
            upm_multiplier: self.upm_multiplier.min(other.upm_multiplier),
        }
    }
}

/// Builder for `BudgetConfig`.
#[derive(Debug, Default)]
pub struct BudgetConfigBuilder {
    rpm_multiplier: Option<f64>,
    tpm_multiplier: Option<f64>,
    rpd_multiplier: Option<f64>,
    tpd_multiplier: Option<f64>,
    upm_multiplier: Option<f64>,
}

impl BudgetConfigBuilder {
    /// Sets the RPM multiplier.
    pub fn rpm_multiplier(mut self, value: f64) -> Self {
        self.rpm_multiplier = Some(value);
        self
    }

    /// Sets the TPM multiplier.
    pub fn tpm_multiplier(mut self, value: f64) -> Self {
        self.tpm_multiplier = Some(value);
        self
    }

    /// Sets the RPD multiplier.
    pub fn rpd_multiplier(mut self, value: f64) -> Self {
        self.rpd_multiplier = Some(value);
        self
    }

    /// Sets the TPD multiplier.
    pub fn tpd_multiplier(mut self, value: f64) -> Self {
        self.tpd_multiplier = Some(value);
        self
    }

    /// Sets the UPM multiplier.
    pub fn upm_multiplier(mut self, value: f64) -> Self {
        self.upm_multiplier = Some(value);
        self
    }

    /// Builds the `BudgetConfig`.
    pub fn build(self) -> BudgetConfig {
        BudgetConfig {
            rpm_multiplier: self.rpm_multiplier.unwrap_or(1.0),
            tpm_multiplier: self.tpm_multiplier.unwrap_or(1.0),
            rpd_multiplier: self.rpd_multiplier.unwrap_or(1.0),
            tpd_multiplier: self.tpd_multiplier.unwrap_or(1.0),
            upm_multiplier: self.upm_multiplier.unwrap_or(1.0),
        }
    }
}
