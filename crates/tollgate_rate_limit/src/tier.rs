//! Tier trait for representing provider quota limits.

use crate::{QuotaDimension, QuotaUnit};
use tollgate_core::BudgetConfig;

/// Represents the quota limits of an API tier.
///
/// Providers publish several simultaneous limits (RPM, TPM, RPD, TPD,
/// specialized units per minute). All methods return `Option<T>` where `None`
/// means the tier has no such limit.
///
/// # Example
///
/// ```
/// use tollgate_core::BudgetConfig;
/// use tollgate_rate_limit::Tier;
///
/// struct Trial;
///
/// impl Tier for Trial {
///     fn rpm(&self) -> Option<u32> { Some(3) }
///     fn tpm(&self) -> Option<u64> { Some(40_000) }
///     fn rpd(&self) -> Option<u32> { Some(200) }
///     fn tpd(&self) -> Option<u64> { None }
///     fn upm(&self) -> Option<u32> { None }
///     fn max_concurrent(&self) -> Option<u32> { Some(1) }
///     fn name(&self) -> &str { "Trial" }
/// }
///
/// let dimensions = Trial.dimensions(&BudgetConfig::default());
/// assert_eq!(dimensions.len(), 3);
/// ```
pub trait Tier: Send + Sync {
    /// Requests per minute limit.
    fn rpm(&self) -> Option<u32>;

    /// Tokens per minute limit.
    fn tpm(&self) -> Option<u64>;

    /// Requests per day limit.
    fn rpd(&self) -> Option<u32>;

    /// Tokens per day limit.
    fn tpd(&self) -> Option<u64>;

    /// Specialized units per minute (images, audio seconds).
    fn upm(&self) -> Option<u32>;

    /// Maximum concurrent requests.
    fn max_concurrent(&self) -> Option<u32>;

    /// Name of the tier (e.g., "Free", "Tier 1").
    fn name(&self) -> &str;

    /// Quota dimensions for this tier, scaled by `budget`.
    ///
    /// Limits that are absent or zero are not enforced.
    fn dimensions(&self, budget: &BudgetConfig) -> Vec<QuotaDimension> {
        type Scale = fn(&BudgetConfig, u64) -> u64;
        let limits: [(&str, QuotaUnit, bool, Option<u64>, Scale); 5] = [
            ("rpm", QuotaUnit::Requests, false, self.rpm().map(u64::from), BudgetConfig::apply_rpm),
            ("tpm", QuotaUnit::Tokens, false, self.tpm(), BudgetConfig::apply_tpm),
            ("rpd", QuotaUnit::Requests, true, self.rpd().map(u64::from), BudgetConfig::apply_rpd),
            ("tpd", QuotaUnit::Tokens, true, self.tpd(), BudgetConfig::apply_tpd),
            ("upm", QuotaUnit::Units, false, self.upm().map(u64::from), BudgetConfig::apply_upm),
        ];

        limits
            .into_iter()
            .filter_map(|(name, unit, daily, limit, scale)| {
                let capacity = scale(budget, limit.filter(|c| *c > 0)?);
                Some(if daily {
                    QuotaDimension::per_day(name, unit, capacity)
                } else {
                    QuotaDimension::per_minute(name, unit, capacity)
                })
            })
            .collect()
    }
}
