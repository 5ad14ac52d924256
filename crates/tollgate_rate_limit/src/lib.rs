//! Quota tracking and usage tier management.
//!
//! Remote inference APIs enforce several limits at once (requests per minute,
//! tokens per minute, requests per day, ...). [`QuotaTracker`] holds a sliding
//! window per limit and admits a call only if every window has headroom.
//!
//! Limits come from a [`Tier`]: either a built-in one such as
//! [`tiers::OpenAITier`] or a [`TierConfig`] loaded through
//! [`TollgateConfig::load`]. [`HeaderRateLimitDetector`] tightens them at
//! runtime from response headers.
//!
//! ```
//! use tollgate_core::BudgetConfig;
//! use tollgate_rate_limit::{QuotaTracker, tiers::OpenAITier};
//!
//! let tracker = QuotaTracker::from_tier(&OpenAITier::Free, &BudgetConfig::default());
//! assert_eq!(tracker.dimensions().len(), 3);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod detector;
mod dimension;
mod tier;
pub mod tiers;
mod tracker;
mod window;

pub use config::{ModelTierConfig, ProviderConfig, TierConfig, TollgateConfig};
pub use detector::{DetectedLimits, HeaderRateLimitDetector, parse_reset};
pub use dimension::{DAY, Demand, MINUTE, QuotaDimension, QuotaUnit};
pub use tier::Tier;
pub use tollgate_error::{RateLimitError, RateLimitErrorKind};
pub use tracker::{Admission, DimensionUsage, QuotaTracker, Reservation};
pub use window::ReservationId;
