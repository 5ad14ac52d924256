//! Built-in provider tiers.
//!
//! Use these when no `tollgate.toml` entry applies. Configured tiers
//! ([`TierConfig`](crate::TierConfig)) take precedence in the CLI.

use crate::Tier;

/// OpenAI API usage tiers.
///
/// Based on [OpenAI usage tiers](https://platform.openai.com/docs/guides/rate-limits).
/// Tiers are assigned from cumulative spend and account age.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum OpenAITier {
    /// Free tier: 3 RPM, 40K TPM, 200 RPD
    Free,
    /// Tier 1: 500 RPM, 200K TPM, 10K RPD
    Tier1,
    /// Tier 2: 5000 RPM, 2M TPM
    Tier2,
    /// Tier 3: 5000 RPM, 4M TPM
    Tier3,
    /// Tier 4: 10000 RPM, 10M TPM
    Tier4,
    /// Tier 5: 10000 RPM, 50M TPM
    Tier5,
}

impl Tier for OpenAITier {
    fn rpm(&self) -> Option<u32> {
        match self {
            OpenAITier::Free => Some(3),
            OpenAITier::Tier1 => Some(500),
            OpenAITier::Tier2 | OpenAITier::Tier3 => Some(5_000),
            OpenAITier::Tier4 | OpenAITier::Tier5 => Some(10_000),
        }
    }

    fn tpm(&self) -> Option<u64> {
        match self {
            OpenAITier::Free => Some(40_000),
            OpenAITier::Tier1 => Some(200_000),
            OpenAITier::Tier2 => Some(2_000_000),
            OpenAITier::Tier3 => Some(4_000_000),
            OpenAITier::Tier4 => Some(10_000_000),
            OpenAITier::Tier5 => Some(50_000_000),
        }
    }

    fn rpd(&self) -> Option<u32> {
        match self {
            OpenAITier::Free => Some(200),
            OpenAITier::Tier1 => Some(10_000),
            _ => None,
        }
    }

    fn tpd(&self) -> Option<u64> {
        None
    }

    fn upm(&self) -> Option<u32> {
        None
    }

    fn max_concurrent(&self) -> Option<u32> {
        match self {
            OpenAITier::Free => Some(2),
            OpenAITier::Tier1 => Some(8),
            OpenAITier::Tier2 => Some(32),
            _ => Some(64),
        }
    }

    fn name(&self) -> &str {
        match self {
            OpenAITier::Free => "Free",
            OpenAITier::Tier1 => "Tier 1",
            OpenAITier::Tier2 => "Tier 2",
            OpenAITier::Tier3 => "Tier 3",
            OpenAITier::Tier4 => "Tier 4",
            OpenAITier::Tier5 => "Tier 5",
        }
    }
}
