//! Tests for built-in tiers.

use std::str::FromStr;
use strum::IntoEnumIterator;
use tollgate_core::BudgetConfig;
use tollgate_rate_limit::{QuotaUnit, Tier, tiers::OpenAITier};

#[test]
fn test_openai_free_tier() {
    let tier = OpenAITier::Free;
    assert_eq!(tier.rpm(), Some(3));
    assert_eq!(tier.tpm(), Some(40_000));
    assert_eq!(tier.rpd(), Some(200));
    assert_eq!(tier.tpd(), None);
    assert_eq!(tier.max_concurrent(), Some(2));
    assert_eq!(tier.name(), "Free");
}

#[test]
fn test_openai_tier5() {
    let tier = OpenAITier::Tier5;
    assert_eq!(tier.rpm(), Some(10_000));
    assert_eq!(tier.tpm(), Some(50_000_000));
    assert_eq!(tier.rpd(), None);
    assert_eq!(tier.name(), "Tier 5");
}

#[test]
fn test_tier_parses_from_cli_name() {
    assert_eq!(OpenAITier::from_str("tier2").unwrap(), OpenAITier::Tier2);
    assert_eq!(OpenAITier::Free.to_string(), "free");
    assert!(OpenAITier::from_str("gold").is_err());
}

#[test]
fn test_every_tier_limits_requests_and_tokens() {
    for tier in OpenAITier::iter() {
        let dims = tier.dimensions(&BudgetConfig::default());
        assert!(dims.iter().any(|d| *d.unit() == QuotaUnit::Requests));
        assert!(dims.iter().any(|d| *d.unit() == QuotaUnit::Tokens));
    }
}
