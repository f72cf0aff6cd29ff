//! Fixtures shared by the store tests.

use chrono::{DateTime, Utc};
use rust_decimal_macros::dec;

use ts_types::asset::{AssetObservation, PersistedAsset, RiskTier, ScoredAsset, SecuritySnapshot};

pub(crate) fn asset_with_tier(address: &str, tier: RiskTier) -> ScoredAsset {
    let risk_score = match tier {
        RiskTier::Safe => 95,
        RiskTier::Moderate => 55,
        RiskTier::High => 20,
    };
    ScoredAsset {
        observation: AssetObservation {
            address: address.to_string(),
            name: "MOON".into(),
            symbol: "MOON".into(),
            market_cap: dec!(9000.50),
            volume_24h: dec!(2500),
            liquidity: dec!(4000.25),
            price_change_24h: dec!(-4.75),
            holders: 512,
            security: SecuritySnapshot::hardened(),
            timestamp: Utc::now(),
        },
        risk_score,
        tier,
    }
}

pub(crate) fn persisted(address: &str, tier: RiskTier, at: DateTime<Utc>) -> PersistedAsset {
    PersistedAsset::detected(asset_with_tier(address, tier), at)
}
