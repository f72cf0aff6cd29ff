use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::FeedError;

/// Contract-level security attributes captured alongside an observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySnapshot {
    pub liquidity_locked: bool,
    pub mint_disabled: bool,
    pub freeze_disabled: bool,
    /// Percent of supply held by the ten largest holders, in `[0, 100]`.
    #[serde(with = "rust_decimal::serde::float")]
    pub top10_holders: Decimal,
    /// Hours since the contract was deployed.
    #[serde(with = "rust_decimal::serde::float")]
    pub contract_age: Decimal,
}

impl SecuritySnapshot {
    /// Snapshot with every security check passing, low concentration and an
    /// established contract.
    pub fn hardened() -> Self {
        Self {
            liquidity_locked: true,
            mint_disabled: true,
            freeze_disabled: true,
            top10_holders: Decimal::from(10),
            contract_age: Decimal::from(24),
        }
    }
}

/// A single candidate asset as reported by the feed on one scan tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetObservation {
    /// Opaque on-chain address; the asset's identity.
    pub address: String,
    pub name: String,
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub market_cap: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub volume_24h: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub liquidity: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_change_24h: Decimal,
    pub holders: u64,
    pub security: SecuritySnapshot,
    pub timestamp: DateTime<Utc>,
}

impl AssetObservation {
    /// Check the numeric invariants a well-formed observation must satisfy.
    pub fn validate(&self) -> Result<(), FeedError> {
        let non_negative = [
            ("market_cap", self.market_cap),
            ("volume_24h", self.volume_24h),
            ("liquidity", self.liquidity),
            ("contract_age", self.security.contract_age),
        ];
        for (field, value) in non_negative {
            if value < Decimal::ZERO {
                return Err(FeedError::Malformed {
                    address: self.address.clone(),
                    message: format!("{field} must be non-negative, got {value}"),
                });
            }
        }

        let concentration = self.security.top10_holders;
        if concentration < Decimal::ZERO || concentration > Decimal::ONE_HUNDRED {
            return Err(FeedError::Malformed {
                address: self.address.clone(),
                message: format!("top10_holders must be within [0, 100], got {concentration}"),
            });
        }

        Ok(())
    }
}

/// Discrete risk classification derived from the risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Safe,
    Moderate,
    High,
}

impl RiskTier {
    pub const ALL: [RiskTier; 3] = [RiskTier::Safe, RiskTier::Moderate, RiskTier::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Safe => "safe",
            RiskTier::Moderate => "moderate",
            RiskTier::High => "high",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "safe" => Ok(RiskTier::Safe),
            "moderate" => Ok(RiskTier::Moderate),
            "high" => Ok(RiskTier::High),
            other => Err(format!("unknown risk tier: {other}")),
        }
    }
}

/// An observation together with its derived risk score and tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredAsset {
    #[serde(flatten)]
    pub observation: AssetObservation,
    /// Integer score in `[0, 100]`; higher is safer.
    pub risk_score: u8,
    #[serde(rename = "riskLevel")]
    pub tier: RiskTier,
}

impl ScoredAsset {
    pub fn address(&self) -> &str {
        &self.observation.address
    }

    pub fn name(&self) -> &str {
        &self.observation.name
    }
}

/// A scored asset as held by the store.
///
/// `first_detected` is fixed by the first insert; `last_updated` moves on
/// every upsert of the same address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedAsset {
    #[serde(flatten)]
    pub asset: ScoredAsset,
    pub first_detected: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl PersistedAsset {
    /// Record for an asset detected at `at`. Stores keep the existing
    /// `first_detected` when the address is already known.
    pub fn detected(asset: ScoredAsset, at: DateTime<Utc>) -> Self {
        Self {
            asset,
            first_detected: at,
            last_updated: at,
        }
    }

    pub fn address(&self) -> &str {
        self.asset.address()
    }

    pub fn tier(&self) -> RiskTier {
        self.asset.tier
    }
}
