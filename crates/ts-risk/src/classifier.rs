//! Alert classification for accepted assets.

use chrono::{DateTime, Utc};

use ts_types::alerts::{AlertKind, AlertRecord};
use ts_types::asset::{RiskTier, ScoredAsset};

/// Maps an accepted, scored asset to exactly one [`AlertRecord`].
///
/// There is no suppression: the same address accepted on two ticks yields
/// two alerts.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertClassifier;

impl AlertClassifier {
    /// Kind of alert raised for an asset of the given tier.
    pub fn kind_for(tier: RiskTier) -> AlertKind {
        match tier {
            RiskTier::High => AlertKind::HighRisk,
            RiskTier::Safe => AlertKind::SafeOpportunity,
            RiskTier::Moderate => AlertKind::NewToken,
        }
    }

    /// Build the alert for `asset`, stamped with the detection time.
    pub fn classify(asset: &ScoredAsset, detected_at: DateTime<Utc>) -> AlertRecord {
        let kind = Self::kind_for(asset.tier);
        let name = asset.name();
        let message = match kind {
            AlertKind::HighRisk => {
                format!("HIGH RISK: {name} - Review security parameters")
            }
            AlertKind::SafeOpportunity => {
                format!("SAFE: {name} - All security checks passed")
            }
            AlertKind::NewToken => {
                format!("New {} risk token detected: {name}", asset.tier)
            }
        };

        AlertRecord::new(asset.address(), kind, message, detected_at)
    }
}
