use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::asset::{RiskTier, ScoredAsset};

/// Discriminant for the kind of alert raised on an accepted asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    NewToken,
    HighRisk,
    SafeOpportunity,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::NewToken => "new_token",
            AlertKind::HighRisk => "high_risk",
            AlertKind::SafeOpportunity => "safe_opportunity",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "new_token" => Ok(AlertKind::NewToken),
            "high_risk" => Ok(AlertKind::HighRisk),
            "safe_opportunity" => Ok(AlertKind::SafeOpportunity),
            other => Err(format!("unknown alert kind: {other}")),
        }
    }
}

/// A single alert record. Append-only once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    pub id: Uuid,
    pub token_address: String,
    #[serde(rename = "alertType")]
    pub kind: AlertKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl AlertRecord {
    pub fn new(
        token_address: impl Into<String>,
        kind: AlertKind,
        message: String,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            token_address: token_address.into(),
            kind,
            message,
            timestamp,
        }
    }
}

/// Number of stored assets per risk tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    pub safe: u64,
    pub moderate: u64,
    pub high: u64,
}

impl TierCounts {
    pub fn get(&self, tier: RiskTier) -> u64 {
        match tier {
            RiskTier::Safe => self.safe,
            RiskTier::Moderate => self.moderate,
            RiskTier::High => self.high,
        }
    }

    pub fn increment(&mut self, tier: RiskTier) {
        match tier {
            RiskTier::Safe => self.safe += 1,
            RiskTier::Moderate => self.moderate += 1,
            RiskTier::High => self.high += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.safe + self.moderate + self.high
    }
}

/// Aggregate view served by the stats endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    pub total_tokens: u64,
    pub safe_tokens: u64,
    pub moderate_risk: u64,
    pub high_risk: u64,
    pub total_alerts: u64,
    pub recent_alerts: Vec<AlertRecord>,
}

impl ScanStats {
    pub fn new(counts: TierCounts, total_alerts: u64, recent_alerts: Vec<AlertRecord>) -> Self {
        Self {
            total_tokens: counts.total(),
            safe_tokens: counts.safe,
            moderate_risk: counts.moderate,
            high_risk: counts.high,
            total_alerts,
            recent_alerts,
        }
    }
}

/// Event pushed to live subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// An asset passed the active policy and was persisted.
    NewToken(ScoredAsset),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [
            AlertKind::NewToken,
            AlertKind::HighRisk,
            AlertKind::SafeOpportunity,
        ] {
            assert_eq!(kind.as_str().parse::<AlertKind>().unwrap(), kind);
        }
        assert!("rug_pull".parse::<AlertKind>().is_err());
    }

    #[test]
    fn tier_counts_totals() {
        let mut counts = TierCounts::default();
        counts.increment(RiskTier::Safe);
        counts.increment(RiskTier::Safe);
        counts.increment(RiskTier::High);
        assert_eq!(counts.get(RiskTier::Safe), 2);
        assert_eq!(counts.get(RiskTier::Moderate), 0);
        assert_eq!(counts.total(), 3);

        let stats = ScanStats::new(counts, 7, Vec::new());
        assert_eq!(stats.total_tokens, 3);
        assert_eq!(stats.high_risk, 1);
        assert_eq!(stats.total_alerts, 7);
    }

    #[test]
    fn alert_record_serializes_kind_as_alert_type() {
        let alert = AlertRecord::new(
            "addr",
            AlertKind::HighRisk,
            "HIGH RISK: X".into(),
            Utc::now(),
        );
        let value = serde_json::to_value(&alert).unwrap();
        assert_eq!(value["alertType"], "high_risk");
        assert_eq!(value["tokenAddress"], "addr");
    }
}
