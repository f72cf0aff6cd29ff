use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::PolicyValidationError;

/// Eligibility thresholds and flags a candidate asset must satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    #[serde(with = "rust_decimal::serde::float")]
    pub min_cap: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub max_cap: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub min_volume: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub min_liquidity: Decimal,
    #[serde(rename = "liquidityLocked")]
    pub require_liquidity_locked: bool,
    #[serde(rename = "mintDisabled")]
    pub require_mint_disabled: bool,
    #[serde(rename = "freezeDisabled")]
    pub require_freeze_disabled: bool,
    /// Top-10 holder concentration must stay strictly below this percent.
    #[serde(with = "rust_decimal::serde::float")]
    pub top_holders_limit: Decimal,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            min_cap: Decimal::from(5_000),
            max_cap: Decimal::from(15_000),
            min_volume: Decimal::from(1_000),
            min_liquidity: Decimal::from(3_000),
            require_liquidity_locked: true,
            require_mint_disabled: true,
            require_freeze_disabled: true,
            top_holders_limit: Decimal::from(30),
        }
    }
}

impl Policy {
    /// Shallow field overwrite: fields present in `patch` replace ours, absent
    /// ones keep their current value.
    pub fn merge(&self, patch: &PolicyOverride) -> Policy {
        Policy {
            min_cap: patch.min_cap.unwrap_or(self.min_cap),
            max_cap: patch.max_cap.unwrap_or(self.max_cap),
            min_volume: patch.min_volume.unwrap_or(self.min_volume),
            min_liquidity: patch.min_liquidity.unwrap_or(self.min_liquidity),
            require_liquidity_locked: patch
                .liquidity_locked
                .unwrap_or(self.require_liquidity_locked),
            require_mint_disabled: patch.mint_disabled.unwrap_or(self.require_mint_disabled),
            require_freeze_disabled: patch
                .freeze_disabled
                .unwrap_or(self.require_freeze_disabled),
            top_holders_limit: patch.top_holders_limit.unwrap_or(self.top_holders_limit),
        }
    }

    pub fn validate(&self) -> Result<(), PolicyValidationError> {
        let bounds = [
            ("minCap", self.min_cap),
            ("maxCap", self.max_cap),
            ("minVolume", self.min_volume),
            ("minLiquidity", self.min_liquidity),
            ("topHoldersLimit", self.top_holders_limit),
        ];
        for (field, value) in bounds {
            if value < Decimal::ZERO {
                return Err(PolicyValidationError::Negative {
                    field: field.to_string(),
                    value,
                });
            }
        }

        if self.min_cap > self.max_cap {
            return Err(PolicyValidationError::InvertedCapRange {
                min_cap: self.min_cap,
                max_cap: self.max_cap,
            });
        }

        if self.top_holders_limit > Decimal::ONE_HUNDRED {
            return Err(PolicyValidationError::OutOfRange {
                field: "topHoldersLimit".to_string(),
                value: self.top_holders_limit,
            });
        }

        Ok(())
    }
}

/// Partial policy supplied when a scan session starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyOverride {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub min_cap: Option<Decimal>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub max_cap: Option<Decimal>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub min_volume: Option<Decimal>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub min_liquidity: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liquidity_locked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mint_disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freeze_disabled: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub top_holders_limit: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn merge_keeps_unspecified_fields() {
        let base = Policy::default();
        let patch = PolicyOverride {
            max_cap: Some(dec!(50000)),
            mint_disabled: Some(false),
            ..Default::default()
        };

        let merged = base.merge(&patch);
        assert_eq!(merged.max_cap, dec!(50000));
        assert!(!merged.require_mint_disabled);
        assert_eq!(merged.min_cap, base.min_cap);
        assert_eq!(merged.top_holders_limit, base.top_holders_limit);
        assert!(merged.require_liquidity_locked);
    }

    #[test]
    fn empty_override_is_identity() {
        let base = Policy::default();
        assert_eq!(base.merge(&PolicyOverride::default()), base);
    }

    #[test]
    fn validation_rejects_malformed_policies() {
        assert!(Policy::default().validate().is_ok());

        let inverted = Policy {
            min_cap: dec!(20000),
            ..Policy::default()
        };
        assert!(matches!(
            inverted.validate(),
            Err(PolicyValidationError::InvertedCapRange { .. })
        ));

        let negative = Policy {
            min_liquidity: dec!(-5),
            ..Policy::default()
        };
        assert!(matches!(
            negative.validate(),
            Err(PolicyValidationError::Negative { ref field, .. }) if field == "minLiquidity"
        ));

        let over = Policy {
            top_holders_limit: dec!(101),
            ..Policy::default()
        };
        assert!(matches!(
            over.validate(),
            Err(PolicyValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn override_accepts_client_request_shape() {
        let body =
            r#"{"minCap":5000,"maxCap":15000,"liquidityLocked":false,"topHoldersLimit":25.5}"#;
        let patch: PolicyOverride = serde_json::from_str(body).unwrap();
        assert_eq!(patch.min_cap, Some(dec!(5000)));
        assert_eq!(patch.liquidity_locked, Some(false));
        assert_eq!(patch.top_holders_limit, Some(dec!(25.5)));
        assert!(patch.min_volume.is_none());
    }

    #[test]
    fn policy_thresholds_serialize_as_numbers() {
        let value = serde_json::to_value(Policy::default()).unwrap();
        assert_eq!(value["minCap"], 5000.0);
        assert_eq!(value["topHoldersLimit"], 30.0);
        assert_eq!(value["liquidityLocked"], true);

        let patch = PolicyOverride {
            max_cap: Some(dec!(25000.5)),
            ..Default::default()
        };
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value["maxCap"], 25000.5);
        assert!(value.get("minCap").is_none());
    }
}
