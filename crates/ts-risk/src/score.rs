//! Risk score computation.
//!
//! [`RiskModel`] maps a [`SecuritySnapshot`] to a bounded score and a
//! [`RiskTier`]. It is a pure function of the snapshot: no clock, no state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ts_types::asset::{AssetObservation, RiskTier, ScoredAsset, SecuritySnapshot};

/// Condition that cost the asset points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    LiquidityUnlocked,
    MintAuthorityActive,
    FreezeAuthorityActive,
    HolderConcentration,
    ContractAge,
}

/// A single deduction from the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Penalty {
    pub factor: RiskFactor,
    pub points: u8,
}

/// Result of scoring one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Final score in `[0, 100]`.
    pub score: u8,
    pub tier: RiskTier,
    /// Deductions in the order they were applied.
    pub penalties: Vec<Penalty>,
}

/// Stateless scoring model.
///
/// Starts at [`RiskModel::BASELINE`] and subtracts a fixed penalty for each
/// failed condition. Liquidity and volume travel with the observation but are
/// not scored; a richer model would extend [`RiskModel::assess`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskModel;

impl RiskModel {
    pub const BASELINE: i32 = 100;

    pub const LIQUIDITY_UNLOCKED_PENALTY: u8 = 30;
    pub const MINT_ACTIVE_PENALTY: u8 = 25;
    pub const FREEZE_ACTIVE_PENALTY: u8 = 20;

    /// Minimum score for [`RiskTier::Safe`].
    pub const SAFE_THRESHOLD: u8 = 70;
    /// Minimum score for [`RiskTier::Moderate`].
    pub const MODERATE_THRESHOLD: u8 = 40;

    /// Score a security snapshot.
    pub fn score(snapshot: &SecuritySnapshot) -> RiskAssessment {
        let mut penalties = Vec::new();

        if !snapshot.liquidity_locked {
            penalties.push(Penalty {
                factor: RiskFactor::LiquidityUnlocked,
                points: Self::LIQUIDITY_UNLOCKED_PENALTY,
            });
        }
        if !snapshot.mint_disabled {
            penalties.push(Penalty {
                factor: RiskFactor::MintAuthorityActive,
                points: Self::MINT_ACTIVE_PENALTY,
            });
        }
        if !snapshot.freeze_disabled {
            penalties.push(Penalty {
                factor: RiskFactor::FreezeAuthorityActive,
                points: Self::FREEZE_ACTIVE_PENALTY,
            });
        }

        let concentration = Self::concentration_penalty(snapshot.top10_holders);
        if concentration > 0 {
            penalties.push(Penalty {
                factor: RiskFactor::HolderConcentration,
                points: concentration,
            });
        }

        let age = Self::age_penalty(snapshot.contract_age);
        if age > 0 {
            penalties.push(Penalty {
                factor: RiskFactor::ContractAge,
                points: age,
            });
        }

        let deducted: i32 = penalties.iter().map(|p| i32::from(p.points)).sum();
        let score = (Self::BASELINE - deducted).clamp(0, 100) as u8;

        RiskAssessment {
            score,
            tier: Self::tier_for(score),
            penalties,
        }
    }

    /// Tier for a final score: `>= 70` safe, `>= 40` moderate, else high.
    pub fn tier_for(score: u8) -> RiskTier {
        if score >= Self::SAFE_THRESHOLD {
            RiskTier::Safe
        } else if score >= Self::MODERATE_THRESHOLD {
            RiskTier::Moderate
        } else {
            RiskTier::High
        }
    }

    /// Score an observation and attach the result.
    pub fn assess(observation: AssetObservation) -> ScoredAsset {
        let assessment = Self::score(&observation.security);
        ScoredAsset {
            observation,
            risk_score: assessment.score,
            tier: assessment.tier,
        }
    }

    fn concentration_penalty(top10_holders: Decimal) -> u8 {
        if top10_holders > Decimal::from(30) {
            15
        } else if top10_holders > Decimal::from(25) {
            10
        } else if top10_holders > Decimal::from(20) {
            5
        } else {
            0
        }
    }

    fn age_penalty(contract_age_hours: Decimal) -> u8 {
        if contract_age_hours < Decimal::ONE {
            10
        } else if contract_age_hours < Decimal::from(6) {
            5
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot(
        locked: bool,
        mint_disabled: bool,
        freeze_disabled: bool,
        concentration: Decimal,
        age: Decimal,
    ) -> SecuritySnapshot {
        SecuritySnapshot {
            liquidity_locked: locked,
            mint_disabled,
            freeze_disabled,
            top10_holders: concentration,
            contract_age: age,
        }
    }

    fn grid() -> Vec<SecuritySnapshot> {
        let concentrations = [
            dec!(0),
            dec!(15),
            dec!(20),
            dec!(20.01),
            dec!(25),
            dec!(26),
            dec!(30),
            dec!(30.5),
            dec!(100),
        ];
        let ages = [dec!(0), dec!(0.5), dec!(1), dec!(5.99), dec!(6), dec!(48)];
        let mut out = Vec::new();
        for bits in 0..8u8 {
            for c in concentrations {
                for a in ages {
                    out.push(snapshot(bits & 1 != 0, bits & 2 != 0, bits & 4 != 0, c, a));
                }
            }
        }
        out
    }

    #[test]
    fn score_is_bounded_and_tier_follows_thresholds() {
        for snap in grid() {
            let result = RiskModel::score(&snap);
            assert!(result.score <= 100);
            let expected = match result.score {
                70..=100 => RiskTier::Safe,
                40..=69 => RiskTier::Moderate,
                _ => RiskTier::High,
            };
            assert_eq!(result.tier, expected, "snapshot {snap:?}");
            assert_eq!(RiskModel::score(&snap), result);
        }
    }

    #[test]
    fn tier_is_monotone_in_score() {
        let mut previous = RiskModel::tier_for(0);
        for score in 1..=100u8 {
            let tier = RiskModel::tier_for(score);
            // Safe < Moderate < High in declaration order, so risk only drops.
            assert!(tier <= previous, "score {score}");
            previous = tier;
        }
        assert_eq!(RiskModel::tier_for(69), RiskTier::Moderate);
        assert_eq!(RiskModel::tier_for(70), RiskTier::Safe);
        assert_eq!(RiskModel::tier_for(39), RiskTier::High);
        assert_eq!(RiskModel::tier_for(40), RiskTier::Moderate);
    }

    #[test]
    fn clean_snapshots_score_full_marks() {
        for c in [dec!(0), dec!(10), dec!(20)] {
            for a in [dec!(6), dec!(12), dec!(1000)] {
                let result = RiskModel::score(&snapshot(true, true, true, c, a));
                assert_eq!(result.score, 100);
                assert_eq!(result.tier, RiskTier::Safe);
                assert!(result.penalties.is_empty());
            }
        }
    }

    #[test]
    fn every_check_failing_floors_at_zero() {
        let result = RiskModel::score(&snapshot(false, false, false, dec!(35), dec!(0.5)));
        assert_eq!(result.score, 0);
        assert_eq!(result.tier, RiskTier::High);
        let factors: Vec<RiskFactor> = result.penalties.iter().map(|p| p.factor).collect();
        assert_eq!(
            factors,
            vec![
                RiskFactor::LiquidityUnlocked,
                RiskFactor::MintAuthorityActive,
                RiskFactor::FreezeAuthorityActive,
                RiskFactor::HolderConcentration,
                RiskFactor::ContractAge,
            ]
        );
    }

    #[test]
    fn unsafe_authorities_without_other_penalties() {
        // 100 - 30 - 25 - 20 = 25
        let result = RiskModel::score(&snapshot(false, false, false, dec!(10), dec!(24)));
        assert_eq!(result.score, 25);
        assert_eq!(result.tier, RiskTier::High);
    }

    #[test]
    fn concentration_and_age_bands() {
        let cases = [
            (dec!(20), dec!(6), 100),
            (dec!(20.5), dec!(6), 95),
            (dec!(25), dec!(6), 95),
            (dec!(25.1), dec!(6), 90),
            (dec!(30), dec!(6), 90),
            (dec!(31), dec!(6), 85),
            (dec!(10), dec!(5.9), 95),
            (dec!(10), dec!(0.99), 90),
            (dec!(31), dec!(0), 75),
        ];
        for (concentration, age, expected) in cases {
            let result = RiskModel::score(&snapshot(true, true, true, concentration, age));
            assert_eq!(result.score, expected, "concentration {concentration}, age {age}");
        }
    }

    #[test]
    fn mint_active_lands_in_moderate_band() {
        // 100 - 30 - 25 = 45
        let result = RiskModel::score(&snapshot(false, false, true, dec!(5), dec!(10)));
        assert_eq!(result.score, 45);
        assert_eq!(result.tier, RiskTier::Moderate);
    }
}
