//! Policy-driven eligibility checks for candidate observations.

use rust_decimal::Decimal;
use tracing::trace;

use ts_types::asset::AssetObservation;
use ts_types::policy::Policy;

/// Result of an eligibility check: the observation is either accepted or
/// rejected with a human-readable reason.
#[derive(Debug, Clone, PartialEq)]
pub enum Eligibility {
    Accepted,
    Rejected { reason: String },
}

impl Eligibility {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Eligibility::Accepted)
    }
}

/// Pure conjunction of the policy checks. Scoring is a separate pass; the
/// filter only looks at the raw observation.
#[derive(Debug, Clone, Copy, Default)]
pub struct EligibilityFilter;

impl EligibilityFilter {
    pub fn passes(observation: &AssetObservation, policy: &Policy) -> bool {
        Self::evaluate(observation, policy).is_accepted()
    }

    /// Run all checks in order, short-circuiting on the first rejection.
    pub fn evaluate(observation: &AssetObservation, policy: &Policy) -> Eligibility {
        let result = Self::run_checks(observation, policy);
        if let Eligibility::Rejected { ref reason } = result {
            trace!(address = %observation.address, reason = %reason, "observation rejected");
        }
        result
    }

    fn run_checks(observation: &AssetObservation, policy: &Policy) -> Eligibility {
        let cap = observation.market_cap;
        if cap < policy.min_cap || cap > policy.max_cap {
            return rejected(format!(
                "market cap {cap} outside [{}, {}]",
                policy.min_cap, policy.max_cap
            ));
        }

        if let Some(reason) = below("volume", observation.volume_24h, policy.min_volume) {
            return Eligibility::Rejected { reason };
        }

        if let Some(reason) = below("liquidity", observation.liquidity, policy.min_liquidity) {
            return Eligibility::Rejected { reason };
        }

        let security = &observation.security;
        if policy.require_liquidity_locked && !security.liquidity_locked {
            return rejected("liquidity is not locked".into());
        }
        if policy.require_mint_disabled && !security.mint_disabled {
            return rejected("mint authority is not disabled".into());
        }
        if policy.require_freeze_disabled && !security.freeze_disabled {
            return rejected("freeze authority is not disabled".into());
        }

        if security.top10_holders >= policy.top_holders_limit {
            return rejected(format!(
                "top-10 holders hold {}%, limit {}%",
                security.top10_holders, policy.top_holders_limit
            ));
        }

        Eligibility::Accepted
    }
}

fn rejected(reason: String) -> Eligibility {
    Eligibility::Rejected { reason }
}

fn below(what: &str, value: Decimal, minimum: Decimal) -> Option<String> {
    (value < minimum).then(|| format!("{what} {value} below minimum {minimum}"))
}
