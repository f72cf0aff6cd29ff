//! Candidate-asset feeds.
//!
//! A [`Feed`] hands the scan loop one [`AssetObservation`] per tick. The
//! simulated feed stands in for a live market-data client; the replay feed
//! plays back recorded observations.

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ts_types::asset::{AssetObservation, SecuritySnapshot};
use ts_types::errors::FeedError;
use ts_types::policy::Policy;

/// Source of candidate observations.
#[async_trait]
pub trait Feed: Send + Sync + std::fmt::Debug {
    /// Produce the next observation. Failure aborts only the current tick.
    async fn next(&mut self) -> Result<AssetObservation, FeedError>;

    /// Get feed name
    fn name(&self) -> &str;

    /// Called when a scan starts with `policy`. Feeds that generate data may
    /// retarget their ranges; recorded feeds ignore it.
    fn follow_policy(&mut self, _policy: &Policy) {}
}

const TOKEN_NAMES: [&str; 18] = [
    "PEPE2.0", "BONK", "DOGWIFHAT", "SAMO", "COPE", "ROPE", "HODL", "MOON", "ROCKET", "DEGEN",
    "WOJAK", "CHAD", "BASED", "GIGA", "SIGMA", "ALPHA", "MEME", "SHIB2",
];

const ADDRESS_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz123456789";
const ADDRESS_LEN: usize = 44;

/// Value ranges for generated observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub min_cap: Decimal,
    pub max_cap: Decimal,
    pub min_volume: Decimal,
    /// Volume is drawn from `min_volume + U(0, volume_spread)`.
    pub volume_spread: Decimal,
    pub min_liquidity: Decimal,
    /// Liquidity is drawn from `min_liquidity + U(0, liquidity_spread)`.
    pub liquidity_spread: Decimal,
    pub p_liquidity_locked: f64,
    pub p_mint_disabled: f64,
    pub p_freeze_disabled: f64,
    /// Fixed seed for reproducible runs; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            min_cap: Decimal::from(5_000),
            max_cap: Decimal::from(15_000),
            min_volume: Decimal::from(1_000),
            volume_spread: Decimal::from(20_000),
            min_liquidity: Decimal::from(3_000),
            liquidity_spread: Decimal::from(10_000),
            p_liquidity_locked: 0.7,
            p_mint_disabled: 0.8,
            p_freeze_disabled: 0.75,
            seed: None,
        }
    }
}

/// Generates plausible new-token observations.
#[derive(Debug)]
pub struct SimulatedFeed {
    config: SimulationConfig,
    rng: StdRng,
    generated: u64,
}

impl SimulatedFeed {
    pub fn new(config: SimulationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            config,
            rng,
            generated: 0,
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::new(SimulationConfig {
            seed: Some(seed),
            ..Default::default()
        })
    }

    /// Number of observations produced so far.
    pub fn generated(&self) -> u64 {
        self.generated
    }

    fn uniform(&mut self, low: f64, high: f64) -> Decimal {
        let value = if high > low {
            self.rng.random_range(low..high)
        } else {
            low
        };
        Decimal::from_f64(value).unwrap_or_default().round_dp(2)
    }

    fn spread(&mut self, base: Decimal, spread: Decimal) -> Decimal {
        let offset = self.uniform(0.0, to_f64(spread));
        base + offset
    }

    fn address(&mut self) -> String {
        (0..ADDRESS_LEN)
            .map(|_| {
                let idx = self.rng.random_range(0..ADDRESS_ALPHABET.len());
                ADDRESS_ALPHABET[idx] as char
            })
            .collect()
    }

    fn generate(&mut self) -> AssetObservation {
        let name = TOKEN_NAMES[self.rng.random_range(0..TOKEN_NAMES.len())].to_string();
        let symbol: String = name.chars().take(4).collect::<String>().to_uppercase();

        let market_cap = self.uniform(to_f64(self.config.min_cap), to_f64(self.config.max_cap));
        let volume_24h = self.spread(self.config.min_volume, self.config.volume_spread);
        let liquidity = self.spread(self.config.min_liquidity, self.config.liquidity_spread);

        let security = SecuritySnapshot {
            liquidity_locked: self.rng.random_bool(self.config.p_liquidity_locked),
            mint_disabled: self.rng.random_bool(self.config.p_mint_disabled),
            freeze_disabled: self.rng.random_bool(self.config.p_freeze_disabled),
            top10_holders: self.uniform(15.0, 55.0),
            contract_age: self.uniform(0.0, 48.0),
        };

        AssetObservation {
            address: self.address(),
            name,
            symbol,
            market_cap,
            volume_24h,
            liquidity,
            price_change_24h: self.uniform(-10.0, 30.0),
            holders: self.rng.random_range(100..1000),
            security,
            timestamp: Utc::now(),
        }
    }
}

impl Default for SimulatedFeed {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

#[async_trait]
impl Feed for SimulatedFeed {
    async fn next(&mut self) -> Result<AssetObservation, FeedError> {
        self.generated += 1;
        Ok(self.generate())
    }

    fn name(&self) -> &str {
        "simulated"
    }

    /// Generate within the policy's cap window and at or above its volume and
    /// liquidity floors. Spreads and flag probabilities are kept.
    fn follow_policy(&mut self, policy: &Policy) {
        self.config.min_cap = policy.min_cap;
        self.config.max_cap = policy.max_cap;
        self.config.min_volume = policy.min_volume;
        self.config.min_liquidity = policy.min_liquidity;
        tracing::debug!(
            min_cap = %policy.min_cap,
            max_cap = %policy.max_cap,
            "simulated feed following policy"
        );
    }
}

/// Plays back a fixed sequence of observations, then reports exhaustion.
#[derive(Debug)]
pub struct ReplayFeed {
    name: String,
    queue: VecDeque<AssetObservation>,
    restamp: bool,
}

impl ReplayFeed {
    pub fn new(observations: Vec<AssetObservation>) -> Self {
        Self {
            name: "replay".to_string(),
            queue: observations.into(),
            restamp: false,
        }
    }

    /// Load one JSON-encoded observation per line. Blank lines are skipped.
    pub fn from_json_lines<P: AsRef<Path>>(path: P) -> Result<Self, FeedError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| FeedError::Unavailable {
            message: format!("cannot open {}: {e}", path.display()),
        })?;

        let mut observations = Vec::new();
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| FeedError::Unavailable {
                message: format!("read error in {}: {e}", path.display()),
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let observation: AssetObservation =
                serde_json::from_str(&line).map_err(|e| FeedError::Malformed {
                    address: format!("{}:{}", path.display(), line_no + 1),
                    message: e.to_string(),
                })?;
            observations.push(observation);
        }

        tracing::debug!(
            path = %path.display(),
            count = observations.len(),
            "loaded replay observations"
        );

        Ok(Self {
            name: format!("replay:{}", path.display()),
            queue: observations.into(),
            restamp: false,
        })
    }

    /// Replace recorded timestamps with the time of replay.
    pub fn restamped(mut self) -> Self {
        self.restamp = true;
        self
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

#[async_trait]
impl Feed for ReplayFeed {
    async fn next(&mut self) -> Result<AssetObservation, FeedError> {
        let mut observation = self.queue.pop_front().ok_or(FeedError::Exhausted)?;
        if self.restamp {
            observation.timestamp = Utc::now();
        }
        Ok(observation)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn to_f64(value: Decimal) -> f64 {
    use rust_decimal::prelude::ToPrimitive;
    value.to_f64().unwrap_or(0.0)
}
