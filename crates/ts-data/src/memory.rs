use std::cmp::Reverse;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;

use ts_types::alerts::{AlertKind, AlertRecord, TierCounts};
use ts_types::asset::{PersistedAsset, RiskTier};
use ts_types::errors::StoreResult;

use crate::store::Store;

/// Stored asset plus its write sequence, used to order equal timestamps.
#[derive(Debug, Clone)]
struct AssetEntry {
    record: PersistedAsset,
    seq: u64,
}

/// In-process store for tests and single-process deployments without a
/// database file.
#[derive(Debug, Default)]
pub struct MemoryStore {
    assets: DashMap<String, AssetEntry>,
    alerts: RwLock<Vec<AlertRecord>>,
    write_seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    fn next_seq(&self) -> u64 {
        self.write_seq.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_asset(&self, asset: PersistedAsset) -> StoreResult<PersistedAsset> {
        let seq = self.next_seq();

        let stored = match self.assets.entry(asset.address().to_string()) {
            Entry::Occupied(mut entry) => {
                let mut record = asset;
                record.first_detected = entry.get().record.first_detected;
                entry.insert(AssetEntry {
                    record: record.clone(),
                    seq,
                });
                record
            }
            Entry::Vacant(entry) => {
                entry.insert(AssetEntry {
                    record: asset.clone(),
                    seq,
                });
                asset
            }
        };

        tracing::trace!(address = %stored.address(), seq, "asset upserted");
        Ok(stored)
    }

    async fn get_asset(&self, address: &str) -> StoreResult<Option<PersistedAsset>> {
        Ok(self.assets.get(address).map(|entry| entry.record.clone()))
    }

    async fn insert_alert(&self, alert: AlertRecord) -> StoreResult<()> {
        self.alerts.write().push(alert);
        Ok(())
    }

    async fn query_assets(
        &self,
        limit: usize,
        tier: Option<RiskTier>,
    ) -> StoreResult<Vec<PersistedAsset>> {
        let mut matching: Vec<AssetEntry> = self
            .assets
            .iter()
            .filter(|entry| tier.map_or(true, |t| entry.record.tier() == t))
            .map(|entry| entry.value().clone())
            .collect();

        matching.sort_by_key(|entry| Reverse((entry.record.last_updated, entry.seq)));

        Ok(matching
            .into_iter()
            .take(limit)
            .map(|entry| entry.record)
            .collect())
    }

    async fn query_alerts(
        &self,
        limit: usize,
        kind: Option<AlertKind>,
    ) -> StoreResult<Vec<AlertRecord>> {
        let alerts = self.alerts.read();
        let mut matching: Vec<(usize, &AlertRecord)> = alerts
            .iter()
            .enumerate()
            .filter(|(_, alert)| kind.map_or(true, |k| alert.kind == k))
            .collect();

        matching.sort_by_key(|(idx, alert)| Reverse((alert.timestamp, *idx)));

        Ok(matching
            .into_iter()
            .take(limit)
            .map(|(_, alert)| alert.clone())
            .collect())
    }

    async fn counts_by_tier(&self) -> StoreResult<TierCounts> {
        let mut counts = TierCounts::default();
        for entry in self.assets.iter() {
            counts.increment(entry.record.tier());
        }
        Ok(counts)
    }

    async fn alert_count(&self) -> StoreResult<u64> {
        Ok(self.alerts.read().len() as u64)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
