//! Durable storage contract for assets and alerts.

use async_trait::async_trait;

use ts_types::alerts::{AlertKind, AlertRecord, TierCounts};
use ts_types::asset::{PersistedAsset, RiskTier};
use ts_types::errors::StoreResult;

/// Keyed asset storage plus an append-only alert log.
///
/// Assets are unique by address: re-upserting an address updates the row in
/// place and must keep the `first_detected` of the first insert. Alerts are
/// never updated or deleted.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert or update by address. Returns the row as stored.
    async fn upsert_asset(&self, asset: PersistedAsset) -> StoreResult<PersistedAsset>;

    /// Look up one asset by address.
    async fn get_asset(&self, address: &str) -> StoreResult<Option<PersistedAsset>>;

    /// Append an alert.
    async fn insert_alert(&self, alert: AlertRecord) -> StoreResult<()>;

    /// Most recently updated assets first, optionally restricted to one tier.
    async fn query_assets(
        &self,
        limit: usize,
        tier: Option<RiskTier>,
    ) -> StoreResult<Vec<PersistedAsset>>;

    /// Most recent alerts first, optionally restricted to one kind.
    async fn query_alerts(
        &self,
        limit: usize,
        kind: Option<AlertKind>,
    ) -> StoreResult<Vec<AlertRecord>>;

    /// Number of stored assets per tier.
    async fn counts_by_tier(&self) -> StoreResult<TierCounts>;

    /// Total number of stored alerts.
    async fn alert_count(&self) -> StoreResult<u64>;

    /// Backend name, for logs.
    fn name(&self) -> &str;
}
