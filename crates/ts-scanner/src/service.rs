//! Control surface over the scan loop, store and hub.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use ts_data::{Feed, Store};
use ts_types::alerts::{AlertKind, AlertRecord, ScanStats};
use ts_types::asset::{PersistedAsset, RiskTier};
use ts_types::errors::{PolicyValidationError, StoreResult};
use ts_types::policy::{Policy, PolicyOverride};

use crate::hub::{NotificationHub, SubscriberId, Subscription};
use crate::scan::{ScanLoop, ScanLoopConfig, ScanPipeline, ScanState, StartOutcome};

/// Number of alerts included in [`ScanStats::recent_alerts`].
pub const RECENT_ALERTS_IN_STATS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStatus {
    pub state: ScanState,
    pub policy: Policy,
    pub interval_secs: u64,
    pub ticks: u64,
    pub subscribers: usize,
}

/// Everything a host needs to drive the scanner.
pub struct ScannerService {
    store: Arc<dyn Store>,
    hub: Arc<NotificationHub>,
    scan: ScanLoop,
}

impl ScannerService {
    pub fn new(feed: Box<dyn Feed>, store: Arc<dyn Store>, config: ScanLoopConfig) -> Self {
        let hub = Arc::new(NotificationHub::new());
        let pipeline = ScanPipeline::new(feed, Arc::clone(&store), Arc::clone(&hub));
        Self {
            store,
            hub,
            scan: ScanLoop::new(pipeline, config),
        }
    }

    pub async fn start_scan(
        &self,
        patch: &PolicyOverride,
    ) -> Result<StartOutcome, PolicyValidationError> {
        self.scan.start(patch).await
    }

    pub async fn stop_scan(&self) -> bool {
        self.scan.stop().await
    }

    pub fn status(&self) -> ScanStatus {
        ScanStatus {
            state: self.scan.state(),
            policy: self.scan.policy(),
            interval_secs: self.scan.config().interval.as_secs(),
            ticks: self.scan.ticks(),
            subscribers: self.hub.subscriber_count(),
        }
    }

    pub async fn recent_assets(
        &self,
        limit: usize,
        tier: Option<RiskTier>,
    ) -> StoreResult<Vec<PersistedAsset>> {
        self.store.query_assets(limit, tier).await
    }

    pub async fn asset(&self, address: &str) -> StoreResult<Option<PersistedAsset>> {
        self.store.get_asset(address).await
    }

    pub async fn recent_alerts(
        &self,
        limit: usize,
        kind: Option<AlertKind>,
    ) -> StoreResult<Vec<AlertRecord>> {
        self.store.query_alerts(limit, kind).await
    }

    pub async fn stats(&self) -> StoreResult<ScanStats> {
        let counts = self.store.counts_by_tier().await?;
        let total_alerts = self.store.alert_count().await?;
        let recent = self
            .store
            .query_alerts(RECENT_ALERTS_IN_STATS, None)
            .await?;
        Ok(ScanStats::new(counts, total_alerts, recent))
    }

    pub fn subscribe(&self, buffer: usize) -> Subscription {
        self.hub.subscribe(buffer)
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.hub.unsubscribe(id)
    }

    pub fn hub(&self) -> &Arc<NotificationHub> {
        &self.hub
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }
}
