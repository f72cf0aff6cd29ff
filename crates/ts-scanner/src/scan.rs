//! The scan loop: one feed observation per tick, scored, filtered, persisted,
//! alerted and broadcast.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use ts_data::{Feed, Store};
use ts_risk::{AlertClassifier, RiskModel};
use ts_types::alerts::NotificationEvent;
use ts_types::asset::{PersistedAsset, RiskTier};
use ts_types::errors::{PolicyValidationError, TsError};
use ts_types::policy::{Policy, PolicyOverride};

use crate::filter::{Eligibility, EligibilityFilter};
use crate::hub::NotificationHub;

/// Cadence of the scan loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanLoopConfig {
    pub interval: Duration,
}

impl Default for ScanLoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    Started,
    /// A session was already running; the override was not applied.
    AlreadyRunning,
}

/// What a single tick did.
#[derive(Debug)]
pub enum TickOutcome {
    Accepted {
        address: String,
        tier: RiskTier,
        score: u8,
        /// False when the asset was stored but its alert could not be.
        alert_stored: bool,
    },
    Rejected {
        address: String,
        reason: String,
    },
    Failed(TsError),
}

impl TickOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, TickOutcome::Accepted { .. })
    }
}

/// Stateless per-tick pipeline over the feed, store and hub.
pub struct ScanPipeline {
    feed: Mutex<Box<dyn Feed>>,
    store: Arc<dyn Store>,
    hub: Arc<NotificationHub>,
}

impl ScanPipeline {
    pub fn new(feed: Box<dyn Feed>, store: Arc<dyn Store>, hub: Arc<NotificationHub>) -> Self {
        Self {
            feed: Mutex::new(feed),
            store,
            hub,
        }
    }

    /// Let the feed retarget itself at `policy` before a session starts.
    pub async fn follow_policy(&self, policy: &Policy) {
        self.feed.lock().await.follow_policy(policy);
    }

    /// Run one tick against `policy`. Errors are logged and folded into the
    /// outcome; nothing here propagates to the scheduler.
    pub async fn run_tick(&self, policy: &Policy) -> TickOutcome {
        let observation = {
            let mut feed = self.feed.lock().await;
            match feed.next().await {
                Ok(observation) => observation,
                Err(e) => {
                    warn!(feed = feed.name(), error = %e, "feed failed, tick dropped");
                    return TickOutcome::Failed(e.into());
                }
            }
        };

        if let Err(e) = observation.validate() {
            warn!(error = %e, "malformed observation, tick dropped");
            return TickOutcome::Failed(e.into());
        }

        let scored = RiskModel::assess(observation);

        if let Eligibility::Rejected { reason } =
            EligibilityFilter::evaluate(&scored.observation, policy)
        {
            debug!(
                address = %scored.address(),
                score = scored.risk_score,
                reason = %reason,
                "candidate rejected by policy"
            );
            return TickOutcome::Rejected {
                address: scored.address().to_string(),
                reason,
            };
        }

        let detected_at = Utc::now();
        let record = PersistedAsset::detected(scored.clone(), detected_at);
        if let Err(e) = self.store.upsert_asset(record).await {
            error!(
                store = self.store.name(),
                address = %scored.address(),
                error = %e,
                "asset upsert failed, skipping alert and notification"
            );
            return TickOutcome::Failed(e.into());
        }

        let alert = AlertClassifier::classify(&scored, detected_at);
        let alert_kind = alert.kind;
        let alert_stored = match self.store.insert_alert(alert).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    store = self.store.name(),
                    address = %scored.address(),
                    error = %e,
                    "alert insert failed"
                );
                false
            }
        };

        let address = scored.address().to_string();
        let tier = scored.tier;
        let score = scored.risk_score;
        let report = self.hub.broadcast(&NotificationEvent::NewToken(scored));

        info!(
            address = %address,
            tier = %tier,
            score,
            alert = %alert_kind,
            delivered = report.delivered,
            "new token accepted"
        );

        TickOutcome::Accepted {
            address,
            tier,
            score,
            alert_stored,
        }
    }
}

struct Session {
    cancelled: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

impl Session {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.shutdown.notify_one();
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Wait for the session task to exit. Safe to call again if a previous
    /// wait was abandoned.
    async fn join(&mut self) {
        if let Err(e) = (&mut self.task).await {
            warn!(error = %e, "scan task ended abnormally");
        }
    }
}

/// Owned scan state machine: idle or running one scheduled session.
pub struct ScanLoop {
    pipeline: Arc<ScanPipeline>,
    policy: Arc<RwLock<Policy>>,
    config: ScanLoopConfig,
    /// A cancelled session stays here until its task has been joined.
    session: Mutex<Option<Session>>,
    running: AtomicBool,
    ticks: Arc<AtomicU64>,
}

impl ScanLoop {
    pub fn new(pipeline: ScanPipeline, config: ScanLoopConfig) -> Self {
        Self::with_policy(pipeline, config, Policy::default())
    }

    pub fn with_policy(pipeline: ScanPipeline, config: ScanLoopConfig, policy: Policy) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            policy: Arc::new(RwLock::new(policy)),
            config,
            session: Mutex::new(None),
            running: AtomicBool::new(false),
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Running from a successful `start` until cancellation is requested.
    pub fn state(&self) -> ScanState {
        if self.running.load(Ordering::SeqCst) {
            ScanState::Running
        } else {
            ScanState::Idle
        }
    }

    pub fn policy(&self) -> Policy {
        self.policy.read().clone()
    }

    pub fn config(&self) -> ScanLoopConfig {
        self.config
    }

    /// Ticks completed since construction, across sessions.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Merge `patch` into the current policy and start scanning: one tick
    /// immediately, then one per interval.
    ///
    /// The merged policy is validated even when a session is already running,
    /// so a bad override is always reported.
    pub async fn start(
        &self,
        patch: &PolicyOverride,
    ) -> Result<StartOutcome, PolicyValidationError> {
        let mut session = self.session.lock().await;

        let merged = self.policy.read().merge(patch);
        merged.validate()?;

        if let Some(previous) = session.as_mut() {
            if !previous.is_cancelled() {
                debug!("scan already running, start ignored");
                return Ok(StartOutcome::AlreadyRunning);
            }
            // Left behind by an abandoned stop; its last tick must finish
            // before a new session may tick.
            previous.join().await;
            *session = None;
        }

        self.pipeline.follow_policy(&merged).await;
        *self.policy.write() = merged;

        let cancelled = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(Notify::new());
        let task = tokio::spawn(run_session(
            Arc::clone(&self.pipeline),
            Arc::clone(&self.policy),
            self.config.interval.max(Duration::from_millis(1)),
            Arc::clone(&cancelled),
            Arc::clone(&shutdown),
            Arc::clone(&self.ticks),
        ));

        *session = Some(Session {
            cancelled,
            shutdown,
            task,
        });
        self.running.store(true, Ordering::SeqCst);

        info!(interval_ms = self.config.interval.as_millis() as u64, "scan started");
        Ok(StartOutcome::Started)
    }

    /// Cancel the schedule and wait for an in-flight tick to finish. Once this
    /// returns no further tick runs until the next `start`. Returns false if
    /// the loop was already idle.
    ///
    /// Cancellation takes effect before the wait, so dropping this future
    /// mid-wait still leaves the loop idle.
    pub async fn stop(&self) -> bool {
        let mut session = self.session.lock().await;
        let Some(active) = session.as_mut() else {
            return false;
        };

        active.cancel();
        let was_running = self.running.swap(false, Ordering::SeqCst);

        active.join().await;
        *session = None;

        if was_running {
            info!(ticks = self.ticks(), "scan stopped");
        }
        was_running
    }
}

async fn run_session(
    pipeline: Arc<ScanPipeline>,
    policy: Arc<RwLock<Policy>>,
    interval: Duration,
    cancelled: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    ticks: Arc<AtomicU64>,
) {
    let mut timer = tokio::time::interval(interval);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.notified() => break,
            _ = timer.tick() => {}
        }
        if cancelled.load(Ordering::SeqCst) {
            break;
        }

        let snapshot = policy.read().clone();
        pipeline.run_tick(&snapshot).await;
        ticks.fetch_add(1, Ordering::SeqCst);
    }
}
