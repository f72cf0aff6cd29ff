//! Scanning core for TokenScope.
//!
//! Provides:
//! - Policy-driven eligibility filtering
//! - The scheduled scan loop and its per-tick pipeline
//! - Live notification fan-out to subscribers
//! - [`ScannerService`], the control surface used by hosts

pub mod filter;
pub mod hub;
pub mod scan;
pub mod service;

pub use filter::{Eligibility, EligibilityFilter};
pub use hub::{BroadcastReport, NotificationHub, SubscriberId, SubscriberSink, Subscription};
pub use scan::{ScanLoop, ScanLoopConfig, ScanPipeline, ScanState, StartOutcome, TickOutcome};
pub use service::{ScanStatus, ScannerService, RECENT_ALERTS_IN_STATS};
