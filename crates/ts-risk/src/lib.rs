//! Risk scoring and alert classification for TokenScope.
//!
//! Provides:
//! - A deterministic score/tier model over contract security attributes
//! - Alert classification for assets accepted by the eligibility policy

pub mod classifier;
pub mod score;

pub use classifier::AlertClassifier;
pub use score::{Penalty, RiskAssessment, RiskFactor, RiskModel};
