//! Observation feeds and persistence for TokenScope.
//!
//! Provides:
//! - The [`Feed`] contract with simulated and replay implementations
//! - The [`Store`] contract with in-memory and DuckDB backends

pub mod feed;
pub mod memory;
pub mod store;

#[cfg(feature = "duckdb")]
pub mod duckdb_store;

#[cfg(test)]
pub(crate) mod testing;

pub use feed::{Feed, ReplayFeed, SimulatedFeed, SimulationConfig};
pub use memory::MemoryStore;
pub use store::Store;

#[cfg(feature = "duckdb")]
pub use duckdb_store::DuckDbStore;
