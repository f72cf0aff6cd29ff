use rust_decimal::Decimal;
use thiserror::Error;

/// Why a scan tick produced nothing.
#[derive(Error, Debug)]
pub enum TsError {
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Observation acquisition failed for one scan tick.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Feed unavailable: {message}")]
    Unavailable { message: String },

    #[error("Malformed observation for {address}: {message}")]
    Malformed { address: String, message: String },

    #[error("Feed exhausted")]
    Exhausted,
}

/// Persistence failed.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Query execution failed: {query}, error: {error}")]
    QueryFailed { query: String, error: String },

    #[error("Stored record is corrupt: {message}")]
    Corruption { message: String },

    #[error("Store unavailable: {message}")]
    Unavailable { message: String },
}

/// One subscriber could not be reached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Subscriber {subscriber_id} is closed")]
    Closed { subscriber_id: u64 },

    #[error("Subscriber {subscriber_id} buffer is full")]
    Backpressure { subscriber_id: u64 },

    #[error("Delivery to subscriber {subscriber_id} failed: {message}")]
    Failed { subscriber_id: u64, message: String },
}

/// A policy override was rejected before the scan started.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyValidationError {
    #[error("{field} must be non-negative, got {value}")]
    Negative { field: String, value: Decimal },

    #[error("minCap {min_cap} exceeds maxCap {max_cap}")]
    InvertedCapRange { min_cap: Decimal, max_cap: Decimal },

    #[error("{field} out of range [0, 100]: {value}")]
    OutOfRange { field: String, value: Decimal },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
