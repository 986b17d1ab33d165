//! Core business logic abstractions

pub mod config;
pub mod log;
pub mod rate;
pub mod store;
pub mod sync;

// Re-export main types for cleaner imports
pub use rate::{FetchError, Rate, RateFetcher};
pub use store::{RateStore, StoreError};
pub use sync::{CurrencyOutcome, SyncReport, sync};
