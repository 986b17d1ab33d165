//! Rate persistence abstractions

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use thiserror::Error;

use super::rate::Rate;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A row with the same `(code, published_at)` already exists.
    #[error("duplicate entry for {code} at {published_at}")]
    Duplicate {
        code: String,
        published_at: DateTime<FixedOffset>,
    },

    #[error("no rates stored for {code}")]
    NotFound { code: String },

    #[error("storage backend error: {0}")]
    Backend(#[source] BoxError),
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        StoreError::Backend(err.into())
    }

    pub fn duplicate(rate: &Rate) -> Self {
        StoreError::Duplicate {
            code: rate.code.clone(),
            published_at: rate.published_at,
        }
    }

    pub fn not_found(code: &str) -> Self {
        StoreError::NotFound {
            code: code.to_string(),
        }
    }
}

/// Durable rate storage. Implementations enforce the `(code, published_at)` uniqueness
/// themselves and must accept concurrent inserts without caller-side locking.
#[async_trait]
pub trait RateStore: Send + Sync {
    /// Persists `rate`, or fails with [`StoreError::Duplicate`] if its natural key exists.
    async fn insert(&self, rate: &Rate) -> Result<(), StoreError>;

    /// Returns the rate with the greatest `published_at` for `code`.
    async fn get_latest(&self, code: &str) -> Result<Rate, StoreError>;

    /// Returns every stored rate for `code`, oldest first. A code with no rows is
    /// reported as [`StoreError::NotFound`], same as an unknown code.
    async fn get_all(&self, code: &str) -> Result<Vec<Rate>, StoreError>;
}
