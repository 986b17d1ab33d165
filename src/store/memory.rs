use crate::core::rate::Rate;
use crate::core::store::{RateStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory rate store, keyed by currency and then by publication instant.
#[derive(Clone, Default)]
pub struct MemoryRateStore {
    inner: Arc<Mutex<HashMap<String, BTreeMap<DateTime<Utc>, Rate>>>>,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rates across all currencies.
    pub async fn len(&self) -> usize {
        let rates = self.inner.lock().await;
        rates.values().map(BTreeMap::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RateStore for MemoryRateStore {
    async fn insert(&self, rate: &Rate) -> Result<(), StoreError> {
        let mut rates = self.inner.lock().await;
        let history = rates.entry(rate.code.clone()).or_default();
        let key = rate.published_at.with_timezone(&Utc);
        if history.contains_key(&key) {
            return Err(StoreError::duplicate(rate));
        }
        history.insert(key, rate.clone());
        debug!(currency = %rate.code, published_at = %rate.published_at, "Stored rate");
        Ok(())
    }

    async fn get_latest(&self, code: &str) -> Result<Rate, StoreError> {
        let rates = self.inner.lock().await;
        rates
            .get(code)
            .and_then(|history| history.values().next_back())
            .cloned()
            .ok_or_else(|| StoreError::not_found(code))
    }

    async fn get_all(&self, code: &str) -> Result<Vec<Rate>, StoreError> {
        let rates = self.inner.lock().await;
        match rates.get(code) {
            Some(history) if !history.is_empty() => Ok(history.values().cloned().collect()),
            _ => Err(StoreError::not_found(code)),
        }
    }
}
