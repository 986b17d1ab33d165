use crate::core::rate::{FetchError, Rate, RateFetcher};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Serves a canned feed snapshot instead of calling the network.
#[derive(Default)]
pub struct StaticFetcher {
    rates: Vec<Rate>,
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl StaticFetcher {
    pub fn new(rates: Vec<Rate>) -> Self {
        Self {
            rates,
            ..Default::default()
        }
    }

    /// Makes every fetch for `code` fail as if the feed answered 503.
    pub fn failing_for(mut self, code: &str) -> Self {
        self.failing.insert(code.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateFetcher for StaticFetcher {
    async fn fetch(&self, code: &str) -> Result<Vec<Rate>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(code) {
            return Err(FetchError::UnexpectedStatus { status: 503 });
        }

        Ok(self
            .rates
            .iter()
            .filter(|rate| rate.code == code)
            .cloned()
            .collect())
    }
}
