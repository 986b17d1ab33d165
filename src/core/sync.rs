//! Fetches rates for a set of currencies concurrently and stores them.

use super::rate::{Rate, RateFetcher};
use super::store::{RateStore, StoreError};
use futures::future::join_all;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Result of syncing a single currency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CurrencyOutcome {
    pub code: String,
    pub fetched: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub failed: usize,
    /// Set when the fetch itself failed; no rates were stored in that case.
    pub error: Option<String>,
    pub cancelled: bool,
}

impl CurrencyOutcome {
    fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.failed == 0 && !self.cancelled
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub outcomes: Vec<CurrencyOutcome>,
}

impl SyncReport {
    pub fn outcome(&self, code: &str) -> Option<&CurrencyOutcome> {
        self.outcomes.iter().find(|o| o.code == code)
    }

    pub fn inserted(&self) -> usize {
        self.outcomes.iter().map(|o| o.inserted).sum()
    }

    pub fn duplicates(&self) -> usize {
        self.outcomes.iter().map(|o| o.duplicates).sum()
    }

    /// Currencies whose fetch failed, had a failed insert or were cancelled.
    pub fn failed_currencies(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| o.code.as_str())
            .collect()
    }
}

/// Syncs every currency in `codes` and waits for all of them to finish.
///
/// A failure for one currency never stops the others. Cancelling `cancel` makes every
/// in-flight currency stop at its next fetch or insert.
pub async fn sync(
    store: &dyn RateStore,
    fetcher: &dyn RateFetcher,
    codes: &[String],
    cancel: &CancellationToken,
) -> SyncReport {
    sync_with_progress(store, fetcher, codes, cancel, &|_: &CurrencyOutcome| {}).await
}

/// Same as [`sync`], calling `on_complete` as each currency finishes.
pub async fn sync_with_progress(
    store: &dyn RateStore,
    fetcher: &dyn RateFetcher,
    codes: &[String],
    cancel: &CancellationToken,
    on_complete: &(dyn Fn(&CurrencyOutcome) + Sync),
) -> SyncReport {
    let mut unique: Vec<&str> = Vec::with_capacity(codes.len());
    for code in codes {
        if !unique.contains(&code.as_str()) {
            unique.push(code);
        }
    }

    info!(currency_count = unique.len(), "Starting syncing currencies");

    let futures = unique.into_iter().map(|code| async move {
        let outcome = sync_currency(store, fetcher, code, cancel).await;
        on_complete(&outcome);
        outcome
    });
    let outcomes = join_all(futures).await;

    let report = SyncReport { outcomes };
    info!(
        inserted = report.inserted(),
        duplicates = report.duplicates(),
        failed = report.failed_currencies().len(),
        "Finished syncing currencies"
    );
    report
}

async fn sync_currency(
    store: &dyn RateStore,
    fetcher: &dyn RateFetcher,
    code: &str,
    cancel: &CancellationToken,
) -> CurrencyOutcome {
    let mut outcome = CurrencyOutcome::new(code);
    info!(currency = %code, "Syncing currency");

    let fetched = tokio::select! {
        biased;
        () = cancel.cancelled() => None,
        result = fetcher.fetch(code) => Some(result),
    };
    let rates = match fetched {
        None => {
            warn!(currency = %code, "Sync cancelled before fetch completed");
            outcome.cancelled = true;
            return outcome;
        }
        Some(Err(e)) => {
            error!(currency = %code, error = %e, "Failed to fetch rate");
            outcome.error = Some(e.to_string());
            return outcome;
        }
        Some(Ok(rates)) => rates,
    };

    outcome.fetched = rates.len();
    if rates.is_empty() {
        warn!(currency = %code, "Feed has no rates for currency");
    }

    debug!(currency = %code, rate_count = rates.len(), "Storing rates to database");
    for rate in &rates {
        let stored = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = store.insert(rate) => Some(result),
        };
        match stored {
            None => {
                warn!(currency = %code, "Sync cancelled while storing rates");
                outcome.cancelled = true;
                break;
            }
            Some(result) => record_insert(&mut outcome, rate, result),
        }
    }

    outcome
}

fn record_insert(outcome: &mut CurrencyOutcome, rate: &Rate, result: Result<(), StoreError>) {
    match result {
        Ok(()) => outcome.inserted += 1,
        Err(StoreError::Duplicate { .. }) => {
            debug!(currency = %rate.code, published_at = %rate.published_at, "Rate already exists in database");
            outcome.duplicates += 1;
        }
        Err(e) => {
            error!(
                currency = %rate.code,
                published_at = %rate.published_at,
                error = %e,
                "Failed to store rate"
            );
            outcome.failed += 1;
        }
    }
}
