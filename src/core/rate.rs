//! Exchange rate record and the fetch capability

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::providers::feed::ParseError;

/// A single published exchange rate.
///
/// `value` keeps the exact decimal text from the feed. `(code, published_at)` is the
/// natural key; timestamps compare by instant, so offsets do not matter for equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate {
    pub code: String,
    pub value: String,
    pub published_at: DateTime<FixedOffset>,
}

impl Rate {
    pub fn new(code: &str, value: &str, published_at: DateTime<FixedOffset>) -> Self {
        Self {
            code: code.to_string(),
            value: value.to_string(),
            published_at,
        }
    }
}

/// Returns true for exactly three upper-case ASCII letters.
pub fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase())
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unexpected status code: {status}")]
    UnexpectedStatus { status: u16 },

    #[error("failed to fetch rates: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to parse rates: {0}")]
    Parse(#[from] ParseError),
}

#[async_trait]
pub trait RateFetcher: Send + Sync {
    /// Returns the rates for `code` in the current feed snapshot. An empty result means
    /// the feed carried no data for that currency.
    async fn fetch(&self, code: &str) -> Result<Vec<Rate>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_code_validation() {
        assert!(is_currency_code("AUD"));
        assert!(!is_currency_code("aud"));
        assert!(!is_currency_code("AU"));
        assert!(!is_currency_code("AUDX"));
        assert!(!is_currency_code("A1D"));
        assert!(!is_currency_code(""));
    }

    #[test]
    fn test_rate_equality_ignores_offset() {
        let local = DateTime::parse_from_rfc3339("2025-10-10T00:00:00+03:00").unwrap();
        let utc = DateTime::parse_from_rfc3339("2025-10-09T21:00:00+00:00").unwrap();

        assert_eq!(
            Rate::new("AUD", "1.76500000", local),
            Rate::new("AUD", "1.76500000", utc)
        );
    }
}
