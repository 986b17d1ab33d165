//! Parser for the RSS exchange rate feed.
//!
//! Each `<item>` carries one publication date and a description made of
//! space-separated `CODE VALUE` pairs:
//!
//! ```text
//! <item>
//!   <pubDate>Fri, 10 Oct 2025 00:00:00 +0300</pubDate>
//!   <description>AUD 1.76500000 BGN 1.95580000</description>
//! </item>
//! ```

use chrono::{DateTime, FixedOffset};
use quick_xml::de::DeError;
use serde::Deserialize;
use thiserror::Error;

use crate::core::rate::{Rate, is_currency_code};

/// RFC 1123 with a numeric zone, as used by `pubDate`.
pub const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed feed document: {0}")]
    MalformedDocument(#[from] DeError),

    #[error("no rates found")]
    EmptyFeed,

    #[error("failed to parse publication date '{value}': {source}")]
    BadTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("invalid rate format: '{description}'")]
    InvalidRateFormat { description: String },

    #[error("invalid currency code: '{0}'")]
    InvalidCurrencyCode(String),

    #[error("invalid value '{value}' for {code}")]
    InvalidValue { code: String, value: String },
}

#[derive(Debug, Deserialize)]
struct RssFeed {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(rename = "pubDate", default)]
    pub_date: String,
    #[serde(default)]
    description: String,
}

/// Parses a raw feed document into rates, in document order.
///
/// The whole document fails on the first bad item; no partial result is returned.
pub fn parse(document: &[u8]) -> Result<Vec<Rate>, ParseError> {
    let text = std::str::from_utf8(document)
        .map_err(|e| DeError::Custom(format!("document is not valid UTF-8: {e}")))?;
    let feed: RssFeed = quick_xml::de::from_str(text)?;

    if feed.channel.items.is_empty() {
        return Err(ParseError::EmptyFeed);
    }

    let mut rates = Vec::new();
    for item in &feed.channel.items {
        let published_at = parse_pub_date(&item.pub_date)?;
        parse_description(&item.description, published_at, &mut rates)?;
    }

    Ok(rates)
}

fn parse_pub_date(value: &str) -> Result<DateTime<FixedOffset>, ParseError> {
    DateTime::parse_from_str(value.trim(), PUB_DATE_FORMAT).map_err(|source| {
        ParseError::BadTimestamp {
            value: value.to_string(),
            source,
        }
    })
}

fn parse_description(
    description: &str,
    published_at: DateTime<FixedOffset>,
    rates: &mut Vec<Rate>,
) -> Result<(), ParseError> {
    let tokens: Vec<&str> = description.trim().split(' ').collect();
    if tokens.len() < 2 || tokens.len() % 2 != 0 {
        return Err(ParseError::InvalidRateFormat {
            description: description.to_string(),
        });
    }

    for pair in tokens.chunks_exact(2) {
        let (code, value) = (pair[0], pair[1]);

        if !is_currency_code(code) {
            return Err(ParseError::InvalidCurrencyCode(code.to_string()));
        }
        if !is_decimal(value) {
            return Err(ParseError::InvalidValue {
                code: code.to_string(),
                value: value.to_string(),
            });
        }

        rates.push(Rate::new(code, value, published_at));
    }

    Ok(())
}

/// Accepts `[+-]digits[.digits]` of any length; the text is stored as is.
fn is_decimal(value: &str) -> bool {
    let unsigned = value.strip_prefix(['+', '-']).unwrap_or(value);
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (unsigned, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    all_digits(whole) && fraction.is_none_or(all_digits)
}
