use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ApiError, ApiResult};

/// One OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub quote_volume: Decimal,
}

/// Venues disagree on ordering (Bybit is newest first, Bitget oldest first).
/// Everything downstream expects oldest first.
pub fn sort_candles_ascending(candles: &mut [Candle]) {
    candles.sort_by_key(|c| c.open_time);
}

/// Top of book in the venue's native currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub bid: Decimal,
    pub ask: Decimal,
    pub last: Decimal,
}

impl Quote {
    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteCurrency {
    Jpy,
    Usd,
}

impl fmt::Display for QuoteCurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteCurrency::Jpy => write!(f, "JPY"),
            QuoteCurrency::Usd => write!(f, "USD"),
        }
    }
}

/// Parse a decimal that a venue sent either as a JSON string or a JSON number.
pub(crate) fn decimal_field(
    venue: &'static str,
    value: &serde_json::Value,
    name: &str,
) -> ApiResult<Decimal> {
    let parsed = match value {
        serde_json::Value::String(s) => Decimal::from_str(s).ok(),
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| Decimal::from_scientific(&n.to_string()).ok()),
        _ => None,
    };
    parsed.ok_or_else(|| ApiError::malformed(venue, format!("field `{name}` is not a decimal: {value}")))
}

/// Millisecond epoch as sent by exchanges (string or number).
pub(crate) fn millis_field(
    venue: &'static str,
    value: &serde_json::Value,
    name: &str,
) -> ApiResult<DateTime<Utc>> {
    let millis = match value {
        serde_json::Value::String(s) => s.parse::<i64>().ok(),
        serde_json::Value::Number(n) => n.as_i64(),
        _ => None,
    };
    millis
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .ok_or_else(|| ApiError::malformed(venue, format!("field `{name}` is not a timestamp: {value}")))
}

/// Parse `[ts, open, high, low, close, <volume columns>...]` rows.
/// `volume_idx` and `quote_volume_idx` select the venue's volume columns.
pub(crate) fn parse_candle_rows(
    venue: &'static str,
    rows: &[serde_json::Value],
    volume_idx: usize,
    quote_volume_idx: usize,
) -> ApiResult<Vec<Candle>> {
    let needed = volume_idx.max(quote_volume_idx) + 1;
    rows.iter()
        .map(|row| {
            let cols = row
                .as_array()
                .ok_or_else(|| ApiError::malformed(venue, "candle row is not an array"))?;
            if cols.len() < needed {
                return Err(ApiError::malformed(
                    venue,
                    format!("candle row has {} columns, expected {needed}", cols.len()),
                ));
            }
            Ok(Candle {
                open_time: millis_field(venue, &cols[0], "timestamp")?,
                open: decimal_field(venue, &cols[1], "open")?,
                high: decimal_field(venue, &cols[2], "high")?,
                low: decimal_field(venue, &cols[3], "low")?,
                close: decimal_field(venue, &cols[4], "close")?,
                volume: decimal_field(venue, &cols[volume_idx], "volume")?,
                quote_volume: decimal_field(venue, &cols[quote_volume_idx], "quote_volume")?,
            })
        })
        .collect()
}
