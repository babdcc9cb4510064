use anyhow::Result;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use rust_decimal::Decimal;

use crate::api::bybit::BybitClient;
use crate::config::KlineConfig;
use crate::fanout::bounded_fan_out;
use crate::indicators::{atr_series, rsi_series};
use crate::types::{sort_candles_ascending, Candle};

const JST_OFFSET_SECS: i32 = 9 * 3600;

/// One bar with its indicators, ready for display or export.
#[derive(Debug, Clone, PartialEq)]
pub struct KlineRow {
    pub symbol: String,
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub quote_volume: Decimal,
    pub rsi: Option<Decimal>,
    pub atr: Option<Decimal>,
}

impl KlineRow {
    /// Display time as the tools have always shown it (JST).
    pub fn open_time_jst(&self) -> DateTime<FixedOffset> {
        self.open_time.with_timezone(&jst())
    }
}

fn jst() -> FixedOffset {
    FixedOffset::east_opt(JST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Sort oldest first and attach RSI/ATR.
pub fn build_rows(symbol: &str, mut candles: Vec<Candle>, rsi_period: usize, atr_period: usize) -> Vec<KlineRow> {
    sort_candles_ascending(&mut candles);
    let rsi = rsi_series(&candles, rsi_period);
    let atr = atr_series(&candles, atr_period);

    candles
        .into_iter()
        .zip(rsi.into_iter().zip(atr))
        .map(|(c, (rsi, atr))| KlineRow {
            symbol: symbol.to_string(),
            open_time: c.open_time,
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
            quote_volume: c.quote_volume,
            rsi,
            atr,
        })
        .collect()
}

/// Fetch every configured symbol at once and build its rows.
/// Symbols that fail are logged and left out.
pub async fn fetch_all(client: &BybitClient, config: &KlineConfig) -> Result<Vec<(String, Vec<KlineRow>)>> {
    let client = client.clone();
    let category = config.category.clone();
    let interval = config.interval.clone();
    let limit = config.limit;

    let results = bounded_fan_out(config.symbols.clone(), config.symbols.len(), move |symbol| {
        let client = client.clone();
        let category = category.clone();
        let interval = interval.clone();
        async move { client.get_klines(&category, &symbol, &interval, limit).await }
    })
    .await;

    let mut out = Vec::new();
    for (symbol, result) in results {
        match result {
            Some(Ok(candles)) => {
                let rows = build_rows(&symbol, candles, config.rsi_period, config.atr_period);
                out.push((symbol, rows));
            }
            Some(Err(e)) => log::error!("Failed to fetch klines for {symbol}: {e}"),
            None => log::error!("Kline task for {symbol} did not finish"),
        }
    }
    Ok(out)
}
