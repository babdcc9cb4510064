//! Price/volume spike detection across every symbol of a venue.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::api::CandleSource;
use crate::config::PumpConfig;
use crate::discord::{pump_alert_payload, status_payload, Notifier};
use crate::error::ApiError;
use crate::fanout::bounded_fan_out;
use crate::indicators::percent_change;
use crate::types::{sort_candles_ascending, Candle};

#[derive(Debug, Clone, PartialEq)]
pub struct PumpAlert {
    pub symbol: String,
    pub price_change: Decimal,  // fraction, 0.5 = +50%
    pub volume_change: Decimal, // fraction, 2.0 = +200%
    pub current_price: Decimal,
    pub previous_price: Decimal,
    pub current_volume: Decimal,
    pub previous_volume: Decimal,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanSummary {
    pub total_symbols: usize,
    /// Symbols whose candles were actually fetched
    pub processed_symbols: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub pumps: Vec<PumpAlert>,
    pub summary: ScanSummary,
}

#[derive(Debug, Clone, Copy)]
pub struct PumpThresholds {
    pub min_price_change: Decimal,
    pub min_volume_change: Decimal,
}

impl From<&PumpConfig> for PumpThresholds {
    fn from(config: &PumpConfig) -> Self {
        Self {
            min_price_change: config.min_price_change,
            min_volume_change: config.min_volume_change,
        }
    }
}

/// Compare the newest candle against the one before it.
pub fn evaluate(symbol: &str, mut candles: Vec<Candle>, thresholds: PumpThresholds) -> Option<PumpAlert> {
    if candles.len() < 2 {
        return None;
    }
    sort_candles_ascending(&mut candles);
    let current = &candles[candles.len() - 1];
    let previous = &candles[candles.len() - 2];

    if previous.close <= Decimal::ZERO || previous.volume <= Decimal::ZERO {
        return None;
    }

    let price_change = percent_change(previous.close, current.close)?;
    let volume_change = percent_change(previous.volume, current.volume)?;

    if price_change >= thresholds.min_price_change && volume_change >= thresholds.min_volume_change {
        Some(PumpAlert {
            symbol: symbol.to_string(),
            price_change,
            volume_change,
            current_price: current.close,
            previous_price: previous.close,
            current_volume: current.volume,
            previous_volume: previous.volume,
            timestamp: current.open_time,
        })
    } else {
        None
    }
}

pub struct PumpDetector {
    source: Arc<dyn CandleSource>,
    max_concurrent: usize,
    thresholds: PumpThresholds,
    max_embeds: usize,
}

impl PumpDetector {
    pub fn new(source: Arc<dyn CandleSource>, config: &PumpConfig) -> Self {
        Self {
            source,
            max_concurrent: config.max_concurrent,
            thresholds: PumpThresholds::from(config),
            max_embeds: config.max_embeds,
        }
    }

    pub fn thresholds(&self) -> PumpThresholds {
        self.thresholds
    }

    /// List symbols, fetch the last two candles of each under the
    /// concurrency cap, and return pumps sorted by price change.
    pub async fn scan(&self) -> Result<ScanOutcome> {
        let start = Instant::now();

        let symbols = self.source.list_symbols().await?;
        if symbols.is_empty() {
            bail!("Failed to get symbols");
        }
        info!(
            "Processing {} symbols with max {} concurrent requests...",
            symbols.len(),
            self.max_concurrent
        );

        let source = self.source.clone();
        let results = bounded_fan_out(symbols.clone(), self.max_concurrent, move |symbol| {
            let source = source.clone();
            async move { source.recent_candles(&symbol, 2).await }
        })
        .await;

        let mut processed = 0;
        let mut pumps = Vec::new();
        for (symbol, result) in results {
            match result {
                Some(Ok(candles)) => {
                    processed += 1;
                    if let Some(pump) = evaluate(&symbol, candles, self.thresholds) {
                        pumps.push(pump);
                    }
                }
                Some(Err(ApiError::Timeout { .. })) => warn!("Timeout for {symbol}"),
                Some(Err(e)) => debug!("Error processing {symbol}: {e}"),
                None => debug!("No result for {symbol}"),
            }
        }

        pumps.sort_by(|a, b| b.price_change.cmp(&a.price_change));

        let elapsed = start.elapsed();
        info!(
            "Completed {} symbols in {:.2} seconds",
            symbols.len(),
            elapsed.as_secs_f64()
        );

        Ok(ScanOutcome {
            pumps,
            summary: ScanSummary {
                total_symbols: symbols.len(),
                processed_symbols: processed,
                elapsed,
            },
        })
    }

    /// One full pass: scan, log, and report through `notifier`.
    /// A failed delivery is logged, never retried.
    pub async fn run(&self, notifier: &dyn Notifier) -> Result<ScanOutcome> {
        info!("Starting 15m pump detection...");
        let outcome = self.scan().await?;
        let now = Utc::now();

        let (payload, what) = if outcome.pumps.is_empty() {
            info!("No significant pumps detected vs previous 15m candle");
            (
                status_payload(
                    &outcome.summary,
                    self.thresholds.min_price_change,
                    self.thresholds.min_volume_change,
                    now,
                ),
                "Status notification".to_string(),
            )
        } else {
            info!("🚀 Detected {} pumps (vs previous 15m candle)!", outcome.pumps.len());
            for pump in &outcome.pumps {
                info!(
                    "  {}: Price +{:.1}%, Volume +{:.1}%",
                    pump.symbol,
                    pump.price_change * Decimal::from(100),
                    pump.volume_change * Decimal::from(100)
                );
            }
            (
                pump_alert_payload(&outcome.pumps, self.max_embeds, now),
                format!("Discord notification for {} pumps", outcome.pumps.len()),
            )
        };

        match notifier.send(&payload).await {
            Ok(204) => info!("{what} sent"),
            Ok(status) => warn!("{what} failed: {status}"),
            Err(e) => warn!("Failed to send {what}: {e}"),
        }

        info!("Pump detection completed");
        Ok(outcome)
    }
}
