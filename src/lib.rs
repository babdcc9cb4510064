//! Market Scout
//!
//! Small market-data tools around a handful of crypto venues: kline
//! indicators, JPY/USD cross-exchange price gaps, pump detection with
//! Discord alerts, and Cardano DEX transaction analysis.

pub mod api;
pub mod arbitrage;
pub mod cardano;
pub mod config;
pub mod discord;
pub mod error;
pub mod export;
pub mod fanout;
pub mod indicators;
pub mod kline;
pub mod pump;
pub mod report;
pub mod types;

// Re-export commonly used types
pub use arbitrage::{ArbitrageScanner, AwayVenue, PriceSnapshot, RankedOpportunity};
pub use cardano::{DexAnalyzer, DexCollector, SwapRecord, VolumeStatistics};
pub use config::Config;
pub use discord::{DiscordWebhook, DryRunNotifier, Notifier, WebhookPayload};
pub use error::{ApiError, ApiResult};
pub use indicators::{Signal, ATR, RSI};
pub use pump::{PumpAlert, PumpDetector, ScanOutcome};
pub use types::{Candle, Quote, QuoteCurrency};
