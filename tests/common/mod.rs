//! In-memory venues for the integration tests. Nothing here touches the
//! network; every response is fixed up front by the test.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;

use market_scout::api::blockfrost::{AssetAmount, Utxo};
use market_scout::api::{
    AddressTransaction, CandleSource, ChainSource, FxRateSource, QuoteSource, TxDetails,
};
use market_scout::discord::{Notifier, WebhookPayload};
use market_scout::error::{ApiError, ApiResult};
use market_scout::types::{Candle, Quote, QuoteCurrency};

const MOCK: &str = "mock";

fn missing(what: &str) -> ApiError {
    ApiError::Api {
        venue: MOCK,
        code: "404".to_string(),
        message: format!("{what} not found"),
    }
}

pub fn quote(bid: i64, ask: i64) -> Quote {
    Quote {
        bid: Decimal::from(bid),
        ask: Decimal::from(ask),
        last: Decimal::from(bid),
    }
}

/// Quotes keyed by venue pair name; unknown pairs fail.
pub struct MockQuotes {
    name: String,
    currency: QuoteCurrency,
    quotes: HashMap<String, Quote>,
}

impl MockQuotes {
    pub fn new(name: &str, currency: QuoteCurrency, quotes: &[(&str, Quote)]) -> Self {
        Self {
            name: name.to_string(),
            currency,
            quotes: quotes.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }
}

#[async_trait]
impl QuoteSource for MockQuotes {
    fn name(&self) -> &str {
        &self.name
    }

    fn currency(&self) -> QuoteCurrency {
        self.currency
    }

    async fn fetch_quote(&self, pair: &str) -> ApiResult<Quote> {
        self.quotes.get(pair).copied().ok_or_else(|| missing(pair))
    }
}

/// Fixed USD/JPY rate, or a timeout when `None`.
pub struct MockFx(pub Option<Decimal>);

#[async_trait]
impl FxRateSource for MockFx {
    async fn usd_jpy(&self) -> ApiResult<Decimal> {
        self.0.ok_or(ApiError::Timeout { venue: MOCK })
    }
}

pub fn candle(ts: i64, close: &str, volume: &str) -> Candle {
    let close: Decimal = close.parse().unwrap();
    let volume: Decimal = volume.parse().unwrap();
    Candle {
        open_time: Utc.timestamp_opt(ts, 0).unwrap(),
        open: close,
        high: close,
        low: close,
        close,
        volume,
        quote_volume: volume,
    }
}

/// Symbols with canned candles; a listed symbol without candles times out.
#[derive(Default)]
pub struct MockCandles {
    symbols: Vec<String>,
    candles: HashMap<String, Vec<Candle>>,
}

impl MockCandles {
    pub fn with_symbol(mut self, symbol: &str, candles: Option<Vec<Candle>>) -> Self {
        self.symbols.push(symbol.to_string());
        if let Some(candles) = candles {
            self.candles.insert(symbol.to_string(), candles);
        }
        self
    }
}

#[async_trait]
impl CandleSource for MockCandles {
    async fn list_symbols(&self) -> ApiResult<Vec<String>> {
        Ok(self.symbols.clone())
    }

    async fn recent_candles(&self, symbol: &str, limit: u16) -> ApiResult<Vec<Candle>> {
        let candles = self
            .candles
            .get(symbol)
            .ok_or(ApiError::Timeout { venue: MOCK })?;
        Ok(candles.iter().take(limit as usize).cloned().collect())
    }
}

/// Keeps every payload and answers with a fixed status.
pub struct RecordingNotifier {
    status: u16,
    pub sent: Mutex<Vec<WebhookPayload>>,
}

impl RecordingNotifier {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn payloads(&self) -> Vec<WebhookPayload> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, payload: &WebhookPayload) -> Result<u16> {
        self.sent.lock().unwrap().push(payload.clone());
        Ok(self.status)
    }
}

pub fn amount(unit: &str, quantity: u64) -> AssetAmount {
    AssetAmount {
        unit: unit.to_string(),
        quantity: quantity.to_string(),
    }
}

pub fn utxo(address: &str, amounts: Vec<AssetAmount>) -> Utxo {
    Utxo {
        address: address.to_string(),
        amount: amounts,
    }
}

/// Address history pages and transaction details keyed by hash.
#[derive(Default)]
pub struct MockChain {
    pages: HashMap<(String, u32), Vec<AddressTransaction>>,
    details: HashMap<String, TxDetails>,
    pub detail_requests: Mutex<Vec<String>>,
}

impl MockChain {
    pub fn with_page(mut self, address: &str, page: u32, txs: &[(&str, i64)]) -> Self {
        let entries = txs
            .iter()
            .enumerate()
            .map(|(i, (hash, block_time))| AddressTransaction {
                tx_hash: hash.to_string(),
                tx_index: i as u32,
                block_height: 10_000_000 + i as u64,
                block_time: *block_time,
            })
            .collect();
        self.pages.insert((address.to_string(), page), entries);
        self
    }

    pub fn with_tx(mut self, details: TxDetails) -> Self {
        self.details.insert(details.hash.clone(), details);
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.detail_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainSource for MockChain {
    async fn address_transactions(
        &self,
        address: &str,
        _count: u32,
        page: u32,
    ) -> ApiResult<Vec<AddressTransaction>> {
        Ok(self
            .pages
            .get(&(address.to_string(), page))
            .cloned()
            .unwrap_or_default())
    }

    async fn transaction_details(&self, tx_hash: &str) -> ApiResult<TxDetails> {
        self.detail_requests.lock().unwrap().push(tx_hash.to_string());
        self.details.get(tx_hash).cloned().ok_or_else(|| missing(tx_hash))
    }
}
