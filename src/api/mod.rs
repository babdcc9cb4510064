//! Typed REST clients for the venues the tools poll.
//!
//! Every client wraps a shared `reqwest::Client` and a base URL. Response
//! parsing lives in free `parse_*` functions so it can be tested without a
//! network. The traits below are the seams the scanners are written against.

pub mod bitget;
pub mod blockfrost;
pub mod bybit;
pub mod coincheck;
pub mod fx;
pub mod kraken;
pub mod okx;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use serde_json::Value;
use std::time::Duration;

use crate::error::{ApiError, ApiResult};
use crate::types::{Candle, Quote, QuoteCurrency};

pub use blockfrost::{AddressTransaction, TxDetails};

/// A venue that quotes a single pair at a time.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    fn name(&self) -> &str;
    fn currency(&self) -> QuoteCurrency;
    async fn fetch_quote(&self, pair: &str) -> ApiResult<Quote>;
}

/// Source of the USD/JPY rate used to put JPY venues on a dollar basis.
#[async_trait]
pub trait FxRateSource: Send + Sync {
    async fn usd_jpy(&self) -> ApiResult<Decimal>;
}

/// A venue that lists tradable symbols and serves recent candles.
#[async_trait]
pub trait CandleSource: Send + Sync {
    async fn list_symbols(&self) -> ApiResult<Vec<String>>;
    async fn recent_candles(&self, symbol: &str, limit: u16) -> ApiResult<Vec<Candle>>;
}

/// Read access to a chain indexer.
#[async_trait]
pub trait ChainSource: Send + Sync {
    async fn address_transactions(
        &self,
        address: &str,
        count: u32,
        page: u32,
    ) -> ApiResult<Vec<AddressTransaction>>;
    async fn transaction_details(&self, tx_hash: &str) -> ApiResult<TxDetails>;
}

pub fn http_client(timeout_secs: u64) -> anyhow::Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Send a request and decode the body as JSON, mapping non-2xx statuses.
pub(crate) async fn send_json(venue: &'static str, request: RequestBuilder) -> ApiResult<Value> {
    let response = request.send().await.map_err(|e| ApiError::http(venue, e))?;
    let status = response.status();
    let body = response.text().await.map_err(|e| ApiError::http(venue, e))?;

    if !status.is_success() {
        return Err(ApiError::Status {
            venue,
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| ApiError::malformed(venue, e.to_string()))
}

pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
