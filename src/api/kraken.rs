use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{join_url, send_json, QuoteSource};
use crate::error::{ApiError, ApiResult};
use crate::types::{decimal_field, Quote, QuoteCurrency};

const VENUE: &str = "kraken";

#[derive(Debug, Clone)]
pub struct KrakenClient {
    client: Client,
    base_url: String,
}

impl KrakenClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Ticker for a pair such as `XBTUSD`.
    pub async fn get_ticker(&self, pair: &str) -> ApiResult<Quote> {
        let url = join_url(&self.base_url, "/0/public/Ticker");
        let body = send_json(VENUE, self.client.get(&url).query(&[("pair", pair)])).await?;
        parse_ticker(&body)
    }
}

/// Kraken answers under its own pair key (`XBTUSD` comes back as `XXBTZUSD`),
/// so the first entry of `result` is taken whatever it is called.
/// Price arrays are `[price, whole lot volume, lot volume]`.
pub fn parse_ticker(body: &Value) -> ApiResult<Quote> {
    if let Some(errors) = body["error"].as_array().filter(|e| !e.is_empty()) {
        let message = errors
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ApiError::Api {
            venue: VENUE,
            code: "error".to_string(),
            message,
        });
    }

    let ticker = body["result"]
        .as_object()
        .and_then(|result| result.values().next())
        .ok_or_else(|| ApiError::malformed(VENUE, "empty result"))?;

    Ok(Quote {
        bid: decimal_field(VENUE, &ticker["b"][0], "b")?,
        ask: decimal_field(VENUE, &ticker["a"][0], "a")?,
        last: decimal_field(VENUE, &ticker["c"][0], "c")?,
    })
}

#[async_trait]
impl QuoteSource for KrakenClient {
    fn name(&self) -> &str {
        "Kraken"
    }

    fn currency(&self) -> QuoteCurrency {
        QuoteCurrency::Usd
    }

    async fn fetch_quote(&self, pair: &str) -> ApiResult<Quote> {
        self.get_ticker(pair).await
    }
}
