use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{join_url, send_json, QuoteSource};
use crate::error::ApiResult;
use crate::types::{decimal_field, Quote, QuoteCurrency};

const VENUE: &str = "coincheck";

#[derive(Debug, Clone)]
pub struct CoincheckClient {
    client: Client,
    base_url: String,
}

impl CoincheckClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Ticker for a pair such as `btc_jpy`, in JPY.
    pub async fn get_ticker(&self, pair: &str) -> ApiResult<Quote> {
        let url = join_url(&self.base_url, "/api/ticker");
        let body = send_json(VENUE, self.client.get(&url).query(&[("pair", pair)])).await?;
        parse_ticker(&body)
    }
}

pub fn parse_ticker(body: &Value) -> ApiResult<Quote> {
    Ok(Quote {
        bid: decimal_field(VENUE, &body["bid"], "bid")?,
        ask: decimal_field(VENUE, &body["ask"], "ask")?,
        last: decimal_field(VENUE, &body["last"], "last")?,
    })
}

#[async_trait]
impl QuoteSource for CoincheckClient {
    fn name(&self) -> &str {
        "Coincheck"
    }

    fn currency(&self) -> QuoteCurrency {
        QuoteCurrency::Jpy
    }

    async fn fetch_quote(&self, pair: &str) -> ApiResult<Quote> {
        self.get_ticker(pair).await
    }
}
