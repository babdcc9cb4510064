use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{join_url, send_json, QuoteSource};
use crate::error::{ApiError, ApiResult};
use crate::types::{decimal_field, Quote, QuoteCurrency};

const VENUE: &str = "okx";

#[derive(Debug, Clone)]
pub struct OkxClient {
    client: Client,
    base_url: String,
}

impl OkxClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Ticker for an instrument such as `BTC-USDT`.
    pub async fn get_ticker(&self, inst_id: &str) -> ApiResult<Quote> {
        let url = join_url(&self.base_url, "/api/v5/market/ticker");
        let body = send_json(VENUE, self.client.get(&url).query(&[("instId", inst_id)])).await?;
        parse_ticker(&body)
    }
}

pub fn parse_ticker(body: &Value) -> ApiResult<Quote> {
    let code = body["code"].as_str().unwrap_or_default();
    if code != "0" {
        return Err(ApiError::Api {
            venue: VENUE,
            code: code.to_string(),
            message: body["msg"].as_str().unwrap_or_default().to_string(),
        });
    }

    let ticker = body["data"]
        .as_array()
        .and_then(|data| data.first())
        .ok_or_else(|| ApiError::malformed(VENUE, "empty ticker data"))?;

    Ok(Quote {
        bid: decimal_field(VENUE, &ticker["bidPx"], "bidPx")?,
        ask: decimal_field(VENUE, &ticker["askPx"], "askPx")?,
        last: decimal_field(VENUE, &ticker["last"], "last")?,
    })
}

#[async_trait]
impl QuoteSource for OkxClient {
    fn name(&self) -> &str {
        "OKX"
    }

    fn currency(&self) -> QuoteCurrency {
        QuoteCurrency::Usd
    }

    async fn fetch_quote(&self, pair: &str) -> ApiResult<Quote> {
        self.get_ticker(pair).await
    }
}
