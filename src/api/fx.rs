use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;

use super::{join_url, send_json, FxRateSource};
use crate::error::ApiResult;
use crate::types::decimal_field;

const VENUE: &str = "exchangerate-api";

#[derive(Debug, Clone)]
pub struct FxClient {
    client: Client,
    base_url: String,
}

impl FxClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    pub async fn get_usd_jpy(&self) -> ApiResult<Decimal> {
        let url = join_url(&self.base_url, "/v4/latest/USD");
        let body = send_json(VENUE, self.client.get(&url)).await?;
        parse_usd_jpy(&body)
    }
}

pub fn parse_usd_jpy(body: &Value) -> ApiResult<Decimal> {
    decimal_field(VENUE, &body["rates"]["JPY"], "rates.JPY")
}

#[async_trait]
impl FxRateSource for FxClient {
    async fn usd_jpy(&self) -> ApiResult<Decimal> {
        self.get_usd_jpy().await
    }
}
