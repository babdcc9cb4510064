use reqwest::Client;
use serde_json::Value;

use super::{join_url, send_json};
use crate::error::{ApiError, ApiResult};
use crate::types::{parse_candle_rows, Candle};

const VENUE: &str = "bybit";

/// Bybit v5 public market data.
#[derive(Debug, Clone)]
pub struct BybitClient {
    client: Client,
    base_url: String,
}

impl BybitClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Klines as Bybit returns them (newest first).
    pub async fn get_klines(
        &self,
        category: &str,
        symbol: &str,
        interval: &str,
        limit: u16,
    ) -> ApiResult<Vec<Candle>> {
        let url = join_url(&self.base_url, "/v5/market/kline");
        let limit = limit.to_string();
        let request = self.client.get(&url).query(&[
            ("category", category),
            ("symbol", symbol),
            ("interval", interval),
            ("limit", limit.as_str()),
        ]);
        let body = send_json(VENUE, request).await?;
        parse_klines(&body)
    }
}

/// Rows are `[startTime, open, high, low, close, volume, turnover]`.
pub fn parse_klines(body: &Value) -> ApiResult<Vec<Candle>> {
    let ret_code = body["retCode"].as_i64().unwrap_or(-1);
    if ret_code != 0 {
        return Err(ApiError::Api {
            venue: VENUE,
            code: ret_code.to_string(),
            message: body["retMsg"].as_str().unwrap_or_default().to_string(),
        });
    }

    let rows = body["result"]["list"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default();
    parse_candle_rows(VENUE, rows, 5, 6)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;

    #[test]
    fn parses_kline_list() {
        let body = json!({
            "retCode": 0,
            "retMsg": "OK",
            "result": {
                "category": "linear",
                "symbol": "BTCUSDT",
                "list": [
                    ["1700000900000", "37010", "37100", "36990", "37050", "120.5", "4460000"],
                    ["1700000000000", "37000", "37020", "36950", "37010", "98.1", "3630000"]
                ]
            }
        });
        let candles = parse_klines(&body).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].close, Decimal::from(37_050));
        assert_eq!(candles[1].quote_volume, Decimal::from(3_630_000));
    }

    #[test]
    fn ret_code_error() {
        let body = json!({"retCode": 10001, "retMsg": "params error: symbol invalid", "result": {}});
        let err = parse_klines(&body).unwrap_err();
        assert!(err.to_string().contains("10001"));
    }

    #[test]
    fn missing_list_is_empty() {
        let body = json!({"retCode": 0, "retMsg": "OK", "result": {}});
        assert!(parse_klines(&body).unwrap().is_empty());
    }
}
