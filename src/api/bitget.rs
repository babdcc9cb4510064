use async_trait::async_trait;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::Value;
use sha2::Sha256;
use std::time::Duration;

use super::{join_url, send_json, CandleSource};
use crate::config::BitgetCredentials;
use crate::error::{ApiError, ApiResult};
use crate::types::{parse_candle_rows, Candle};

type HmacSha256 = Hmac<Sha256>;

const VENUE: &str = "bitget";
const SUCCESS_CODE: &str = "00000";

/// Bitget v2 spot market data. Only public endpoints are used; when
/// credentials are configured every request is signed anyway so it counts
/// against the account's rate limit instead of the IP's.
#[derive(Debug, Clone)]
pub struct BitgetClient {
    client: Client,
    base_url: String,
    credentials: Option<BitgetCredentials>,
    quote_asset: String,
    granularity: String,
    candle_timeout: Duration,
}

impl BitgetClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self {
            client,
            base_url,
            credentials: None,
            quote_asset: "USDT".to_string(),
            granularity: "15m".to_string(),
            candle_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_credentials(mut self, credentials: Option<BitgetCredentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_quote_asset(mut self, quote_asset: impl Into<String>) -> Self {
        self.quote_asset = quote_asset.into();
        self
    }

    pub fn with_granularity(mut self, granularity: impl Into<String>) -> Self {
        self.granularity = granularity.into();
        self
    }

    pub fn with_candle_timeout(mut self, timeout: Duration) -> Self {
        self.candle_timeout = timeout;
        self
    }

    fn sign(secret: &str, prehash: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(prehash.as_bytes());
        base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    }

    /// `ACCESS-*` headers for a GET of `path_and_query`; empty without credentials.
    fn signed_headers(&self, path_and_query: &str, timestamp: &str) -> Vec<(&'static str, String)> {
        let Some(creds) = &self.credentials else {
            return Vec::new();
        };
        let prehash = format!("{timestamp}GET{path_and_query}");
        vec![
            ("ACCESS-KEY", creds.api_key.clone()),
            ("ACCESS-SIGN", Self::sign(&creds.api_secret, &prehash)),
            ("ACCESS-TIMESTAMP", timestamp.to_string()),
            ("ACCESS-PASSPHRASE", creds.passphrase.clone()),
            ("Content-Type", "application/json".to_string()),
        ]
    }

    fn get(&self, path: &str, params: &[(&str, &str)]) -> reqwest::RequestBuilder {
        let target = path_and_query(path, params);
        let mut request = self.client.get(join_url(&self.base_url, &target));

        let timestamp = Utc::now().timestamp_millis().to_string();
        for (name, value) in self.signed_headers(&target, &timestamp) {
            request = request.header(name, value);
        }
        request
    }

    pub async fn get_symbols(&self) -> ApiResult<Vec<String>> {
        let body = send_json(VENUE, self.get("/api/v2/spot/public/symbols", &[])).await?;
        parse_symbols(&body, &self.quote_asset)
    }

    pub async fn get_candles(&self, symbol: &str, limit: u16) -> ApiResult<Vec<Candle>> {
        let limit = limit.to_string();
        let request = self
            .get(
                "/api/v2/spot/market/candles",
                &[
                    ("symbol", symbol),
                    ("granularity", self.granularity.as_str()),
                    ("limit", limit.as_str()),
                ],
            )
            .timeout(self.candle_timeout);
        let body = send_json(VENUE, request).await?;
        parse_candles(&body)
    }
}

/// The query is part of what gets signed, so it is encoded here rather than
/// left to `RequestBuilder::query`.
fn path_and_query(path: &str, params: &[(&str, &str)]) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{query}")
    }
}

fn check_envelope(body: &Value) -> ApiResult<()> {
    let code = body["code"].as_str().unwrap_or_default();
    if code == SUCCESS_CODE {
        Ok(())
    } else {
        Err(ApiError::Api {
            venue: VENUE,
            code: code.to_string(),
            message: body["msg"].as_str().unwrap_or("Unknown error").to_string(),
        })
    }
}

/// Online symbols quoted in `quote_asset`.
pub fn parse_symbols(body: &Value, quote_asset: &str) -> ApiResult<Vec<String>> {
    check_envelope(body)?;

    let symbols = body["data"]
        .as_array()
        .map(|data| {
            data.iter()
                .filter(|info| info["status"].as_str() == Some("online"))
                .filter_map(|info| info["symbol"].as_str())
                .filter(|symbol| symbol.ends_with(quote_asset) && *symbol != quote_asset)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(symbols)
}

/// Rows are `[ts, open, high, low, close, baseVol, usdtVol, quoteVol]`;
/// the USDT column is the volume the detector compares.
pub fn parse_candles(body: &Value) -> ApiResult<Vec<Candle>> {
    check_envelope(body)?;
    let rows = body["data"].as_array().map(Vec::as_slice).unwrap_or_default();
    parse_candle_rows(VENUE, rows, 6, 7)
}

#[async_trait]
impl CandleSource for BitgetClient {
    async fn list_symbols(&self) -> ApiResult<Vec<String>> {
        self.get_symbols().await
    }

    async fn recent_candles(&self, symbol: &str, limit: u16) -> ApiResult<Vec<Candle>> {
        self.get_candles(symbol, limit).await
    }
}
