use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

pub const CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub endpoints: EndpointsConfig,
    pub kline: KlineConfig,
    pub arbitrage: ArbitrageConfig,
    pub pump: PumpConfig,
    pub cardano: CardanoConfig,
    pub discord: DiscordConfig,
    #[serde(default)]
    pub bitget_credentials: Option<BitgetCredentials>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointsConfig {
    pub coincheck: String,
    pub okx: String,
    pub kraken: String,
    pub fx: String,
    pub bybit: String,
    pub bitget: String,
    pub blockfrost: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KlineConfig {
    pub symbols: Vec<String>,
    pub category: String,
    pub interval: String,
    pub limit: u16,
    pub rsi_period: usize,
    pub atr_period: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArbitrageConfig {
    pub venue: String,          // "okx" or "kraken"
    pub currencies: Vec<String>,
    pub min_profit_pct: Decimal, // Ranking cut-off
    pub highlight_pct: Decimal,  // Flag in the detail view
    pub fee_estimate_pct: Decimal, // Round-trip fee estimate
    pub fallback_usdjpy: Decimal,
    pub monitor_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PumpConfig {
    pub quote_asset: String,
    pub granularity: String,
    pub max_concurrent: usize,
    pub request_timeout_secs: u64,
    pub min_price_change: Decimal,  // 0.5 = +50%
    pub min_volume_change: Decimal, // 2.0 = +200%
    pub max_embeds: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CardanoConfig {
    #[serde(default)]
    pub project_id: String,
    pub hours_back: i64,
    pub pages: u32,
    pub page_size: u32,
    pub tx_delay_ms: u64,
    pub contract_delay_ms: u64,
    pub complex_min_utxos: usize,
    pub complex_min_assets: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub webhook_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BitgetCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub passphrase: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoints: EndpointsConfig {
                coincheck: "https://coincheck.com".to_string(),
                okx: "https://www.okx.com".to_string(),
                kraken: "https://api.kraken.com".to_string(),
                fx: "https://api.exchangerate-api.com".to_string(),
                bybit: "https://api.bybit.com".to_string(),
                bitget: "https://api.bitget.com".to_string(),
                blockfrost: "https://cardano-mainnet.blockfrost.io/api/v0".to_string(),
                request_timeout_secs: 10,
            },
            kline: KlineConfig {
                symbols: vec!["BTCUSDT".to_string()],
                category: "linear".to_string(),
                interval: "15".to_string(), // 15m bars
                limit: 500,
                rsi_period: 14,
                atr_period: 14,
            },
            arbitrage: ArbitrageConfig {
                venue: "kraken".to_string(),
                currencies: vec![
                    "BTC".to_string(),
                    "ETH".to_string(),
                    "XRP".to_string(),
                    "LTC".to_string(),
                    "BCH".to_string(),
                ],
                min_profit_pct: Decimal::new(3, 1),   // 0.3%
                highlight_pct: Decimal::new(5, 1),    // 0.5%
                fee_estimate_pct: Decimal::new(5, 1), // 0.5%
                fallback_usdjpy: Decimal::from(150),
                monitor_interval_secs: 10,
            },
            pump: PumpConfig {
                quote_asset: "USDT".to_string(),
                granularity: "15m".to_string(),
                max_concurrent: 100,
                request_timeout_secs: 5,
                min_price_change: Decimal::new(5, 1),
                min_volume_change: Decimal::from(2),
                max_embeds: 10,
            },
            cardano: CardanoConfig {
                project_id: String::new(),
                hours_back: 24,
                pages: 5,
                page_size: 100,
                tx_delay_ms: 100,
                contract_delay_ms: 1000,
                complex_min_utxos: 6,
                complex_min_assets: 3,
            },
            discord: DiscordConfig {
                webhook_url: String::new(),
            },
            bitget_credentials: None,
        }
    }
}

impl Config {
    /// Load `config.toml`, writing the defaults out first if it doesn't exist,
    /// then apply secrets from the environment.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        let mut config = Self::load_from(CONFIG_PATH)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str = std::fs::read_to_string(path).unwrap_or_else(|_| {
            log::warn!("Config file not found, using default configuration");
            String::new()
        });

        if config_str.is_empty() {
            let default_config = Self::default();
            let toml_str = toml::to_string_pretty(&default_config)?;
            std::fs::write(path, toml_str)
                .with_context(|| format!("writing default config to {}", path.display()))?;
            Ok(default_config)
        } else {
            toml::from_str(&config_str).with_context(|| format!("parsing {}", path.display()))
        }
    }

    /// Secrets never live in the config file the tools write out.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DISCORD_WEBHOOK_URL").filter(|v| !v.is_empty()) {
            self.discord.webhook_url = url;
        }
        if let Some(id) = lookup("BLOCKFROST_PROJECT_ID").filter(|v| !v.is_empty()) {
            self.cardano.project_id = id;
        }

        let api_key = lookup("BITGET_API_KEY").unwrap_or_default();
        let api_secret = lookup("BITGET_API_SECRET").unwrap_or_default();
        let passphrase = lookup("BITGET_PASSPHRASE").unwrap_or_default();
        if !api_key.is_empty() && !api_secret.is_empty() {
            self.bitget_credentials = Some(BitgetCredentials {
                api_key,
                api_secret,
                passphrase,
            });
        }
    }

    pub fn validate(&self) -> Result<()> {
        let e = &self.endpoints;
        for (name, url) in [
            ("coincheck", &e.coincheck),
            ("okx", &e.okx),
            ("kraken", &e.kraken),
            ("fx", &e.fx),
            ("bybit", &e.bybit),
            ("bitget", &e.bitget),
            ("blockfrost", &e.blockfrost),
        ] {
            Url::parse(url).with_context(|| format!("endpoints.{name} is not a valid URL"))?;
        }
        if !self.discord.webhook_url.is_empty() {
            Url::parse(&self.discord.webhook_url).context("Discord webhook URL is not a valid URL")?;
        }
        if self.pump.max_concurrent == 0 {
            anyhow::bail!("pump.max_concurrent must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_writes_defaults() {
        let dir = std::env::temp_dir().join(format!("market-scout-cfg-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        let _ = std::fs::remove_file(&path);

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.kline.symbols, vec!["BTCUSDT".to_string()]);
        assert!(path.exists());

        // Reloading the written file round-trips
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.pump.max_concurrent, 100);
        assert_eq!(reloaded.arbitrage.min_profit_pct, Decimal::new(3, 1));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn env_overrides_secrets() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DISCORD_WEBHOOK_URL", "https://discord.com/api/webhooks/1/abc"),
            ("BLOCKFROST_PROJECT_ID", "mainnetXYZ"),
            ("BITGET_API_KEY", "key"),
            ("BITGET_API_SECRET", "secret"),
        ]);
        let mut config = Config::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.discord.webhook_url, "https://discord.com/api/webhooks/1/abc");
        assert_eq!(config.cardano.project_id, "mainnetXYZ");
        let creds = config.bitget_credentials.unwrap();
        assert_eq!(creds.api_key, "key");
        assert_eq!(creds.passphrase, "");
    }

    #[test]
    fn bitget_credentials_need_key_and_secret() {
        let mut config = Config::default();
        config.apply_env(|k| (k == "BITGET_API_KEY").then(|| "key".to_string()));
        assert!(config.bitget_credentials.is_none());
    }

    #[test]
    fn validate_rejects_bad_urls_and_zero_concurrency() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.discord.webhook_url = "not a url".to_string();
        assert!(config.validate().is_err());

        config.discord.webhook_url.clear();
        config.pump.max_concurrent = 0;
        assert!(config.validate().is_err());
    }
}
