//! Discord webhook payloads and delivery.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pump::{PumpAlert, ScanSummary};

pub const COLOR_GREEN: u32 = 0x00ff00;
pub const COLOR_BLUE: u32 = 0x0099ff;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub content: String,
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
}

impl EmbedField {
    fn new(name: &str, value: String, inline: bool) -> Self {
        Self {
            name: name.to_string(),
            value,
            inline,
        }
    }
}

/// Anything that can deliver a webhook payload.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns the HTTP status the endpoint answered with.
    async fn send(&self, payload: &WebhookPayload) -> Result<u16>;
}

#[derive(Debug, Clone)]
pub struct DiscordWebhook {
    client: Client,
    url: String,
}

impl DiscordWebhook {
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }

    /// POST the payload; Discord answers 204 on success.
    pub async fn post(&self, payload: &WebhookPayload) -> Result<u16> {
        let response = self.client.post(&self.url).json(payload).send().await?;
        Ok(response.status().as_u16())
    }
}

#[async_trait]
impl Notifier for DiscordWebhook {
    async fn send(&self, payload: &WebhookPayload) -> Result<u16> {
        self.post(payload).await
    }
}

/// Prints the payload instead of posting it.
#[derive(Debug, Default)]
pub struct DryRunNotifier;

#[async_trait]
impl Notifier for DryRunNotifier {
    async fn send(&self, payload: &WebhookPayload) -> Result<u16> {
        println!("{}", serde_json::to_string_pretty(payload)?);
        Ok(204)
    }
}

fn pct(fraction: Decimal) -> Decimal {
    (fraction * Decimal::from(100)).round_dp(1)
}

/// Whole-number amount with thousands separators, e.g. `1,234,567`.
pub fn format_thousands(value: Decimal) -> String {
    let rounded = value.round_dp(0);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let digits = rounded.abs().trunc().to_string();

    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if negative {
        out.insert(0, '-');
    }
    out
}

/// One embed per pump, strongest first, capped at `max_embeds`.
pub fn pump_alert_payload(pumps: &[PumpAlert], max_embeds: usize, now: DateTime<Utc>) -> WebhookPayload {
    let timestamp = now.to_rfc3339();
    let embeds = pumps
        .iter()
        .take(max_embeds)
        .map(|pump| Embed {
            title: format!("🚀 {} 急騰検出！", pump.symbol),
            color: COLOR_GREEN,
            fields: vec![
                EmbedField::new("📈 価格上昇率（15分）", format!("+{:.1}%", pct(pump.price_change)), true),
                EmbedField::new(
                    "📊 ボリューム増加率（15分）",
                    format!("+{:.1}%", pct(pump.volume_change)),
                    true,
                ),
                EmbedField::new("💰 現在価格", format!("${:.8}", pump.current_price), true),
                EmbedField::new(
                    "📊 ボリューム比較",
                    format!(
                        "前: ${}\n今: ${}",
                        format_thousands(pump.previous_volume),
                        format_thousands(pump.current_volume)
                    ),
                    true,
                ),
                EmbedField::new(
                    "📈 価格変動",
                    format!("${:.8} → ${:.8}", pump.previous_price, pump.current_price),
                    false,
                ),
            ],
            timestamp: timestamp.clone(),
            footer: None,
        })
        .collect();

    WebhookPayload {
        content: format!("🔥 **{}銘柄で急騰を検出！**（前15分足比較） 🔥", pumps.len()),
        embeds,
    }
}

/// Heartbeat sent when a scan finds nothing.
pub fn status_payload(
    summary: &ScanSummary,
    min_price_change: Decimal,
    min_volume_change: Decimal,
    now: DateTime<Utc>,
) -> WebhookPayload {
    let embed = Embed {
        title: "📊 Bitget監視システム 稼働レポート".to_string(),
        color: COLOR_BLUE,
        fields: vec![
            EmbedField::new("🔍 監視対象", format!("{} USDTペア", summary.total_symbols), true),
            EmbedField::new("✅ 処理完了", format!("{} 銘柄", summary.processed_symbols), true),
            EmbedField::new("⏱️ 処理時間", format!("{:.1}秒", summary.elapsed.as_secs_f64()), true),
            EmbedField::new(
                "📈 検出条件",
                format!(
                    "価格+{}% & ボリューム+{}%",
                    (min_price_change * Decimal::from(100)).normalize(),
                    (min_volume_change * Decimal::from(100)).normalize()
                ),
                false,
            ),
            EmbedField::new("🟢 ステータス", "正常稼働中".to_string(), true),
        ],
        timestamp: now.to_rfc3339(),
        footer: Some(EmbedFooter {
            text: "次回監視まで15分".to_string(),
        }),
    };

    WebhookPayload {
        content: "ℹ️ **急騰銘柄なし** - システム正常稼働中".to_string(),
        embeds: vec![embed],
    }
}
