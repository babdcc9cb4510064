use anyhow::{bail, Result};
use clap::{Arg, ArgAction, Command};
use log::info;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

use market_scout::api::bitget::BitgetClient;
use market_scout::api::http_client;
use market_scout::config::Config;
use market_scout::discord::{DiscordWebhook, DryRunNotifier, Notifier};
use market_scout::pump::PumpDetector;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("Market Scout Pump Detector")
        .version("1.0")
        .about("Detect 15m price/volume spikes across Bitget USDT spot pairs")
        .arg(
            Arg::new("max-concurrent")
                .long("max-concurrent")
                .help("Maximum number of candle requests in flight")
                .value_parser(clap::value_parser!(usize))
                .required(false),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Print the Discord payload instead of posting it")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let level = if matches.get_flag("verbose") {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env().filter_level(level).init();

    let mut config = Config::load()?;

    if let Some(max_concurrent) = matches.get_one::<usize>("max-concurrent") {
        config.pump.max_concurrent = (*max_concurrent).max(1);
    }

    let dry_run = matches.get_flag("dry-run");
    if !dry_run && config.discord.webhook_url.is_empty() {
        bail!("DISCORD_WEBHOOK_URL is not set (use --dry-run to print instead)");
    }

    let http = http_client(config.endpoints.request_timeout_secs)?;
    let bitget = BitgetClient::new(http.clone(), config.endpoints.bitget.clone())
        .with_credentials(config.bitget_credentials.clone())
        .with_quote_asset(config.pump.quote_asset.clone())
        .with_granularity(config.pump.granularity.clone())
        .with_candle_timeout(Duration::from_secs(config.pump.request_timeout_secs));

    let notifier: Box<dyn Notifier> = if dry_run {
        info!("Dry run: payload will be printed, not posted");
        Box::new(DryRunNotifier)
    } else {
        Box::new(DiscordWebhook::new(http, config.discord.webhook_url.clone()))
    };

    let detector = PumpDetector::new(Arc::new(bitget), &config.pump);
    let thresholds = detector.thresholds();
    info!(
        "Thresholds: price +{}%, volume +{}%",
        thresholds.min_price_change * Decimal::from(100),
        thresholds.min_volume_change * Decimal::from(100)
    );

    detector.run(notifier.as_ref()).await?;
    Ok(())
}
