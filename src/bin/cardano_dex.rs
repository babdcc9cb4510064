use anyhow::{bail, Context, Result};
use chrono::{Local, Utc};
use clap::{Arg, ArgAction, Command};
use log::{info, warn};
use std::sync::Arc;

use market_scout::api::blockfrost::BlockfrostClient;
use market_scout::api::http_client;
use market_scout::cardano::{volume_statistics, DexCollector};
use market_scout::config::Config;
use market_scout::export::{default_swaps_filename, export_swaps};
use market_scout::report::{render_cardano_stats, render_swap_samples};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("Market Scout Cardano DEX")
        .version("1.0")
        .about("Collect and summarise recent Cardano DEX transactions via Blockfrost")
        .arg(
            Arg::new("hours-back")
                .long("hours-back")
                .help("How far back to collect, in hours")
                .value_parser(clap::value_parser!(i64))
                .required(false),
        )
        .arg(
            Arg::new("pages")
                .long("pages")
                .help("Maximum pages of history per contract")
                .value_parser(clap::value_parser!(u32))
                .required(false),
        )
        .arg(
            Arg::new("export")
                .long("export")
                .help("Export swaps to CSV (default name when no FILE is given)")
                .value_name("FILE")
                .num_args(0..=1)
                .default_missing_value("")
                .required(false),
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

    if let Some(hours) = matches.get_one::<i64>("hours-back") {
        config.cardano.hours_back = *hours;
    }
    if let Some(pages) = matches.get_one::<u32>("pages") {
        config.cardano.pages = *pages;
    }
    if config.cardano.project_id.is_empty() {
        bail!("BLOCKFROST_PROJECT_ID is not set");
    }

    let blockfrost = BlockfrostClient::new(
        http_client(config.endpoints.request_timeout_secs)?,
        config.endpoints.blockfrost.clone(),
        config.cardano.project_id.clone(),
    );

    info!("Checking Blockfrost health...");
    let health = blockfrost.health().await.context("Blockfrost health check failed")?;
    if !health.is_healthy {
        bail!("Blockfrost reports it is not healthy");
    }
    info!("Blockfrost is healthy");

    let collector = DexCollector::new(Arc::new(blockfrost), &config.cardano);
    info!(
        "Collecting DEX transactions from the last {} hours ({} contracts)",
        config.cardano.hours_back,
        collector.analyzer().contracts().len()
    );
    let swaps = collector.collect_recent(config.cardano.hours_back, Utc::now()).await;

    match volume_statistics(&swaps) {
        Some(stats) => {
            println!("{}", render_cardano_stats(&stats));
            println!("{}", render_swap_samples(&swaps, 10));
        }
        None => warn!("No DEX transactions found"),
    }

    if let Some(export_file) = matches.get_one::<String>("export") {
        let path = if export_file.is_empty() {
            default_swaps_filename(Local::now())
        } else {
            export_file.clone()
        };
        export_swaps(&path, &swaps)?;
        info!("Exported {} transactions to {}", swaps.len(), path);
    }

    Ok(())
}
