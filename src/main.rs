use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use log::{info, warn};

use market_scout::api::bybit::BybitClient;
use market_scout::api::http_client;
use market_scout::config::Config;
use market_scout::export::export_klines;
use market_scout::kline::{fetch_all, KlineRow};
use market_scout::report::render_klines;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("Market Scout")
        .version("1.0")
        .about("Fetch Bybit klines and print RSI/ATR per bar")
        .arg(
            Arg::new("symbol")
                .long("symbol")
                .help("Comma-separated symbols (e.g., BTCUSDT,ETHUSDT)")
                .required(false),
        )
        .arg(
            Arg::new("interval")
                .long("interval")
                .help("Bar interval in Bybit notation (1, 5, 15, 60, D)")
                .required(false),
        )
        .arg(
            Arg::new("limit")
                .long("limit")
                .help("Number of bars to fetch (max 1000)")
                .value_parser(clap::value_parser!(u16))
                .required(false),
        )
        .arg(
            Arg::new("export")
                .long("export")
                .help("Export every row to a CSV file")
                .value_name("FILE")
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

    if let Some(symbols) = matches.get_one::<String>("symbol") {
        config.kline.symbols = symbols
            .split(',')
            .map(|s| s.trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Some(interval) = matches.get_one::<String>("interval") {
        config.kline.interval = interval.clone();
    }
    if let Some(limit) = matches.get_one::<u16>("limit") {
        config.kline.limit = *limit;
    }

    info!(
        "Fetching {} bars of {} for {}",
        config.kline.limit,
        config.kline.interval,
        config.kline.symbols.join(", ")
    );

    let client = BybitClient::new(
        http_client(config.endpoints.request_timeout_secs)?,
        config.endpoints.bybit.clone(),
    );
    let results = fetch_all(&client, &config.kline).await?;

    if results.is_empty() {
        warn!("No kline data fetched");
        return Ok(());
    }

    for (symbol, rows) in &results {
        println!("{}", render_klines(symbol, rows));
    }

    if let Some(export_file) = matches.get_one::<String>("export") {
        let all: Vec<KlineRow> = results.into_iter().flat_map(|(_, rows)| rows).collect();
        export_klines(export_file, &all)?;
        info!("Klines exported to {}", export_file);
    }

    Ok(())
}
