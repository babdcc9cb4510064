use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction, Command};
use log::{error, info};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

use market_scout::api::coincheck::CoincheckClient;
use market_scout::api::fx::FxClient;
use market_scout::api::kraken::KrakenClient;
use market_scout::api::okx::OkxClient;
use market_scout::api::{http_client, QuoteSource};
use market_scout::arbitrage::{ArbitrageScanner, AwayVenue};
use market_scout::config::Config;
use market_scout::report::{render_arbitrage, render_currency_list, render_detail, ReportSettings};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("Market Scout Arbitrage")
        .version("1.0")
        .about("Compare Coincheck JPY prices against a USD venue")
        .arg(
            Arg::new("venue")
                .long("venue")
                .help("USD venue to compare against (okx, kraken)")
                .required(false),
        )
        .arg(
            Arg::new("currencies")
                .long("currencies")
                .help("Comma-separated currencies (e.g., BTC,ETH,XRP)")
                .required(false),
        )
        .arg(
            Arg::new("min-profit")
                .long("min-profit")
                .help("Minimum gap in percent to rank an opportunity")
                .required(false),
        )
        .arg(
            Arg::new("monitor")
                .long("monitor")
                .help("Keep polling until Ctrl+C")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("interval")
                .long("interval")
                .help("Seconds between polls in monitor mode")
                .value_parser(clap::value_parser!(u64))
                .required(false),
        )
        .arg(
            Arg::new("detail")
                .long("detail")
                .help("Show one currency in depth")
                .value_name("CURRENCY")
                .required(false),
        )
        .arg(
            Arg::new("list")
                .long("list")
                .help("List supported currencies and exit")
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

    if let Some(venue) = matches.get_one::<String>("venue") {
        config.arbitrage.venue = venue.clone();
    }
    if let Some(currencies) = matches.get_one::<String>("currencies") {
        config.arbitrage.currencies = currencies
            .split(',')
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty())
            .collect();
    }
    if let Some(min_profit) = matches.get_one::<String>("min-profit") {
        config.arbitrage.min_profit_pct = Decimal::from_str(min_profit)?;
    }
    if let Some(interval) = matches.get_one::<u64>("interval") {
        config.arbitrage.monitor_interval_secs = *interval;
    }

    let venue = AwayVenue::from_str(&config.arbitrage.venue)?;
    let http = http_client(config.endpoints.request_timeout_secs)?;
    let away: Arc<dyn QuoteSource> = match venue {
        AwayVenue::Okx => Arc::new(OkxClient::new(http.clone(), config.endpoints.okx.clone())),
        AwayVenue::Kraken => Arc::new(KrakenClient::new(http.clone(), config.endpoints.kraken.clone())),
    };
    let scanner = ArbitrageScanner::new(
        Arc::new(FxClient::new(http.clone(), config.endpoints.fx.clone())),
        Arc::new(CoincheckClient::new(http, config.endpoints.coincheck.clone())),
        away,
        venue.pairs(),
        config.arbitrage.fallback_usdjpy,
    );
    let settings = ReportSettings::from(&config.arbitrage);

    if matches.get_flag("list") {
        print!(
            "{}",
            render_currency_list(scanner.home_name(), scanner.away_name(), &scanner.available_currencies())
        );
        return Ok(());
    }

    if let Some(currency) = matches.get_one::<String>("detail") {
        let currency = currency.to_ascii_uppercase();
        let snapshot = scanner.get_all_prices(std::slice::from_ref(&currency)).await;
        let ranked = scanner.rank(&snapshot);
        let entry = ranked
            .first()
            .ok_or_else(|| anyhow!("No prices available for {currency}"))?;
        print!(
            "{}",
            render_detail(scanner.home_name(), scanner.away_name(), snapshot.usdjpy_rate, entry, &settings)
        );
        return Ok(());
    }

    if !matches.get_flag("monitor") {
        let snapshot = scanner.get_all_prices(&config.arbitrage.currencies).await;
        let ranked = scanner.rank(&snapshot);
        print!(
            "{}",
            render_arbitrage(scanner.home_name(), scanner.away_name(), &snapshot, &ranked, &settings, true)
        );
        return Ok(());
    }

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    ctrlc::set_handler(move || {
        info!("Received Ctrl+C, stopping monitor...");
        running_clone.store(false, Ordering::SeqCst);
    })?;

    info!(
        "Monitoring {} vs {} every {}s (Ctrl+C to stop)",
        scanner.home_name(),
        scanner.away_name(),
        config.arbitrage.monitor_interval_secs
    );
    let mut interval = time::interval(Duration::from_secs(config.arbitrage.monitor_interval_secs.max(1)));

    while running.load(Ordering::SeqCst) {
        interval.tick().await;
        if !running.load(Ordering::SeqCst) {
            break;
        }

        let snapshot = scanner.get_all_prices(&config.arbitrage.currencies).await;
        if snapshot.currencies.is_empty() {
            error!("No prices fetched this round");
        }
        let ranked = scanner.rank(&snapshot);
        print!(
            "{}",
            render_arbitrage(scanner.home_name(), scanner.away_name(), &snapshot, &ranked, &settings, false)
        );
    }

    info!("Monitor stopped");
    Ok(())
}
