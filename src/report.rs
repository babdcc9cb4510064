//! Console reports. Everything renders to a `String` so the binaries
//! only print and the layout can be tested.

use rust_decimal::Decimal;
use std::fmt;

use crate::arbitrage::{Direction, PriceSnapshot, RankedOpportunity};
use crate::cardano::{display_unit, SwapRecord, VolumeStatistics};
use crate::config::ArbitrageConfig;
use crate::indicators::Signal;
use crate::kline::KlineRow;

const RULE: &str = "============================================================";
const MAX_RANKED: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct ReportSettings {
    pub min_profit_pct: Decimal,
    pub highlight_pct: Decimal,
    pub fee_estimate_pct: Decimal,
}

impl From<&ArbitrageConfig> for ReportSettings {
    fn from(config: &ArbitrageConfig) -> Self {
        Self {
            min_profit_pct: config.min_profit_pct,
            highlight_pct: config.highlight_pct,
            fee_estimate_pct: config.fee_estimate_pct,
        }
    }
}

fn direction_label(home: &str, away: &str, direction: Direction) -> String {
    match direction {
        Direction::HomeToAway => format!("{home}→{away}"),
        Direction::AwayToHome => format!("{away}→{home}"),
    }
}

fn signed(value: Decimal, dp: u32) -> String {
    let value = value.round_dp(dp);
    if value.is_sign_negative() || value.is_zero() {
        format!("{value:.dp$}", dp = dp as usize)
    } else {
        format!("+{value:.dp$}", dp = dp as usize)
    }
}

/// Snapshot header, optionally every currency's prices and legs, then the ranking.
pub fn render_arbitrage(
    home: &str,
    away: &str,
    snapshot: &PriceSnapshot,
    ranked: &[RankedOpportunity],
    settings: &ReportSettings,
    show_details: bool,
) -> String {
    ArbitrageReport {
        home,
        away,
        snapshot,
        ranked,
        settings,
        show_details,
    }
    .to_string()
}

struct ArbitrageReport<'a> {
    home: &'a str,
    away: &'a str,
    snapshot: &'a PriceSnapshot,
    ranked: &'a [RankedOpportunity],
    settings: &'a ReportSettings,
    show_details: bool,
}

impl ArbitrageReport<'_> {
    fn write_currency(&self, f: &mut fmt::Formatter<'_>, entry: &RankedOpportunity) -> fmt::Result {
        let (home, away) = (self.home, self.away);
        let prices = &entry.prices;
        let flag = if entry.profit_pct > self.settings.highlight_pct { " 🚀" } else { "" };
        writeln!(f)?;
        writeln!(f, "📊 {}{flag}", entry.currency)?;
        writeln!(f, "   {home:<10} bid ${:.6}  ask ${:.6}", prices.home.usd.bid, prices.home.usd.ask)?;
        writeln!(f, "   {away:<10} bid ${:.6}  ask ${:.6}", prices.away.bid, prices.away.ask)?;
        writeln!(
            f,
            "   {:<20} {}%",
            direction_label(home, away, Direction::HomeToAway),
            signed(entry.opportunity.home_to_away.pct, 3)
        )?;
        writeln!(
            f,
            "   {:<20} {}%",
            direction_label(home, away, Direction::AwayToHome),
            signed(entry.opportunity.away_to_home.pct, 3)
        )
    }

    fn write_ranking(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let min_profit = self.settings.min_profit_pct;
        let passing: Vec<&RankedOpportunity> = self
            .ranked
            .iter()
            .filter(|r| r.profit_pct > min_profit)
            .take(MAX_RANKED)
            .collect();

        if passing.is_empty() {
            writeln!(f, "⚠️  No opportunities above {min_profit:.2}%")?;
            if let Some(best) = self.ranked.first() {
                writeln!(
                    f,
                    "   Best available: {} {:.3}% ({})",
                    best.currency, best.profit_pct, best.direction_label
                )?;
            }
            return Ok(());
        }

        writeln!(f, "🏆 TOP OPPORTUNITIES (> {min_profit:.2}%)")?;
        for (i, r) in passing.iter().enumerate() {
            let net = r.profit_pct - self.settings.fee_estimate_pct;
            writeln!(
                f,
                "   {}. {:<6} {:.3}%  net {}%  {}",
                i + 1,
                r.currency,
                r.profit_pct,
                signed(net, 3),
                r.direction_label
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for ArbitrageReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot;
        writeln!(f, "{RULE}")?;
        writeln!(
            f,
            "💱 {} vs {} arbitrage  {}",
            self.home,
            self.away,
            snapshot.timestamp.format("%Y-%m-%d %H:%M:%S")
        )?;
        let fallback = if snapshot.usdjpy_fallback { " (fallback)" } else { "" };
        writeln!(f, "   USD/JPY: {:.2}{fallback}", snapshot.usdjpy_rate)?;
        writeln!(f, "{RULE}")?;

        if snapshot.currencies.is_empty() {
            return writeln!(f, "❌ No prices available");
        }

        if self.show_details {
            for entry in self.ranked {
                self.write_currency(f, entry)?;
            }
        }

        writeln!(f)?;
        self.write_ranking(f)?;
        writeln!(f, "{RULE}")
    }
}

/// One currency in depth: yen originals, spreads and both legs.
pub fn render_detail(home: &str, away: &str, usdjpy: Decimal, entry: &RankedOpportunity, settings: &ReportSettings) -> String {
    DetailReport {
        home,
        away,
        usdjpy,
        entry,
        settings,
    }
    .to_string()
}

struct DetailReport<'a> {
    home: &'a str,
    away: &'a str,
    usdjpy: Decimal,
    entry: &'a RankedOpportunity,
    settings: &'a ReportSettings,
}

impl fmt::Display for DetailReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (home, away, entry) = (self.home, self.away, self.entry);
        let prices = &entry.prices;
        writeln!(f, "{RULE}")?;
        writeln!(f, "🔍 {} detail  (USD/JPY {:.2})", entry.currency, self.usdjpy)?;
        writeln!(f, "{RULE}")?;

        let original = &prices.home.original;
        writeln!(f, "{home} ({})", prices.home.original_currency)?;
        writeln!(f, "   Bid:    {}", original.bid)?;
        writeln!(f, "   Ask:    {}", original.ask)?;
        writeln!(f, "   Last:   {}", original.last)?;
        writeln!(f, "   Spread: {}", original.spread())?;
        writeln!(f, "   USD:    bid ${:.6}  ask ${:.6}", prices.home.usd.bid, prices.home.usd.ask)?;
        writeln!(f)?;
        writeln!(f, "{away} (USD)")?;
        writeln!(f, "   Bid:    ${:.6}", prices.away.bid)?;
        writeln!(f, "   Ask:    ${:.6}", prices.away.ask)?;
        writeln!(f, "   Last:   ${:.6}", prices.away.last)?;
        writeln!(f, "   Spread: ${:.6}", prices.away.spread())?;
        writeln!(f)?;

        for (direction, leg) in [
            (Direction::HomeToAway, entry.opportunity.home_to_away),
            (Direction::AwayToHome, entry.opportunity.away_to_home),
        ] {
            let mark = if leg.pct > self.settings.highlight_pct { "✅ opportunity" } else { "" };
            writeln!(
                f,
                "   {:<20} diff ${:.6}  {}%  {mark}",
                direction_label(home, away, direction),
                leg.diff,
                signed(leg.pct, 3)
            )?;
        }
        let net = entry.profit_pct - self.settings.fee_estimate_pct;
        writeln!(
            f,
            "   Best: {} {:.3}%, after ~{:.2}% fees {}%",
            entry.direction_label,
            entry.profit_pct,
            self.settings.fee_estimate_pct,
            signed(net, 3)
        )
    }
}

pub fn render_currency_list(home: &str, away: &str, currencies: &[&str]) -> String {
    let mut lines = vec![format!("Supported currencies ({home} / {away}):")];
    lines.extend(currencies.chunks(10).map(|chunk| format!("   {}", chunk.join(", "))));
    lines.join("\n") + "\n"
}

fn kline_line(row: &KlineRow, rsi: Decimal) -> String {
    let atr = row.atr.map(|v| format!("{v:.4}")).unwrap_or_else(|| "-".to_string());
    let zone = match Signal::from_rsi(Some(rsi)) {
        Signal::Sell => "overbought",
        Signal::Buy => "oversold",
        Signal::Hold => "",
    };
    format!(
        "   {:<20} {:<14} {:>6.2}   {:<14} {}",
        row.open_time_jst().format("%Y-%m-%d %H:%M"),
        row.close,
        rsi,
        atr,
        zone
    )
}

/// Rows with a defined RSI only, newest last.
pub fn render_klines(symbol: &str, rows: &[KlineRow]) -> String {
    let mut lines = vec![
        format!("📈 {symbol}"),
        "   Time (JST)           Close          RSI      ATR            Zone".to_string(),
        "   ------------------------------------------------------------------".to_string(),
    ];
    let header_len = lines.len();
    lines.extend(rows.iter().filter_map(|row| row.rsi.map(|rsi| kline_line(row, rsi))));
    if lines.len() == header_len {
        lines.push("   Not enough candles for RSI".to_string());
    }
    lines.join("\n") + "\n"
}

pub fn render_cardano_stats(stats: &VolumeStatistics) -> String {
    let mut lines = vec![
        RULE.to_string(),
        "📊 CARDANO DEX SUMMARY".to_string(),
        format!("   Transactions:       {}", stats.total_transactions),
        format!("   Unique DEXes:       {}", stats.unique_dexes),
        format!("   ADA volume:         {:.2} ADA", stats.total_ada_volume),
        format!("   Average fee:        {:.6} ADA", stats.average_fee_ada),
        format!("   Arbitrage cand.:    {}", stats.arbitrage_candidates),
        String::new(),
        "🏦 BY DEX".to_string(),
    ];
    lines.extend(
        stats
            .transactions_by_dex
            .iter()
            .map(|(dex, count)| format!("   {dex:<14} {count}")),
    );
    lines.push(RULE.to_string());
    lines.join("\n") + "\n"
}

fn swap_line(swap: &SwapRecord) -> String {
    let token_in = swap.token_in.as_deref().map(display_unit).unwrap_or_else(|| "-".to_string());
    let token_out = swap.token_out.as_deref().map(display_unit).unwrap_or_else(|| "-".to_string());
    let flag = if swap.arbitrage { " ⚡" } else { "" };
    format!(
        "   {}… {:<12} {} {} → {} {}{flag}",
        swap.tx_hash.chars().take(12).collect::<String>(),
        swap.dex_name,
        swap.amount_in,
        token_in,
        swap.amount_out,
        token_out
    )
}

/// A few recent swaps, with decoded token names.
pub fn render_swap_samples(swaps: &[SwapRecord], limit: usize) -> String {
    let mut lines = vec![format!("🔄 RECENT SWAPS (Last {})", limit.min(swaps.len()))];
    lines.extend(swaps.iter().take(limit).map(swap_line));
    lines.join("\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrage::{calculate_opportunity, ConvertedQuote, CurrencyPrices};
    use crate::types::{Quote, QuoteCurrency};
    use chrono::Local;

    fn settings() -> ReportSettings {
        ReportSettings {
            min_profit_pct: Decimal::new(3, 1),
            highlight_pct: Decimal::new(5, 1),
            fee_estimate_pct: Decimal::new(5, 1),
        }
    }

    fn ranked(currency: &str, home_ask: i64, away_bid: i64) -> RankedOpportunity {
        let home = Quote {
            bid: Decimal::from(home_ask),
            ask: Decimal::from(home_ask),
            last: Decimal::from(home_ask),
        };
        let away = Quote {
            bid: Decimal::from(away_bid),
            ask: Decimal::from(away_bid),
            last: Decimal::from(away_bid),
        };
        let opportunity = calculate_opportunity(&home, &away);
        let (direction, best) = opportunity.best();
        RankedOpportunity {
            currency: currency.to_string(),
            profit_pct: best.pct.abs(),
            direction,
            direction_label: direction_label("Coincheck", "Kraken", direction),
            prices: CurrencyPrices {
                currency: currency.to_string(),
                home: ConvertedQuote {
                    usd: home,
                    original: home,
                    original_currency: QuoteCurrency::Jpy,
                },
                away,
            },
            opportunity,
        }
    }

    fn snapshot(entries: &[RankedOpportunity]) -> PriceSnapshot {
        PriceSnapshot {
            usdjpy_rate: Decimal::from(150),
            usdjpy_fallback: true,
            currencies: entries.iter().map(|e| e.prices.clone()).collect(),
            timestamp: Local::now(),
        }
    }

    #[test]
    fn ranking_lists_only_passing_currencies() {
        let entries = vec![ranked("BTC", 1000, 1020), ranked("ETH", 1000, 1001)];
        let text = render_arbitrage("Coincheck", "Kraken", &snapshot(&entries), &entries, &settings(), true);
        assert!(text.contains("USD/JPY: 150.00 (fallback)"));
        assert!(text.contains("📊 BTC 🚀"));
        assert!(text.contains("1. BTC"));
        assert!(text.contains("net +1.500%"));
        assert!(!text.contains("2. ETH"));
    }

    #[test]
    fn best_available_when_nothing_passes() {
        let entries = vec![ranked("ETH", 1000, 1001)];
        let text = render_arbitrage("Coincheck", "Kraken", &snapshot(&entries), &entries, &settings(), true);
        assert!(text.contains("No opportunities above 0.30%"));
        assert!(text.contains("Best available: ETH"));
    }

    #[test]
    fn summary_view_prints_only_the_ranking() {
        let entries = vec![ranked("BTC", 1000, 1020), ranked("ETH", 1000, 1001)];
        let text = render_arbitrage("Coincheck", "Kraken", &snapshot(&entries), &entries, &settings(), false);
        assert!(text.contains("USD/JPY: 150.00"));
        assert!(text.contains("1. BTC"));
        assert!(!text.contains("📊 BTC"));
        assert!(!text.contains("📊 ETH"));
        assert!(!text.contains("bid $"));
        assert!(text.ends_with(&format!("{RULE}\n")));
    }

    #[test]
    fn no_prices_short_circuits() {
        let text = render_arbitrage("Coincheck", "Kraken", &snapshot(&[]), &[], &settings(), true);
        assert!(text.contains("❌ No prices available"));
        assert!(!text.contains("TOP OPPORTUNITIES"));
    }

    #[test]
    fn currency_list_wraps_every_ten() {
        let currencies: Vec<&str> = vec!["BTC"; 12];
        let text = render_currency_list("Coincheck", "OKX", &currencies);
        assert_eq!(text.lines().count(), 3);
        assert!(text.starts_with("Supported currencies (Coincheck / OKX):\n"));
    }

    #[test]
    fn detail_shows_both_directions() {
        let entry = ranked("BTC", 1000, 1020);
        let text = render_detail("Coincheck", "Kraken", Decimal::from(150), &entry, &settings());
        assert!(text.contains("Coincheck (JPY)"));
        assert!(text.contains("Coincheck→Kraken"));
        assert!(text.contains("Kraken→Coincheck"));
        assert!(text.contains("✅ opportunity"));
    }

    #[test]
    fn signed_formatting() {
        assert_eq!(signed(Decimal::new(15, 1), 3), "+1.500");
        assert_eq!(signed(Decimal::new(-25, 2), 3), "-0.250");
        assert_eq!(signed(Decimal::ZERO, 2), "0.00");
    }

    #[test]
    fn kline_table_skips_rows_without_rsi() {
        use chrono::{TimeZone, Utc};
        let row = |hour: u32, rsi: Option<i64>| KlineRow {
            symbol: "BTCUSDT".to_string(),
            open_time: Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
            open: Decimal::from(100),
            high: Decimal::from(101),
            low: Decimal::from(99),
            close: Decimal::from(100),
            volume: Decimal::ONE,
            quote_volume: Decimal::from(100),
            rsi: rsi.map(Decimal::from),
            atr: None,
        };
        let text = render_klines("BTCUSDT", &[row(0, None), row(1, Some(80))]);
        assert!(!text.contains("2024-01-01 09:00"));
        assert!(text.contains("2024-01-01 10:00"));
        assert!(text.contains("overbought"));

        let empty = render_klines("BTCUSDT", &[row(0, None)]);
        assert!(empty.contains("Not enough candles for RSI"));
    }

    #[test]
    fn stats_by_dex() {
        let stats = VolumeStatistics {
            total_transactions: 3,
            unique_dexes: 2,
            total_ada_volume: Decimal::new(125, 1),
            average_fee_ada: Decimal::new(18, 2),
            transactions_by_dex: vec![("minswap".to_string(), 2), ("sundaeswap".to_string(), 1)],
            arbitrage_candidates: 1,
        };
        let text = render_cardano_stats(&stats);
        assert!(text.contains("ADA volume:         12.50 ADA"));
        assert!(text.contains("minswap        2"));
    }
}
