//! Cross-exchange price gaps between a JPY venue and a USD venue.

use chrono::{DateTime, Local};
use log::warn;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

use crate::api::{FxRateSource, QuoteSource};
use crate::types::{Quote, QuoteCurrency};

/// How a currency is named on each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairMapping {
    pub currency: &'static str,
    pub home: &'static str,
    pub away: &'static str,
}

const fn pair(currency: &'static str, home: &'static str, away: &'static str) -> PairMapping {
    PairMapping { currency, home, away }
}

pub const COINCHECK_OKX_PAIRS: &[PairMapping] = &[
    pair("BTC", "btc_jpy", "BTC-USDT"),
    pair("ETH", "eth_jpy", "ETH-USDT"),
    pair("XRP", "xrp_jpy", "XRP-USDT"),
    pair("LTC", "ltc_jpy", "LTC-USDT"),
    pair("BCH", "bch_jpy", "BCH-USDT"),
    pair("XLM", "xlm_jpy", "XLM-USDT"),
    pair("BAT", "bat_jpy", "BAT-USDT"),
    pair("QTUM", "qtum_jpy", "QTUM-USDT"),
    pair("IOST", "iost_jpy", "IOST-USDT"),
    pair("ENJ", "enj_jpy", "ENJ-USDT"),
    pair("SAND", "sand_jpy", "SAND-USDT"),
    pair("DOT", "dot_jpy", "DOT-USDT"),
    pair("CHZ", "chz_jpy", "CHZ-USDT"),
    pair("LINK", "link_jpy", "LINK-USDT"),
    pair("MKR", "mkr_jpy", "MKR-USDT"),
    pair("MATIC", "matic_jpy", "MATIC-USDT"),
    pair("APE", "ape_jpy", "APE-USDT"),
    pair("AXS", "axs_jpy", "AXS-USDT"),
    pair("IMX", "imx_jpy", "IMX-USDT"),
    pair("SHIB", "shib_jpy", "SHIB-USDT"),
    pair("AVAX", "avax_jpy", "AVAX-USDT"),
    pair("DOGE", "doge_jpy", "DOGE-USDT"),
    pair("MANA", "mana_jpy", "MANA-USDT"),
    pair("GRT", "grt_jpy", "GRT-USDT"),
    pair("WBTC", "wbtc_jpy", "WBTC-USDT"),
    pair("DAI", "dai_jpy", "DAI-USDT"),
];

pub const COINCHECK_KRAKEN_PAIRS: &[PairMapping] = &[
    pair("BTC", "btc_jpy", "XBTUSD"),
    pair("ETH", "eth_jpy", "ETHUSD"),
    pair("XRP", "xrp_jpy", "XRPUSD"),
    pair("BCH", "bch_jpy", "BCHUSD"),
    pair("XLM", "xlm_jpy", "XLMUSD"),
    pair("BAT", "bat_jpy", "BATUSD"),
    pair("QTUM", "qtum_jpy", "QTUMUSD"),
    pair("DOT", "dot_jpy", "DOTUSD"),
    pair("LINK", "link_jpy", "LINKUSD"),
    pair("MATIC", "matic_jpy", "MATICUSD"),
    pair("AVAX", "avax_jpy", "AVAXUSD"),
    pair("DOGE", "doge_jpy", "DOGEUSD"),
    pair("MANA", "mana_jpy", "MANAUSD"),
    pair("GRT", "grt_jpy", "GRTUSD"),
    pair("MKR", "mkr_jpy", "MKRUSD"),
    pair("SHIB", "shib_jpy", "SHIBUSD"),
    pair("ADA", "ada_jpy", "ADAUSD"),
    pair("SOL", "sol_jpy", "SOLUSD"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwayVenue {
    Okx,
    Kraken,
}

impl AwayVenue {
    pub fn pairs(&self) -> &'static [PairMapping] {
        match self {
            AwayVenue::Okx => COINCHECK_OKX_PAIRS,
            AwayVenue::Kraken => COINCHECK_KRAKEN_PAIRS,
        }
    }
}

impl FromStr for AwayVenue {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "okx" => Ok(AwayVenue::Okx),
            "kraken" => Ok(AwayVenue::Kraken),
            other => Err(anyhow::anyhow!("Unknown venue `{other}` (expected okx or kraken)")),
        }
    }
}

/// Home-venue quote on a dollar basis, with the yen prices it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedQuote {
    pub usd: Quote,
    pub original: Quote,
    pub original_currency: QuoteCurrency,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyPrices {
    pub currency: String,
    pub home: ConvertedQuote,
    pub away: Quote,
}

#[derive(Debug, Clone)]
pub struct PriceSnapshot {
    pub usdjpy_rate: Decimal,
    pub usdjpy_fallback: bool,
    pub currencies: Vec<CurrencyPrices>,
    pub timestamp: DateTime<Local>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leg {
    pub diff: Decimal,
    pub pct: Decimal,
}

/// Both directions: buy on one venue's ask, sell on the other's bid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Opportunity {
    pub home_to_away: Leg,
    pub away_to_home: Leg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    HomeToAway,
    AwayToHome,
}

impl Opportunity {
    /// The direction with the larger absolute gap; ties go away→home.
    pub fn best(&self) -> (Direction, Leg) {
        if self.home_to_away.pct.abs() > self.away_to_home.pct.abs() {
            (Direction::HomeToAway, self.home_to_away)
        } else {
            (Direction::AwayToHome, self.away_to_home)
        }
    }
}

#[derive(Debug, Clone)]
pub struct RankedOpportunity {
    pub currency: String,
    pub profit_pct: Decimal,
    pub direction: Direction,
    pub direction_label: String,
    pub prices: CurrencyPrices,
    pub opportunity: Opportunity,
}

fn leg(buy_ask: Decimal, sell_bid: Decimal) -> Leg {
    let diff = sell_bid - buy_ask;
    let pct = if buy_ask.is_zero() {
        Decimal::ZERO
    } else {
        diff / buy_ask * Decimal::from(100)
    };
    Leg { diff, pct }
}

pub fn calculate_opportunity(home: &Quote, away: &Quote) -> Opportunity {
    Opportunity {
        home_to_away: leg(home.ask, away.bid),
        away_to_home: leg(away.ask, home.bid),
    }
}

pub fn to_usd(quote: &Quote, currency: QuoteCurrency, usdjpy: Decimal) -> Quote {
    let convert = |v: Decimal| match currency {
        QuoteCurrency::Jpy if !usdjpy.is_zero() => (v / usdjpy).round_dp(6),
        _ => v.round_dp(6),
    };
    Quote {
        bid: convert(quote.bid),
        ask: convert(quote.ask),
        last: convert(quote.last),
    }
}

pub struct ArbitrageScanner {
    fx: Arc<dyn FxRateSource>,
    home: Arc<dyn QuoteSource>,
    away: Arc<dyn QuoteSource>,
    pairs: Vec<PairMapping>,
    fallback_usdjpy: Decimal,
}

impl ArbitrageScanner {
    pub fn new(
        fx: Arc<dyn FxRateSource>,
        home: Arc<dyn QuoteSource>,
        away: Arc<dyn QuoteSource>,
        pairs: &[PairMapping],
        fallback_usdjpy: Decimal,
    ) -> Self {
        Self {
            fx,
            home,
            away,
            pairs: pairs.to_vec(),
            fallback_usdjpy,
        }
    }

    pub fn home_name(&self) -> &str {
        self.home.name()
    }

    pub fn away_name(&self) -> &str {
        self.away.name()
    }

    pub fn available_currencies(&self) -> Vec<&'static str> {
        self.pairs.iter().map(|p| p.currency).collect()
    }

    pub fn mapping(&self, currency: &str) -> Option<&PairMapping> {
        self.pairs.iter().find(|p| p.currency == currency)
    }

    pub fn direction_label(&self, direction: Direction) -> String {
        match direction {
            Direction::HomeToAway => format!("{}→{}", self.home.name(), self.away.name()),
            Direction::AwayToHome => format!("{}→{}", self.away.name(), self.home.name()),
        }
    }

    /// USD/JPY, or the configured fallback when the rate can't be fetched.
    pub async fn usd_jpy_rate(&self) -> (Decimal, bool) {
        match self.fx.usd_jpy().await {
            Ok(rate) if rate > Decimal::ZERO => (rate, false),
            Ok(rate) => {
                warn!("Ignoring non-positive USD/JPY rate {rate}, using fallback");
                (self.fallback_usdjpy, true)
            }
            Err(e) => {
                warn!("Failed to fetch USD/JPY rate: {e}");
                (self.fallback_usdjpy, true)
            }
        }
    }

    /// Quotes from both venues for `currencies` (the first five supported
    /// currencies when empty). Currencies missing on either side are dropped.
    pub async fn get_all_prices(&self, currencies: &[String]) -> PriceSnapshot {
        let (usdjpy_rate, usdjpy_fallback) = self.usd_jpy_rate().await;

        let selected: Vec<String> = if currencies.is_empty() {
            self.pairs.iter().take(5).map(|p| p.currency.to_string()).collect()
        } else {
            currencies.iter().map(|c| c.to_ascii_uppercase()).collect()
        };

        let mut prices = Vec::new();
        for currency in selected {
            let Some(mapping) = self.mapping(&currency).copied() else {
                warn!("{currency} is not supported");
                continue;
            };

            let (home, away) = tokio::join!(
                self.home.fetch_quote(mapping.home),
                self.away.fetch_quote(mapping.away)
            );

            match (home, away) {
                (Ok(home), Ok(away)) => prices.push(CurrencyPrices {
                    currency,
                    home: ConvertedQuote {
                        usd: to_usd(&home, self.home.currency(), usdjpy_rate),
                        original: home,
                        original_currency: self.home.currency(),
                    },
                    away: to_usd(&away, self.away.currency(), usdjpy_rate),
                }),
                (Ok(_), Err(e)) => warn!("{currency}: {} price fetch failed: {e}", self.away.name()),
                (Err(e), Ok(_)) => warn!("{currency}: {} price fetch failed: {e}", self.home.name()),
                (Err(home_err), Err(away_err)) => {
                    warn!("{currency}: both venues failed: {home_err}; {away_err}")
                }
            }
        }

        PriceSnapshot {
            usdjpy_rate,
            usdjpy_fallback,
            currencies: prices,
            timestamp: Local::now(),
        }
    }

    /// Every currency in the snapshot, best gap first.
    pub fn rank(&self, snapshot: &PriceSnapshot) -> Vec<RankedOpportunity> {
        let mut ranked: Vec<RankedOpportunity> = snapshot
            .currencies
            .iter()
            .map(|prices| {
                let opportunity = calculate_opportunity(&prices.home.usd, &prices.away);
                let (direction, best) = opportunity.best();
                RankedOpportunity {
                    currency: prices.currency.clone(),
                    profit_pct: best.pct.abs(),
                    direction,
                    direction_label: self.direction_label(direction),
                    prices: prices.clone(),
                    opportunity,
                }
            })
            .collect();

        ranked.sort_by(|a, b| b.profit_pct.cmp(&a.profit_pct));
        ranked
    }
}
