use rust_decimal::Decimal;
use std::collections::VecDeque;

use crate::types::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    /// Above 70 is overbought, below 30 oversold.
    pub fn from_rsi(rsi: Option<Decimal>) -> Self {
        match rsi {
            Some(rsi) if rsi > Decimal::from(70) => Signal::Sell,
            Some(rsi) if rsi < Decimal::from(30) => Signal::Buy,
            _ => Signal::Hold,
        }
    }
}

/// Simple rolling mean over the last `period` values.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    period: usize,
    values: VecDeque<Decimal>,
    sum: Decimal,
}

impl MovingAverage {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
            values: VecDeque::new(),
            sum: Decimal::ZERO,
        }
    }

    pub fn update(&mut self, value: Decimal) -> Option<Decimal> {
        self.values.push_back(value);
        self.sum += value;

        if self.values.len() > self.period {
            if let Some(old_value) = self.values.pop_front() {
                self.sum -= old_value;
            }
        }

        self.current()
    }

    pub fn current(&self) -> Option<Decimal> {
        if self.values.len() == self.period {
            Some(self.sum / Decimal::from(self.period))
        } else {
            None
        }
    }
}

/// RSI using a simple rolling mean of gains and losses (not Wilder smoothing).
#[derive(Debug, Clone)]
pub struct RSI {
    avg_gain: MovingAverage,
    avg_loss: MovingAverage,
    previous_close: Option<Decimal>,
    value: Option<Decimal>,
}

impl RSI {
    pub fn new(period: usize) -> Self {
        Self {
            avg_gain: MovingAverage::new(period),
            avg_loss: MovingAverage::new(period),
            previous_close: None,
            value: None,
        }
    }

    pub fn update(&mut self, close: Decimal) -> Option<Decimal> {
        // The first bar has no delta; it counts as neither gain nor loss
        let change = match self.previous_close.replace(close) {
            Some(prev_close) => close - prev_close,
            None => Decimal::ZERO,
        };
        let gain = change.max(Decimal::ZERO);
        let loss = (-change).max(Decimal::ZERO);

        let avg_gain = self.avg_gain.update(gain);
        let avg_loss = self.avg_loss.update(loss);

        self.value = match (avg_gain, avg_loss) {
            (Some(g), Some(l)) => rsi_from_averages(g, l),
            _ => None,
        };
        self.value
    }

    pub fn current(&self) -> Option<Decimal> {
        self.value
    }

    pub fn signal(&self) -> Signal {
        Signal::from_rsi(self.value)
    }
}

fn rsi_from_averages(avg_gain: Decimal, avg_loss: Decimal) -> Option<Decimal> {
    if avg_loss == Decimal::ZERO {
        // A flat window has no defined RSI
        return (avg_gain > Decimal::ZERO).then(|| Decimal::from(100));
    }
    let rs = avg_gain / avg_loss;
    Some(Decimal::from(100) - (Decimal::from(100) / (Decimal::ONE + rs)))
}

/// Average true range as a simple rolling mean of TR.
/// The first bar only seeds the previous close; it has no TR of its own.
#[derive(Debug, Clone)]
pub struct ATR {
    tr_average: MovingAverage,
    previous_close: Option<Decimal>,
    value: Option<Decimal>,
}

impl ATR {
    pub fn new(period: usize) -> Self {
        Self {
            tr_average: MovingAverage::new(period),
            previous_close: None,
            value: None,
        }
    }

    pub fn update(&mut self, high: Decimal, low: Decimal, close: Decimal) -> Option<Decimal> {
        let prev_close = self.previous_close.replace(close)?;

        let tr = true_range(high, low, prev_close);
        self.value = self.tr_average.update(tr);
        self.value
    }

    pub fn current(&self) -> Option<Decimal> {
        self.value
    }
}

pub fn true_range(high: Decimal, low: Decimal, prev_close: Decimal) -> Decimal {
    (high - low)
        .max((high - prev_close).abs())
        .max((low - prev_close).abs())
}

/// RSI for every bar, aligned with `candles` (oldest first).
pub fn rsi_series(candles: &[Candle], period: usize) -> Vec<Option<Decimal>> {
    let mut rsi = RSI::new(period);
    candles.iter().map(|c| rsi.update(c.close)).collect()
}

/// ATR for every bar, aligned with `candles` (oldest first).
pub fn atr_series(candles: &[Candle], period: usize) -> Vec<Option<Decimal>> {
    let mut atr = ATR::new(period);
    candles
        .iter()
        .map(|c| atr.update(c.high, c.low, c.close))
        .collect()
}

/// Fractional change from `from` to `to`; `None` when `from` isn't positive.
pub fn percent_change(from: Decimal, to: Decimal) -> Option<Decimal> {
    if from > Decimal::ZERO {
        Some((to - from) / from)
    } else {
        None
    }
}
