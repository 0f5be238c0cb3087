//! Result assembly and performance metrics shared by every simulator.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const DAYS_PER_YEAR: f64 = 365.25;

/// One chartable observation, keyed by calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub time: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuyMarker {
    pub time: NaiveDate,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyResult {
    pub invest_count: usize,
    pub invested: f64,
    pub final_value: f64,
    pub total_return: f64,
    pub cagr: f64,
    pub max_drawdown: f64,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub price_series: Vec<SeriesPoint>,
    pub equity_series: Vec<SeriesPoint>,
    pub invested_series: Vec<SeriesPoint>,
    pub buy_markers: Vec<BuyMarker>,
}

/// Per-day accumulator filled by a simulator, one `record_day` per candle.
#[derive(Debug, Default)]
pub struct DailyTrace {
    price: Vec<SeriesPoint>,
    equity: Vec<SeriesPoint>,
    invested: Vec<SeriesPoint>,
    buys: Vec<BuyMarker>,
}

impl DailyTrace {
    pub fn with_capacity(days: usize) -> Self {
        Self {
            price: Vec::with_capacity(days),
            equity: Vec::with_capacity(days),
            invested: Vec::with_capacity(days),
            buys: Vec::new(),
        }
    }

    pub fn record_buy(&mut self, date: NaiveDate, price: f64) {
        self.buys.push(BuyMarker { time: date, price });
    }

    pub fn record_day(&mut self, date: NaiveDate, close: f64, equity: f64, invested: f64) {
        self.price.push(SeriesPoint {
            time: date,
            value: close,
        });
        self.equity.push(SeriesPoint {
            time: date,
            value: equity,
        });
        self.invested.push(SeriesPoint {
            time: date,
            value: invested,
        });
    }

    /// First day with capital deployed, else the first recorded day.
    fn anchor_date(&self) -> Option<NaiveDate> {
        self.invested
            .iter()
            .find(|p| p.value > 0.0)
            .or_else(|| self.invested.first())
            .map(|p| p.time)
    }

    /// Package the trace. `None` if no day was recorded.
    pub fn finish(self) -> Option<StrategyResult> {
        let start = self.anchor_date()?;
        let end = self.equity.last()?.time;
        let final_value = self.equity.last().map_or(0.0, |p| p.value);
        let invested = self.invested.last().map_or(0.0, |p| p.value);

        let equity_values: Vec<f64> = self.equity.iter().map(|p| p.value).collect();

        Some(StrategyResult {
            invest_count: self.buys.len(),
            invested,
            final_value,
            total_return: total_return(final_value, invested),
            cagr: compute_cagr(final_value, invested, start, end),
            max_drawdown: compute_max_drawdown(&equity_values),
            start,
            end,
            price_series: self.price,
            equity_series: self.equity,
            invested_series: self.invested,
            buy_markers: self.buys,
        })
    }
}

/// (final - invested) / invested, 0 when nothing was invested.
pub fn total_return(final_value: f64, invested: f64) -> f64 {
    if invested != 0.0 {
        (final_value - invested) / invested
    } else {
        0.0
    }
}

/// (final/invested)^(1/years) - 1 over `start..end`, floored to exactly 0
/// whenever the elapsed time, the invested capital or the final value is
/// not positive.
pub fn compute_cagr(final_value: f64, invested: f64, start: NaiveDate, end: NaiveDate) -> f64 {
    let years = (end - start).num_days() as f64 / DAYS_PER_YEAR;
    if years > 0.0 && invested > 0.0 && final_value > 0.0 {
        (final_value / invested).powf(1.0 / years) - 1.0
    } else {
        0.0
    }
}

/// Minimum of (equity - running_peak) / running_peak in one forward scan.
/// Points are skipped while the peak is not positive; the result is <= 0.
pub fn compute_max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &value in equity {
        peak = peak.max(value);
        if peak > 0.0 {
            max_dd = max_dd.min((value - peak) / peak);
        }
    }
    max_dd
}
