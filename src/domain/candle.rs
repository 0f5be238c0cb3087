//! Daily close observations and the candle normalizer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub date: NaiveDate,
    pub close: f64,
}

impl Candle {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }

    /// A candle is usable only with a finite, strictly positive close.
    pub fn is_valid(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}

/// Inclusive `[from, to]` date window. A missing bound means the series'
/// own first or last date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateWindow {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }
}

/// Sort ascending by date, drop invalid closes, keep the first occurrence of
/// each date and restrict to `window`.
///
/// Returns `None` when nothing survives; every simulator treats that as
/// "no result".
pub fn normalize(candles: &[Candle], window: DateWindow) -> Option<Vec<Candle>> {
    let mut out: Vec<Candle> = candles
        .iter()
        .filter(|c| c.is_valid() && window.contains(c.date))
        .copied()
        .collect();

    // stable sort, so dedup keeps the earliest input row for a date
    out.sort_by_key(|c| c.date);
    out.dedup_by_key(|c| c.date);

    if out.is_empty() { None } else { Some(out) }
}
