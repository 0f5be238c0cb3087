#![allow(dead_code)]

use chrono::NaiveDate;
use dcabench::domain::cadence::Frequency;
use dcabench::domain::candle::{Candle, DateWindow};
use dcabench::domain::dca::DcaConfig;
use dcabench::domain::error::DcaBenchError;
use dcabench::domain::split_buy::{SplitBuyConfig, SplitBuyVariant};
use dcabench::ports::candle_port::CandlePort;
use std::collections::HashMap;
use std::io::Write;

pub struct MockCandlePort {
    pub data: HashMap<String, Vec<Candle>>,
    pub errors: HashMap<String, String>,
}

impl MockCandlePort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_candles(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.data.insert(symbol.to_string(), candles);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl CandlePort for MockCandlePort {
    fn fetch_candles(&self, symbol: &str) -> Result<Vec<Candle>, DcaBenchError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(DcaBenchError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_candle(date: &str, close: f64) -> Candle {
    Candle::new(NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(), close)
}

/// One candle per calendar day starting at `start_date`.
pub fn candles_from_prices(start_date: &str, prices: &[f64]) -> Vec<Candle> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    prices
        .iter()
        .enumerate()
        .map(|(i, &p)| Candle::new(start + chrono::Duration::days(i as i64), p))
        .collect()
}

/// A saw-tooth series that dips and recovers, so every buy rule fires.
pub fn generate_candles(start_date: &str, count: usize, start_price: f64) -> Vec<Candle> {
    let prices: Vec<f64> = (0..count)
        .map(|i| {
            let cycle = (i % 20) as f64;
            let swing = if cycle < 10.0 { -cycle } else { cycle - 20.0 };
            start_price * (1.0 + 0.02 * swing) + i as f64 * 0.05
        })
        .collect();
    candles_from_prices(start_date, &prices)
}

pub fn daily_dca(amount: f64) -> DcaConfig {
    DcaConfig {
        amount_per_investment: amount,
        frequency: Frequency::Daily,
        window: DateWindow::default(),
    }
}

pub fn split_buy(variant: SplitBuyVariant, unit: f64, splits: f64) -> SplitBuyConfig {
    SplitBuyConfig::for_variant(variant, unit, splits, 0.10, DateWindow::default())
}

pub fn write_temp_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
