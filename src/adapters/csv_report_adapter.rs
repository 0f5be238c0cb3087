//! CSV report adapter: one row per simulated day.
//!
//! Columns are `date,price,equity,invested,buy`, where `buy` counts the
//! half-round or periodic purchases made that day.

use crate::domain::error::DcaBenchError;
use crate::domain::metrics::StrategyResult;
use crate::domain::strategy::StrategySpec;
use crate::ports::report_port::ReportPort;

const HEADER: [&str; 5] = ["date", "price", "equity", "invested", "buy"];

#[derive(Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn report_err(e: impl std::fmt::Display) -> DcaBenchError {
    DcaBenchError::Report {
        reason: format!("CSV report failed: {}", e),
    }
}

impl ReportPort for CsvReportAdapter {
    fn render(&self, result: &StrategyResult, _spec: &StrategySpec) -> Result<String, DcaBenchError> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(HEADER).map_err(report_err)?;

        // Markers are in date order, so a single cursor pairs them with days.
        let mut markers = result.buy_markers.iter().peekable();
        let days = result
            .price_series
            .iter()
            .zip(&result.equity_series)
            .zip(&result.invested_series);
        for ((price, equity), invested) in days {
            let mut buys = 0usize;
            while markers.next_if(|m| m.time == price.time).is_some() {
                buys += 1;
            }
            wtr.write_record([
                price.time.format("%Y-%m-%d").to_string(),
                price.value.to_string(),
                equity.value.to_string(),
                invested.value.to_string(),
                buys.to_string(),
            ])
            .map_err(report_err)?;
        }

        let bytes = wtr.into_inner().map_err(report_err)?;
        String::from_utf8(bytes).map_err(report_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::{Candle, DateWindow};
    use crate::domain::split_buy::{run_split_buy, SplitBuyConfig, SplitBuyVariant};
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn one_row_per_day_with_buy_counts() {
        let config = SplitBuyConfig::for_variant(
            SplitBuyVariant::V1,
            100.0,
            4.0,
            0.10,
            DateWindow::default(),
        );
        let candles = vec![
            Candle::new(d(1), 10.0),
            Candle::new(d(2), 9.0),
            Candle::new(d(3), 11.5),
        ];
        let result = run_split_buy(&candles, &config).unwrap();
        let csv = CsvReportAdapter::new()
            .render(&result, &StrategySpec::SplitBuy(config))
            .unwrap();

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "date,price,equity,invested,buy");
        assert_eq!(lines[1], "2024-01-01,10,50,50,1");
        // primary plus average-down on the dip
        assert!(lines[2].starts_with("2024-01-02,9,"));
        assert!(lines[2].ends_with(",150,2"));
        assert!(lines[3].starts_with("2024-01-03,11.5,"));
        assert!(lines[3].ends_with(",200,1"));
    }
}
