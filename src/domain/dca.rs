//! Fixed-cadence dollar-cost averaging.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cadence::{select_investment_days, Frequency};
use super::candle::{normalize, Candle, DateWindow};
use super::metrics::{DailyTrace, StrategyResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DcaConfig {
    pub amount_per_investment: f64,
    pub frequency: Frequency,
    pub window: DateWindow,
}

/// Buy a fixed amount on the first observed day of every period and mark the
/// position to market every day.
///
/// Returns `None` for empty input, a non-positive amount, or an empty range.
pub fn run_dca(candles: &[Candle], config: &DcaConfig) -> Option<StrategyResult> {
    let amount = config.amount_per_investment;
    if candles.is_empty() || !(amount.is_finite() && amount > 0.0) {
        return None;
    }
    let ranged = normalize(candles, config.window)?;
    let invest_days = select_investment_days(&ranged, config.frequency);

    debug!(
        days = ranged.len(),
        frequency = %config.frequency,
        amount,
        "running dca simulation"
    );

    let mut shares = 0.0_f64;
    let mut invested = 0.0_f64;
    let mut trace = DailyTrace::with_capacity(ranged.len());

    for (candle, &is_invest_day) in ranged.iter().zip(&invest_days) {
        if is_invest_day {
            shares += amount / candle.close;
            invested += amount;
            trace.record_buy(candle.date, candle.close);
        }
        trace.record_day(candle.date, candle.close, shares * candle.close, invested);
    }

    trace.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn daily(amount: f64) -> DcaConfig {
        DcaConfig {
            amount_per_investment: amount,
            frequency: Frequency::Daily,
            window: DateWindow::default(),
        }
    }

    #[test]
    fn three_day_daily_scenario() {
        let candles = vec![
            Candle::new(d(2024, 1, 1), 10.0),
            Candle::new(d(2024, 1, 2), 20.0),
            Candle::new(d(2024, 1, 3), 5.0),
        ];
        let r = run_dca(&candles, &daily(100.0)).unwrap();

        let equity: Vec<f64> = r.equity_series.iter().map(|p| p.value).collect();
        assert_abs_diff_eq!(equity[0], 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(equity[1], 300.0, epsilon = 1e-9);
        assert_abs_diff_eq!(equity[2], 175.0, epsilon = 1e-9);

        assert_eq!(r.invest_count, 3);
        assert_abs_diff_eq!(r.invested, 300.0);
        assert_abs_diff_eq!(r.final_value, 175.0, epsilon = 1e-9);
        assert_abs_diff_eq!(r.total_return, -125.0 / 300.0, epsilon = 1e-9);
        assert_abs_diff_eq!(r.max_drawdown, -125.0 / 300.0, epsilon = 1e-9);
        assert_eq!(r.start, d(2024, 1, 1));
        assert_eq!(r.end, d(2024, 1, 3));
    }

    #[test]
    fn monthly_invests_once_per_month_but_tracks_every_day() {
        let candles: Vec<_> = (1..=31)
            .map(|i| Candle::new(d(2024, 1, i), 10.0))
            .chain((1..=10).map(|i| Candle::new(d(2024, 2, i), 20.0)))
            .collect();
        let config = DcaConfig {
            frequency: Frequency::Monthly,
            ..daily(100.0)
        };
        let r = run_dca(&candles, &config).unwrap();

        assert_eq!(r.invest_count, 2);
        assert_eq!(r.buy_markers[0].time, d(2024, 1, 1));
        assert_eq!(r.buy_markers[1].time, d(2024, 2, 1));
        assert_eq!(r.equity_series.len(), 41);
        assert_eq!(r.invested_series.len(), 41);
        assert_abs_diff_eq!(r.invested_series[30].value, 100.0);
        assert_abs_diff_eq!(r.invested_series[31].value, 200.0);
        // 10 shares @10 + 5 shares @20, marked at 20
        assert_abs_diff_eq!(r.final_value, 300.0, epsilon = 1e-9);
    }

    #[test]
    fn start_is_first_investment_day_within_window() {
        let candles: Vec<_> = (1..=10).map(|i| Candle::new(d(2024, 3, i), 5.0)).collect();
        let config = DcaConfig {
            window: DateWindow::new(Some(d(2024, 3, 4)), Some(d(2024, 3, 8))),
            ..daily(10.0)
        };
        let r = run_dca(&candles, &config).unwrap();
        assert_eq!(r.start, d(2024, 3, 4));
        assert_eq!(r.end, d(2024, 3, 8));
        assert_eq!(r.invest_count, 5);
    }

    #[test]
    fn degenerate_inputs_return_none() {
        let candles = vec![Candle::new(d(2024, 1, 1), 10.0)];
        assert!(run_dca(&[], &daily(100.0)).is_none());
        assert!(run_dca(&candles, &daily(0.0)).is_none());
        assert!(run_dca(&candles, &daily(-5.0)).is_none());
        assert!(run_dca(&candles, &daily(f64::NAN)).is_none());

        let config = DcaConfig {
            window: DateWindow::new(Some(d(2030, 1, 1)), None),
            ..daily(100.0)
        };
        assert!(run_dca(&candles, &config).is_none());
    }

    #[test]
    fn single_day_has_zero_cagr() {
        let candles = vec![Candle::new(d(2024, 1, 1), 10.0)];
        let r = run_dca(&candles, &daily(100.0)).unwrap();
        assert_eq!(r.cagr, 0.0);
        assert_eq!(r.max_drawdown, 0.0);
    }

    #[test]
    fn cagr_over_two_years() {
        let candles = vec![
            Candle::new(d(2020, 1, 1), 10.0),
            Candle::new(d(2022, 1, 1), 40.0),
        ];
        let config = DcaConfig {
            frequency: Frequency::Monthly,
            ..daily(100.0)
        };
        let r = run_dca(&candles, &config).unwrap();
        // 10 + 2.5 shares at 40 = 500; invested 200
        let years = 731.0 / 365.25;
        assert_abs_diff_eq!(r.final_value, 500.0, epsilon = 1e-9);
        assert_abs_diff_eq!(r.cagr, 2.5_f64.powf(1.0 / years) - 1.0, epsilon = 1e-12);
    }
}
