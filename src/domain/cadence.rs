//! Investment-day selection for fixed-cadence DCA.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::candle::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    /// Bucket a date into its investment period.
    pub fn period_key(self, date: NaiveDate) -> PeriodKey {
        match self {
            Frequency::Daily => PeriodKey::Day(date),
            Frequency::Weekly => {
                let week = date.iso_week();
                PeriodKey::IsoWeek {
                    year: week.year(),
                    week: week.week(),
                }
            }
            Frequency::Monthly => PeriodKey::Month {
                year: date.year(),
                month: date.month(),
            },
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Frequency::Daily => "Daily",
            Frequency::Weekly => "Weekly",
            Frequency::Monthly => "Monthly",
        };
        f.write_str(name)
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "d" => Ok(Frequency::Daily),
            "weekly" | "w" => Ok(Frequency::Weekly),
            "monthly" | "m" => Ok(Frequency::Monthly),
            other => Err(format!(
                "unknown frequency '{other}' (expected Daily, Weekly or Monthly)"
            )),
        }
    }
}

/// ISO weeks are keyed by ISO year, so Dec 30 and Jan 2 can share a week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeriodKey {
    Day(NaiveDate),
    IsoWeek { year: i32, week: u32 },
    Month { year: i32, month: u32 },
}

/// Mark the first observed candle of each period. `candles` must already be
/// normalized (ascending, one candle per date).
pub fn select_investment_days(candles: &[Candle], frequency: Frequency) -> Vec<bool> {
    let mut seen: HashSet<PeriodKey> = HashSet::new();
    candles
        .iter()
        .map(|c| seen.insert(frequency.period_key(c.date)))
        .collect()
}
