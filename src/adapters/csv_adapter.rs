//! CSV candle adapter.
//!
//! Reads a header row plus one row per day. The date column may be a plain
//! `YYYY-MM-DD` date or an RFC 3339 timestamp (its UTC calendar day is used).
//! The adjusted-close column is used for the whole file when any row has a
//! value in it; otherwise the raw close is used.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, warn};

use crate::domain::candle::Candle;
use crate::domain::error::DcaBenchError;
use crate::ports::candle_port::CandlePort;

const DATE_HEADERS: &[&str] = &["date", "time", "timestamp", "datetime"];
const ADJ_CLOSE_HEADERS: &[&str] = &["adjclose", "adjustedclose"];
const CLOSE_HEADERS: &[&str] = &["close", "price", "value"];

pub struct CsvAdapter {
    source: PathBuf,
}

struct Columns {
    date: usize,
    adj_close: Option<usize>,
    close: Option<usize>,
}

impl CsvAdapter {
    /// `source` is either a CSV file or a directory holding `<SYMBOL>.csv`
    /// files.
    pub fn new(source: PathBuf) -> Self {
        Self { source }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        if self.source.is_dir() {
            self.source.join(format!("{}.csv", symbol))
        } else {
            self.source.clone()
        }
    }

    /// Parse CSV text into raw candles, in file order.
    pub fn parse(content: &str) -> Result<Vec<Candle>, DcaBenchError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers = rdr.headers().map_err(|e| DcaBenchError::Data {
            reason: format!("CSV header error: {}", e),
        })?;
        let columns = locate_columns(headers)?;

        let mut rows = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| DcaBenchError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;
            // header is line 1
            let row = line + 2;

            let date_str = record.get(columns.date).unwrap_or_default();
            let date = parse_date(date_str).ok_or_else(|| DcaBenchError::Data {
                reason: format!("invalid date '{}' on line {}", date_str, row),
            })?;

            let adj_close = columns.adj_close.and_then(|i| parse_price(record.get(i)));
            let close = columns.close.and_then(|i| parse_price(record.get(i)));
            rows.push((row, date, adj_close, close));
        }

        // one price column for the whole file, never a per-row mix
        let use_adjusted = rows.iter().any(|(_, _, adj, _)| adj.is_some());

        let mut candles = Vec::with_capacity(rows.len());
        for (row, date, adj_close, close) in rows {
            let price = if use_adjusted { adj_close } else { close };
            match price {
                Some(close) => candles.push(Candle::new(date, close)),
                None => warn!(line = row, %date, "skipping row without a price"),
            }
        }

        Ok(candles)
    }
}

impl CandlePort for CsvAdapter {
    fn fetch_candles(&self, symbol: &str) -> Result<Vec<Candle>, DcaBenchError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| DcaBenchError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        let candles = Self::parse(&content)?;
        debug!(path = %path.display(), rows = candles.len(), "loaded candles");
        Ok(candles)
    }
}

fn normalize_header(h: &str) -> String {
    h.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .collect::<String>()
        .to_ascii_lowercase()
}

fn find_column(headers: &[String], names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| names.contains(&h.as_str()))
}

fn locate_columns(headers: &csv::StringRecord) -> Result<Columns, DcaBenchError> {
    let normalized: Vec<String> = headers.iter().map(normalize_header).collect();

    let date = find_column(&normalized, DATE_HEADERS).ok_or_else(|| DcaBenchError::Data {
        reason: "missing date column".into(),
    })?;
    let adj_close = find_column(&normalized, ADJ_CLOSE_HEADERS);
    let close = find_column(&normalized, CLOSE_HEADERS);

    if adj_close.is_none() && close.is_none() {
        return Err(DcaBenchError::Data {
            reason: "missing close column".into(),
        });
    }
    Ok(Columns {
        date,
        adj_close,
        close,
    })
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).date_naive())
    })
}

fn parse_price(field: Option<&str>) -> Option<f64> {
    let s = field?;
    if s.is_empty() || s.eq_ignore_ascii_case("null") {
        return None;
    }
    s.parse().ok()
}
