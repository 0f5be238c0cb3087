//! Candle source port.

use crate::domain::candle::Candle;
use crate::domain::error::DcaBenchError;

/// Supplies raw `{date, close}` observations. Sources may return candles in
/// any order and may include invalid rows; the engine normalizes them.
pub trait CandlePort {
    fn fetch_candles(&self, symbol: &str) -> Result<Vec<Candle>, DcaBenchError>;
}
