//! Strategy selection and dispatch to the simulators.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::candle::{Candle, DateWindow};
use super::dca::{run_dca, DcaConfig};
use super::metrics::StrategyResult;
use super::split_buy::{run_split_buy, SplitBuyConfig, SplitBuyVariant};

/// The strategy selector accepted from configuration and the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    Dca,
    SplitBuy(SplitBuyVariant),
}

impl StrategyKind {
    /// Stable selector string, as accepted by `from_str`.
    pub fn selector(self) -> &'static str {
        match self {
            StrategyKind::Dca => "dca",
            StrategyKind::SplitBuy(SplitBuyVariant::V1) => "v1",
            StrategyKind::SplitBuy(SplitBuyVariant::V2) => "v2",
            StrategyKind::SplitBuy(SplitBuyVariant::V21) => "v21",
            StrategyKind::SplitBuy(SplitBuyVariant::V3) => "v3",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Dca => f.write_str("DCA"),
            StrategyKind::SplitBuy(v) => write!(f, "split-buy {v}"),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("dca") {
            return Ok(StrategyKind::Dca);
        }
        trimmed
            .parse::<SplitBuyVariant>()
            .map(StrategyKind::SplitBuy)
            .map_err(|_| {
                format!("unknown strategy '{trimmed}' (expected dca, v1, v2, v21 or v3)")
            })
    }
}

/// Fully-resolved parameters for one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StrategySpec {
    Dca(DcaConfig),
    SplitBuy(SplitBuyConfig),
}

impl StrategySpec {
    pub fn kind(&self) -> StrategyKind {
        match self {
            StrategySpec::Dca(_) => StrategyKind::Dca,
            StrategySpec::SplitBuy(c) => StrategyKind::SplitBuy(c.variant),
        }
    }

    pub fn window(&self) -> DateWindow {
        match self {
            StrategySpec::Dca(c) => c.window,
            StrategySpec::SplitBuy(c) => c.window,
        }
    }

    /// Capital per investment (DCA) or per full round (split-buy).
    pub fn amount(&self) -> f64 {
        match self {
            StrategySpec::Dca(c) => c.amount_per_investment,
            StrategySpec::SplitBuy(c) => c.unit_per_round,
        }
    }
}

pub fn run_strategy(candles: &[Candle], spec: &StrategySpec) -> Option<StrategyResult> {
    match spec {
        StrategySpec::Dca(config) => run_dca(candles, config),
        StrategySpec::SplitBuy(config) => run_split_buy(candles, config),
    }
}

/// Run independent strategies over the same candles, one scoped thread each.
/// Results come back in the order of `specs`.
pub fn run_many(candles: &[Candle], specs: &[StrategySpec]) -> Vec<Option<StrategyResult>> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = specs
            .iter()
            .map(|spec| scope.spawn(move || run_strategy(candles, spec)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or(None))
            .collect()
    })
}
