//! Split-buy averaging-down engine with a consumable round budget.
//!
//! One state machine drives all four variants. A variant is a choice of
//! [`BuyPhase`] and [`ExitPolicy`]:
//!
//! | variant | buy phase    | exit policy             |
//! |---------|--------------|-------------------------|
//! | v1      | `Always`     | `SingleTier(tp)`        |
//! | v2      | `Always`     | `TwoTier(5%, 10%)`      |
//! | v2.1    | `PhaseGated` | `TwoTier(5%, 10%)`      |
//! | v3      | `PhaseGated` | `TwoTier(5%, 10%)`      |
//!
//! Each day runs buys, then exit evaluation, then records the day.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::candle::{normalize, Candle, DateWindow};
use super::exit_policy::{ExitAction, ExitPolicy};
use super::metrics::{DailyTrace, StrategyResult};

pub const DEFAULT_SPLITS: f64 = 40.0;
pub const DEFAULT_TAKE_PROFIT: f64 = 0.10;

/// Budget is consumed in half rounds.
pub const HALF_ROUND: f64 = 0.5;

/// Slack on the round-budget comparison.
pub const BUDGET_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuyPhase {
    /// Primary half-round every day, plus one averaging-down half-round.
    Always,
    /// `Always` until half the budget is used; afterwards only averaging-down
    /// buys, up to two per day.
    PhaseGated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SplitBuyVariant {
    V1,
    V2,
    V21,
    V3,
}

impl SplitBuyVariant {
    pub fn buy_phase(self) -> BuyPhase {
        match self {
            SplitBuyVariant::V1 | SplitBuyVariant::V2 => BuyPhase::Always,
            SplitBuyVariant::V21 | SplitBuyVariant::V3 => BuyPhase::PhaseGated,
        }
    }

    /// Default exit policy; `take_profit` only applies to v1.
    pub fn exit_policy(self, take_profit: f64) -> ExitPolicy {
        match self {
            SplitBuyVariant::V1 => ExitPolicy::single_tier(take_profit),
            _ => ExitPolicy::two_tier_default(),
        }
    }
}

impl fmt::Display for SplitBuyVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SplitBuyVariant::V1 => "v1",
            SplitBuyVariant::V2 => "v2",
            SplitBuyVariant::V21 => "v2.1",
            SplitBuyVariant::V3 => "v3",
        };
        f.write_str(name)
    }
}

impl FromStr for SplitBuyVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" => Ok(SplitBuyVariant::V1),
            "v2" => Ok(SplitBuyVariant::V2),
            "v21" | "v2.1" => Ok(SplitBuyVariant::V21),
            "v3" => Ok(SplitBuyVariant::V3),
            other => Err(format!(
                "unknown split-buy variant '{other}' (expected v1, v2, v21 or v3)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitBuyConfig {
    /// Reporting tag only; behavior comes from `buy_phase` and `exit_policy`.
    pub variant: SplitBuyVariant,
    pub unit_per_round: f64,
    pub splits: f64,
    pub buy_phase: BuyPhase,
    pub exit_policy: ExitPolicy,
    pub window: DateWindow,
}

impl SplitBuyConfig {
    pub fn for_variant(
        variant: SplitBuyVariant,
        unit_per_round: f64,
        splits: f64,
        take_profit: f64,
        window: DateWindow,
    ) -> Self {
        Self {
            variant,
            unit_per_round,
            splits,
            buy_phase: variant.buy_phase(),
            exit_policy: variant.exit_policy(take_profit),
            window,
        }
    }

    fn is_valid(&self) -> bool {
        self.unit_per_round.is_finite()
            && self.unit_per_round > 0.0
            && self.splits.is_finite()
            && self.splits > 0.0
    }
}

/// Position bookkeeping for a single run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimulationState {
    pub shares: f64,
    /// Cost basis of the shares currently held.
    pub invested_live: f64,
    /// All capital ever deployed; never decreases.
    pub invested_cumulative: f64,
    pub used_rounds: f64,
    /// Exit proceeds. Never reinvested.
    pub cash: f64,
}

impl SimulationState {
    /// `invested_live / shares`; undefined without a position.
    pub fn avg_cost(&self) -> Option<f64> {
        (self.shares > 0.0).then(|| self.invested_live / self.shares)
    }

    pub fn has_budget(&self, splits: f64) -> bool {
        self.used_rounds + HALF_ROUND <= splits + BUDGET_EPSILON
    }

    pub fn is_below_cost(&self, close: f64) -> bool {
        self.avg_cost().is_some_and(|avg| close < avg)
    }

    pub fn equity(&self, close: f64) -> f64 {
        self.cash + self.shares * close
    }

    fn buy_half_round(&mut self, close: f64, unit_per_round: f64) {
        let amount = unit_per_round * HALF_ROUND;
        self.shares += amount / close;
        self.invested_live += amount;
        self.invested_cumulative += amount;
        self.used_rounds += HALF_ROUND;
    }

    fn apply_exit(&mut self, action: ExitAction, close: f64) {
        match action {
            ExitAction::Hold => {}
            ExitAction::Partial { fraction } => {
                let sold = self.shares * fraction;
                self.cash += sold * close;
                self.shares -= sold;
                self.invested_live *= 1.0 - fraction;
            }
            ExitAction::Full => {
                self.cash += self.shares * close;
                self.shares = 0.0;
                self.invested_live = 0.0;
                self.used_rounds = 0.0;
            }
        }
    }
}

struct Engine<'a> {
    config: &'a SplitBuyConfig,
    state: SimulationState,
    trace: DailyTrace,
}

impl Engine<'_> {
    fn try_buy(&mut self, candle: &Candle) -> bool {
        if !self.state.has_budget(self.config.splits) {
            return false;
        }
        self.state
            .buy_half_round(candle.close, self.config.unit_per_round);
        self.trace.record_buy(candle.date, candle.close);
        true
    }

    fn try_average_down(&mut self, candle: &Candle) -> bool {
        self.state.is_below_cost(candle.close) && self.try_buy(candle)
    }

    fn is_conservative(&self) -> bool {
        match self.config.buy_phase {
            BuyPhase::Always => false,
            BuyPhase::PhaseGated => self.state.used_rounds >= self.config.splits * 0.5,
        }
    }

    fn step(&mut self, candle: &Candle) {
        if self.is_conservative() {
            if self.try_average_down(candle) {
                self.try_average_down(candle);
            }
        } else {
            self.try_buy(candle);
            self.try_average_down(candle);
        }

        if let Some(avg) = self.state.avg_cost() {
            let action = self.config.exit_policy.evaluate(candle.close, avg);
            if action != ExitAction::Hold {
                trace!(date = %candle.date, close = candle.close, avg_cost = avg, ?action, "take profit");
            }
            self.state.apply_exit(action, candle.close);
        }

        self.trace.record_day(
            candle.date,
            candle.close,
            self.state.equity(candle.close),
            self.state.invested_cumulative,
        );
    }
}

/// Run the engine, calling `on_day` with the state after each day.
///
/// Returns `None` for empty input, a non-positive unit or split count, or an
/// empty range.
pub fn simulate<F>(candles: &[Candle], config: &SplitBuyConfig, mut on_day: F) -> Option<StrategyResult>
where
    F: FnMut(&Candle, &SimulationState),
{
    if candles.is_empty() || !config.is_valid() {
        return None;
    }
    let ranged = normalize(candles, config.window)?;

    debug!(
        variant = %config.variant,
        days = ranged.len(),
        splits = config.splits,
        unit_per_round = config.unit_per_round,
        "running split-buy simulation"
    );

    let mut engine = Engine {
        config,
        state: SimulationState::default(),
        trace: DailyTrace::with_capacity(ranged.len()),
    };
    for candle in &ranged {
        engine.step(candle);
        on_day(candle, &engine.state);
    }
    engine.trace.finish()
}

pub fn run_split_buy(candles: &[Candle], config: &SplitBuyConfig) -> Option<StrategyResult> {
    simulate(candles, config, |_, _| {})
}

/// Single take-profit tier at `take_profit` (a fraction, 0.10 = 10%).
pub fn run_v1(
    candles: &[Candle],
    unit_per_round: f64,
    splits: f64,
    take_profit: f64,
    window: DateWindow,
) -> Option<StrategyResult> {
    let config = SplitBuyConfig::for_variant(
        SplitBuyVariant::V1,
        unit_per_round,
        splits,
        take_profit,
        window,
    );
    run_split_buy(candles, &config)
}

pub fn run_v2(
    candles: &[Candle],
    unit_per_round: f64,
    splits: f64,
    window: DateWindow,
) -> Option<StrategyResult> {
    let config = SplitBuyConfig::for_variant(
        SplitBuyVariant::V2,
        unit_per_round,
        splits,
        DEFAULT_TAKE_PROFIT,
        window,
    );
    run_split_buy(candles, &config)
}

pub fn run_v21(
    candles: &[Candle],
    unit_per_round: f64,
    splits: f64,
    window: DateWindow,
) -> Option<StrategyResult> {
    let config = SplitBuyConfig::for_variant(
        SplitBuyVariant::V21,
        unit_per_round,
        splits,
        DEFAULT_TAKE_PROFIT,
        window,
    );
    run_split_buy(candles, &config)
}

pub fn run_v3(
    candles: &[Candle],
    unit_per_round: f64,
    splits: f64,
    window: DateWindow,
) -> Option<StrategyResult> {
    let config = SplitBuyConfig::for_variant(
        SplitBuyVariant::V3,
        unit_per_round,
        splits,
        DEFAULT_TAKE_PROFIT,
        window,
    );
    run_split_buy(candles, &config)
}
