//! Take-profit tiers evaluated against the live average cost.

use serde::{Deserialize, Serialize};

/// Two-tier thresholds used by v2, v2.1 and v3.
pub const DEFAULT_PARTIAL_EXIT: f64 = 0.05;
pub const DEFAULT_FULL_EXIT: f64 = 0.10;
pub const DEFAULT_PARTIAL_SELL_FRACTION: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ExitPolicy {
    /// Liquidate everything once close >= avg_cost * (1 + take_profit).
    SingleTier { take_profit: f64 },
    /// Sell `sell_fraction` of the position in `[avg*(1+partial_at), avg*(1+full_at))`,
    /// liquidate at or above `avg*(1+full_at)`.
    TwoTier {
        partial_at: f64,
        full_at: f64,
        sell_fraction: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExitAction {
    Hold,
    Partial { fraction: f64 },
    Full,
}

impl ExitPolicy {
    pub fn single_tier(take_profit: f64) -> Self {
        ExitPolicy::SingleTier { take_profit }
    }

    pub fn two_tier_default() -> Self {
        ExitPolicy::TwoTier {
            partial_at: DEFAULT_PARTIAL_EXIT,
            full_at: DEFAULT_FULL_EXIT,
            sell_fraction: DEFAULT_PARTIAL_SELL_FRACTION,
        }
    }

    pub fn evaluate(&self, close: f64, avg_cost: f64) -> ExitAction {
        match *self {
            ExitPolicy::SingleTier { take_profit } => {
                if close >= avg_cost * (1.0 + take_profit) {
                    ExitAction::Full
                } else {
                    ExitAction::Hold
                }
            }
            ExitPolicy::TwoTier {
                partial_at,
                full_at,
                sell_fraction,
            } => {
                let partial_line = avg_cost * (1.0 + partial_at);
                let full_line = avg_cost * (1.0 + full_at);
                if close >= partial_line && close < full_line {
                    ExitAction::Partial {
                        fraction: sell_fraction,
                    }
                } else if close >= full_line {
                    ExitAction::Full
                } else {
                    ExitAction::Hold
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_tier_triggers_at_threshold() {
        let policy = ExitPolicy::single_tier(0.10);
        assert_eq!(policy.evaluate(10.99, 10.0), ExitAction::Hold);
        assert_eq!(policy.evaluate(11.01, 10.0), ExitAction::Full);
        assert_eq!(policy.evaluate(15.0, 10.0), ExitAction::Full);
    }

    #[test]
    fn single_tier_zero_take_profit_exits_at_cost() {
        let policy = ExitPolicy::single_tier(0.0);
        assert_eq!(policy.evaluate(10.0, 10.0), ExitAction::Full);
        assert_eq!(policy.evaluate(9.99, 10.0), ExitAction::Hold);
    }

    #[test]
    fn two_tier_bands() {
        let policy = ExitPolicy::two_tier_default();
        assert_eq!(policy.evaluate(10.49, 10.0), ExitAction::Hold);
        assert_eq!(
            policy.evaluate(10.51, 10.0),
            ExitAction::Partial { fraction: 0.5 }
        );
        assert_eq!(
            policy.evaluate(10.9, 10.0),
            ExitAction::Partial { fraction: 0.5 }
        );
        assert_eq!(policy.evaluate(11.01, 10.0), ExitAction::Full);
    }

    #[test]
    fn two_tier_below_cost_holds() {
        let policy = ExitPolicy::two_tier_default();
        assert_eq!(policy.evaluate(5.0, 10.0), ExitAction::Hold);
    }

    #[test]
    fn two_tier_custom_thresholds() {
        let policy = ExitPolicy::TwoTier {
            partial_at: 0.02,
            full_at: 0.20,
            sell_fraction: 0.25,
        };
        assert_eq!(
            policy.evaluate(11.5, 10.0),
            ExitAction::Partial { fraction: 0.25 }
        );
        assert_eq!(policy.evaluate(12.5, 10.0), ExitAction::Full);
    }
}
