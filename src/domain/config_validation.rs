//! Run configuration validation.
//!
//! Checks every field the selected strategy needs before any data is loaded.

use chrono::NaiveDate;

use crate::domain::cadence::Frequency;
use crate::domain::candle::DateWindow;
use crate::domain::error::DcaBenchError;
use crate::domain::exit_policy::{ExitPolicy, DEFAULT_PARTIAL_SELL_FRACTION};
use crate::domain::split_buy::{SplitBuyVariant, DEFAULT_SPLITS};
use crate::domain::strategy::StrategyKind;
use crate::ports::config_port::ConfigPort;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Percent values as written in `[split_buy]`.
pub const DEFAULT_TAKE_PROFIT_PCT: f64 = 10.0;
pub const DEFAULT_PARTIAL_EXIT_PCT: f64 = 5.0;
pub const DEFAULT_FULL_EXIT_PCT: f64 = 10.0;

/// Validate `[run]` and the section of the strategy it selects.
/// `strategy_override` replaces `[run] strategy` when given.
pub fn validate_config(
    config: &dyn ConfigPort,
    strategy_override: Option<&str>,
) -> Result<StrategyKind, DcaBenchError> {
    let kind = validate_run_config(config, strategy_override)?;
    validate_strategy_section(config, kind)?;
    Ok(kind)
}

pub fn validate_strategy_section(
    config: &dyn ConfigPort,
    kind: StrategyKind,
) -> Result<(), DcaBenchError> {
    match kind {
        StrategyKind::Dca => validate_dca_config(config),
        StrategyKind::SplitBuy(variant) => validate_split_buy_config(config, variant),
    }
}

pub fn validate_run_config(
    config: &dyn ConfigPort,
    strategy_override: Option<&str>,
) -> Result<StrategyKind, DcaBenchError> {
    let kind = resolve_strategy(config, strategy_override)?;
    parse_window(config)?;
    Ok(kind)
}

/// `[run] from` / `to`; either may be absent.
pub fn parse_window(config: &dyn ConfigPort) -> Result<DateWindow, DcaBenchError> {
    let from = parse_optional_date(config, "run", "from")?;
    let to = parse_optional_date(config, "run", "to")?;
    if from.zip(to).is_some_and(|(from, to)| from > to) {
        return Err(DcaBenchError::ConfigInvalid {
            section: "run".to_string(),
            key: "from".to_string(),
            reason: "from must not be after to".to_string(),
        });
    }
    Ok(DateWindow::new(from, to))
}

pub fn resolve_strategy(
    config: &dyn ConfigPort,
    strategy_override: Option<&str>,
) -> Result<StrategyKind, DcaBenchError> {
    let raw = match strategy_override {
        Some(s) => s.to_string(),
        None => config
            .get_string("run", "strategy")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| DcaBenchError::ConfigMissing {
                section: "run".to_string(),
                key: "strategy".to_string(),
            })?,
    };
    raw.parse().map_err(|reason| DcaBenchError::ConfigInvalid {
        section: "run".to_string(),
        key: "strategy".to_string(),
        reason,
    })
}

pub fn parse_optional_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, DcaBenchError> {
    match config.get_string(section, key).filter(|s| !s.trim().is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .map(Some)
            .map_err(|_| DcaBenchError::ConfigInvalid {
                section: section.to_string(),
                key: key.to_string(),
                reason: format!("invalid {key} format, expected YYYY-MM-DD"),
            }),
    }
}

pub fn parse_frequency(config: &dyn ConfigPort) -> Result<Frequency, DcaBenchError> {
    match config.get_string("dca", "frequency") {
        None => Ok(Frequency::Monthly),
        Some(s) => s.parse().map_err(|reason| DcaBenchError::ConfigInvalid {
            section: "dca".to_string(),
            key: "frequency".to_string(),
            reason,
        }),
    }
}

fn validate_dca_config(config: &dyn ConfigPort) -> Result<(), DcaBenchError> {
    require_positive(config, "dca", "amount")?;
    parse_frequency(config)?;
    Ok(())
}

/// Only the exit keys the variant reads are checked.
fn validate_split_buy_config(
    config: &dyn ConfigPort,
    variant: SplitBuyVariant,
) -> Result<(), DcaBenchError> {
    require_positive(config, "split_buy", "unit_per_round")?;
    validate_splits(config)?;
    match variant.exit_policy(DEFAULT_TAKE_PROFIT_PCT / 100.0) {
        ExitPolicy::SingleTier { .. } => validate_take_profit(config)?,
        ExitPolicy::TwoTier { .. } => {
            validate_tiers(config)?;
            validate_sell_fraction(config)?;
        }
    }
    Ok(())
}

/// A numeric key that may be absent; present values must parse.
pub fn optional_number(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, DcaBenchError> {
    match config.get_non_empty(section, key) {
        None => Ok(default),
        Some(s) => s.parse().map_err(|_| DcaBenchError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("'{s}' is not a number"),
        }),
    }
}

fn require_positive(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), DcaBenchError> {
    if config.get_string(section, key).is_none() {
        return Err(DcaBenchError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        });
    }
    let value = config.get_double(section, key, f64::NAN);
    if !(value.is_finite() && value > 0.0) {
        return Err(DcaBenchError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("{key} must be a positive number"),
        });
    }
    Ok(())
}

fn validate_splits(config: &dyn ConfigPort) -> Result<(), DcaBenchError> {
    let value = optional_number(config, "split_buy", "splits", DEFAULT_SPLITS)?;
    if !(value.is_finite() && value > 0.0) {
        return Err(DcaBenchError::ConfigInvalid {
            section: "split_buy".to_string(),
            key: "splits".to_string(),
            reason: "splits must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_take_profit(config: &dyn ConfigPort) -> Result<(), DcaBenchError> {
    let value = optional_number(config, "split_buy", "take_profit_pct", DEFAULT_TAKE_PROFIT_PCT)?;
    if !(value.is_finite() && value >= 0.0) {
        return Err(DcaBenchError::ConfigInvalid {
            section: "split_buy".to_string(),
            key: "take_profit_pct".to_string(),
            reason: "take_profit_pct must be non-negative".to_string(),
        });
    }
    Ok(())
}

fn validate_tiers(config: &dyn ConfigPort) -> Result<(), DcaBenchError> {
    let partial = optional_number(config, "split_buy", "partial_exit_pct", DEFAULT_PARTIAL_EXIT_PCT)?;
    let full = optional_number(config, "split_buy", "full_exit_pct", DEFAULT_FULL_EXIT_PCT)?;
    if !(partial.is_finite() && partial >= 0.0) {
        return Err(DcaBenchError::ConfigInvalid {
            section: "split_buy".to_string(),
            key: "partial_exit_pct".to_string(),
            reason: "partial_exit_pct must be non-negative".to_string(),
        });
    }
    if !(full.is_finite() && full > partial) {
        return Err(DcaBenchError::ConfigInvalid {
            section: "split_buy".to_string(),
            key: "full_exit_pct".to_string(),
            reason: "full_exit_pct must be greater than partial_exit_pct".to_string(),
        });
    }
    Ok(())
}

fn validate_sell_fraction(config: &dyn ConfigPort) -> Result<(), DcaBenchError> {
    let value = optional_number(
        config,
        "split_buy",
        "partial_sell_fraction",
        DEFAULT_PARTIAL_SELL_FRACTION,
    )?;
    if !(value > 0.0 && value <= 1.0) {
        return Err(DcaBenchError::ConfigInvalid {
            section: "split_buy".to_string(),
            key: "partial_sell_fraction".to_string(),
            reason: "partial_sell_fraction must be in (0, 1]".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn cfg(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn invalid_key(err: DcaBenchError) -> String {
        match err {
            DcaBenchError::ConfigInvalid { key, .. } | DcaBenchError::ConfigMissing { key, .. } => key,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn valid_dca_config() {
        let c = cfg("[run]\nstrategy = dca\n[dca]\namount = 100\nfrequency = weekly\n");
        assert_eq!(validate_config(&c, None).unwrap(), StrategyKind::Dca);
    }

    #[test]
    fn valid_split_buy_config_with_defaults() {
        let c = cfg("[run]\nstrategy = v21\n[split_buy]\nunit_per_round = 1000\n");
        assert_eq!(
            validate_config(&c, None).unwrap(),
            StrategyKind::SplitBuy(SplitBuyVariant::V21)
        );
    }

    #[test]
    fn missing_strategy() {
        let c = cfg("[run]\n");
        let err = validate_config(&c, None).unwrap_err();
        assert!(matches!(err, DcaBenchError::ConfigMissing { ref key, .. } if key == "strategy"));
    }

    #[test]
    fn override_replaces_configured_strategy() {
        let c = cfg("[run]\nstrategy = bogus\n[dca]\namount = 10\n");
        assert_eq!(validate_config(&c, Some("dca")).unwrap(), StrategyKind::Dca);
    }

    #[test]
    fn unknown_strategy() {
        let c = cfg("[run]\nstrategy = martingale\n");
        assert_eq!(invalid_key(validate_config(&c, None).unwrap_err()), "strategy");
    }

    #[test]
    fn bad_dates() {
        let c = cfg("[run]\nstrategy = dca\nfrom = 2020/01/01\n[dca]\namount = 1\n");
        assert_eq!(invalid_key(validate_config(&c, None).unwrap_err()), "from");

        let c = cfg("[run]\nstrategy = dca\nfrom = 2021-01-01\nto = 2020-01-01\n[dca]\namount = 1\n");
        assert_eq!(invalid_key(validate_config(&c, None).unwrap_err()), "from");
    }

    #[test]
    fn window_bounds_are_optional() {
        let c = cfg("[run]\nto = 2021-06-30\n");
        let window = parse_window(&c).unwrap();
        assert_eq!(window.from, None);
        assert_eq!(window.to, NaiveDate::from_ymd_opt(2021, 6, 30));
        assert_eq!(parse_window(&cfg("[run]\n")).unwrap(), DateWindow::default());
    }

    #[test]
    fn same_day_window_is_allowed() {
        let c = cfg("[run]\nstrategy = dca\nfrom = 2021-01-01\nto = 2021-01-01\n[dca]\namount = 1\n");
        assert!(validate_config(&c, None).is_ok());
    }

    #[test]
    fn dca_amount_rules() {
        let c = cfg("[run]\nstrategy = dca\n[dca]\n");
        assert_eq!(invalid_key(validate_config(&c, None).unwrap_err()), "amount");
        let c = cfg("[run]\nstrategy = dca\n[dca]\namount = 0\n");
        assert_eq!(invalid_key(validate_config(&c, None).unwrap_err()), "amount");
        let c = cfg("[run]\nstrategy = dca\n[dca]\namount = lots\n");
        assert_eq!(invalid_key(validate_config(&c, None).unwrap_err()), "amount");
    }

    #[test]
    fn dca_frequency_rules() {
        let c = cfg("[run]\nstrategy = dca\n[dca]\namount = 5\nfrequency = hourly\n");
        assert_eq!(invalid_key(validate_config(&c, None).unwrap_err()), "frequency");
    }

    #[test]
    fn split_buy_rules() {
        let base = "[run]\nstrategy = v2\n[split_buy]\nunit_per_round = 100\n";
        let cases = [
            ("splits = 0\n", "splits"),
            ("splits = -4\n", "splits"),
            ("partial_exit_pct = -1\n", "partial_exit_pct"),
            ("partial_exit_pct = 10\nfull_exit_pct = 10\n", "full_exit_pct"),
            ("partial_sell_fraction = 0\n", "partial_sell_fraction"),
            ("partial_sell_fraction = 1.5\n", "partial_sell_fraction"),
            ("splits = many\n", "splits"),
        ];
        for (extra, key) in cases {
            let c = cfg(&format!("{base}{extra}"));
            assert_eq!(invalid_key(validate_config(&c, None).unwrap_err()), key, "{extra}");
        }
    }

    #[test]
    fn exit_keys_are_checked_only_for_the_variant_using_them() {
        let v1 = "[run]\nstrategy = v1\n[split_buy]\nunit_per_round = 100\n";
        let c = cfg(&format!("{v1}take_profit_pct = -1\n"));
        assert_eq!(invalid_key(validate_config(&c, None).unwrap_err()), "take_profit_pct");
        let c = cfg(&format!("{v1}take_profit_pct = soon\n"));
        assert_eq!(invalid_key(validate_config(&c, None).unwrap_err()), "take_profit_pct");
        let c = cfg(&format!(
            "{v1}partial_exit_pct = -1\nfull_exit_pct = x\npartial_sell_fraction = 3\n"
        ));
        assert!(validate_config(&c, None).is_ok());

        let c = cfg("[run]\nstrategy = v3\n[split_buy]\nunit_per_round = 100\ntake_profit_pct = -1\n");
        assert!(validate_config(&c, None).is_ok());
    }

    #[test]
    fn split_buy_requires_unit() {
        let c = cfg("[run]\nstrategy = v1\n[split_buy]\nsplits = 40\n");
        assert_eq!(invalid_key(validate_config(&c, None).unwrap_err()), "unit_per_round");
    }
}
