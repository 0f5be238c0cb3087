//! CLI definition and dispatch.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::ReportFormat;
use crate::domain::candle::DateWindow;
use crate::domain::config_validation::{
    optional_number, parse_frequency, parse_window, resolve_strategy, validate_config,
    validate_run_config, validate_strategy_section, DEFAULT_FULL_EXIT_PCT,
    DEFAULT_PARTIAL_EXIT_PCT, DEFAULT_TAKE_PROFIT_PCT,
};
use crate::domain::dca::DcaConfig;
use crate::domain::error::DcaBenchError;
use crate::domain::exit_policy::{ExitPolicy, DEFAULT_PARTIAL_SELL_FRACTION};
use crate::domain::metrics::StrategyResult;
use crate::domain::split_buy::{SplitBuyConfig, SplitBuyVariant, DEFAULT_SPLITS};
use crate::domain::strategy::{run_many, run_strategy, StrategyKind, StrategySpec};
use crate::ports::candle_port::CandlePort;
use crate::ports::config_port::ConfigPort;
use crate::ports::run_store_port::{RunStorePort, SavedRun};

#[derive(Parser, Debug)]
#[command(
    name = "dcabench",
    about = "Backtest dollar-cost averaging and split-buy accumulation strategies"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one strategy and print its summary
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Candle CSV file or directory; overrides [data] csv_path
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// dca, v1, v2, v21 or v3; overrides [run] strategy
        #[arg(short, long)]
        strategy: Option<String>,
        /// Write a report to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// json or csv; defaults to [report] format, then the output extension
        #[arg(long, requires = "output")]
        format: Option<String>,
        /// Save the run, optionally under NAME (defaults to [run] name)
        #[arg(long, value_name = "NAME")]
        save: Option<Option<String>>,
    },
    /// Run several strategies over the same candles
    Compare {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated selectors, e.g. dca,v1,v21
        #[arg(long, value_delimiter = ',', required = true)]
        strategies: Vec<String>,
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
    /// Validate a run configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        strategy: Option<String>,
    },
    /// Manage saved runs
    Runs {
        #[command(subcommand)]
        action: RunsAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum RunsAction {
    /// List saved runs, newest first
    List {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print the summary of a saved run
    Show {
        id: i64,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Run a saved run's parameters again over fresh candles
    Rerun {
        id: i64,
        #[arg(short, long)]
        config: PathBuf,
        /// Candle CSV file or directory; overrides [data] csv_path
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
    /// Delete a saved run
    Delete {
        id: i64,
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Run {
            config,
            data,
            strategy,
            output,
            format,
            save,
        } => run_single(
            &config,
            data.as_deref(),
            strategy.as_deref(),
            output.as_deref(),
            format.as_deref(),
            save.as_ref().map(|name| name.as_deref()),
        ),
        Command::Compare {
            config,
            strategies,
            data,
        } => run_compare(&config, &strategies, data.as_deref()),
        Command::Validate { config, strategy } => run_validate(&config, strategy.as_deref()),
        Command::Runs { action } => run_runs(action),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, DcaBenchError> {
    info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

fn run_single(
    config_path: &Path,
    data_override: Option<&Path>,
    strategy_override: Option<&str>,
    output_path: Option<&Path>,
    format_override: Option<&str>,
    save: Option<Option<&str>>,
) -> Result<(), DcaBenchError> {
    let config = load_config(config_path)?;
    let kind = validate_run_config(&config, strategy_override)?;
    let spec = build_strategy_spec(&config, kind)?;
    // Resolve before the run so a bad format fails fast.
    let report_format = output_path
        .map(|path| resolve_report_format(&config, format_override, path))
        .transpose()?;

    let data_path = resolve_data_path(&config, data_override)?;
    let symbol = resolve_symbol(&config, &data_path)?;
    let candle_port = CsvAdapter::new(data_path);

    let result = run_pipeline(&candle_port, &symbol, &spec)?;
    println!("{}", format_summary(&symbol, &spec, &result));

    if let (Some(path), Some(format)) = (output_path, report_format) {
        info!(path = %path.display(), %format, "writing report");
        format.adapter().write(&result, &spec, path)?;
    }

    if let Some(explicit_name) = save {
        let name = resolve_run_name(&config, explicit_name, &spec, &symbol);
        info!(name = %name, "saving run");
        let store = open_run_store(&config)?;
        let id = store.save(&name, &symbol, &spec, &result)?;
        println!("Saved run {id} as '{name}'");
    }

    Ok(())
}

fn run_compare(
    config_path: &Path,
    selectors: &[String],
    data_override: Option<&Path>,
) -> Result<(), DcaBenchError> {
    let config = load_config(config_path)?;
    let specs = build_strategy_specs(&config, selectors)?;

    let data_path = resolve_data_path(&config, data_override)?;
    let symbol = resolve_symbol(&config, &data_path)?;
    let candle_port = CsvAdapter::new(data_path);

    let results = compare_pipeline(&candle_port, &symbol, &specs)?;
    println!("{}", format_comparison(&symbol, &specs, &results));
    Ok(())
}

fn run_validate(config_path: &Path, strategy_override: Option<&str>) -> Result<(), DcaBenchError> {
    let config = load_config(config_path)?;
    let kind = validate_config(&config, strategy_override)?;
    let spec = build_strategy_spec(&config, kind)?;

    if let Some(format) = config.get_non_empty("report", "format") {
        parse_report_format(&format)?;
    }
    match config.get_non_empty("data", "csv_path") {
        Some(path) if !Path::new(&path).exists() => {
            warn!(path = %path, "configured data file does not exist")
        }
        Some(_) => {}
        None => warn!("no [data] csv_path configured; --data will be required"),
    }

    println!(
        "Configuration is valid: {} over {}",
        spec.kind(),
        describe_window(spec.window())
    );
    Ok(())
}

fn run_runs(action: RunsAction) -> Result<(), DcaBenchError> {
    match action {
        RunsAction::List { config } => {
            let store = open_run_store(&load_config(&config)?)?;
            println!("{}", list_runs(store.as_ref())?);
        }
        RunsAction::Show { id, config } => {
            let store = open_run_store(&load_config(&config)?)?;
            println!("{}", show_run(store.as_ref(), id)?);
        }
        RunsAction::Rerun { id, config, data } => {
            let config = load_config(&config)?;
            let store = open_run_store(&config)?;
            let data_path = resolve_data_path(&config, data.as_deref())?;
            let candle_port = CsvAdapter::new(data_path);
            let (saved, result) = rerun_saved_run(store.as_ref(), &candle_port, id)?;
            println!("{}", format_rerun(&saved, &result));
        }
        RunsAction::Delete { id, config } => {
            let store = open_run_store(&load_config(&config)?)?;
            delete_run(store.as_ref(), id)?;
            println!("Deleted run {id}");
        }
    }
    Ok(())
}

pub fn build_strategy_spec(
    config: &dyn ConfigPort,
    kind: StrategyKind,
) -> Result<StrategySpec, DcaBenchError> {
    validate_strategy_section(config, kind)?;
    let window = parse_window(config)?;

    let spec = match kind {
        StrategyKind::Dca => StrategySpec::Dca(DcaConfig {
            amount_per_investment: config.get_double("dca", "amount", 0.0),
            frequency: parse_frequency(config)?,
            window,
        }),
        StrategyKind::SplitBuy(variant) => {
            StrategySpec::SplitBuy(build_split_buy_config(config, variant, window)?)
        }
    };
    Ok(spec)
}

/// One spec per selector, all sharing the configured window.
pub fn build_strategy_specs(
    config: &dyn ConfigPort,
    selectors: &[String],
) -> Result<Vec<StrategySpec>, DcaBenchError> {
    selectors
        .iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            let kind = resolve_strategy(config, Some(s.as_str()))?;
            build_strategy_spec(config, kind)
        })
        .collect()
}

fn build_split_buy_config(
    config: &dyn ConfigPort,
    variant: SplitBuyVariant,
    window: DateWindow,
) -> Result<SplitBuyConfig, DcaBenchError> {
    let unit_per_round = config.get_double("split_buy", "unit_per_round", 0.0);
    let splits = optional_number(config, "split_buy", "splits", DEFAULT_SPLITS)?;
    let mut split_buy = SplitBuyConfig::for_variant(
        variant,
        unit_per_round,
        splits,
        DEFAULT_TAKE_PROFIT_PCT / 100.0,
        window,
    );
    if let ExitPolicy::SingleTier { .. } = split_buy.exit_policy {
        let take_profit =
            optional_number(config, "split_buy", "take_profit_pct", DEFAULT_TAKE_PROFIT_PCT)?;
        split_buy.exit_policy = ExitPolicy::single_tier(take_profit / 100.0);
    }
    if let ExitPolicy::TwoTier { .. } = split_buy.exit_policy {
        split_buy.exit_policy = ExitPolicy::TwoTier {
            partial_at: optional_number(
                config,
                "split_buy",
                "partial_exit_pct",
                DEFAULT_PARTIAL_EXIT_PCT,
            )? / 100.0,
            full_at: optional_number(config, "split_buy", "full_exit_pct", DEFAULT_FULL_EXIT_PCT)?
                / 100.0,
            sell_fraction: optional_number(
                config,
                "split_buy",
                "partial_sell_fraction",
                DEFAULT_PARTIAL_SELL_FRACTION,
            )?,
        };
    }
    Ok(split_buy)
}

pub fn resolve_data_path(
    config: &dyn ConfigPort,
    data_override: Option<&Path>,
) -> Result<PathBuf, DcaBenchError> {
    if let Some(path) = data_override {
        return Ok(path.to_path_buf());
    }
    config
        .get_non_empty("data", "csv_path")
        .map(PathBuf::from)
        .ok_or_else(|| DcaBenchError::ConfigMissing {
            section: "data".into(),
            key: "csv_path".into(),
        })
}

/// `[data] symbol`, else the data file's stem. A directory source needs an
/// explicit symbol to pick its file.
pub fn resolve_symbol(config: &dyn ConfigPort, data_path: &Path) -> Result<String, DcaBenchError> {
    if let Some(symbol) = config.get_non_empty("data", "symbol") {
        return Ok(symbol);
    }
    if data_path.is_dir() {
        return Err(DcaBenchError::ConfigMissing {
            section: "data".into(),
            key: "symbol".into(),
        });
    }
    Ok(data_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string())
}

pub fn resolve_run_name(
    config: &dyn ConfigPort,
    explicit: Option<&str>,
    spec: &StrategySpec,
    symbol: &str,
) -> String {
    explicit
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| config.get_non_empty("run", "name"))
        .unwrap_or_else(|| format!("{} {}", symbol, spec.kind().selector()))
}

fn parse_report_format(raw: &str) -> Result<ReportFormat, DcaBenchError> {
    raw.parse().map_err(|reason| DcaBenchError::ConfigInvalid {
        section: "report".into(),
        key: "format".into(),
        reason,
    })
}

/// Command line, then `[report] format`, then the output extension, then JSON.
pub fn resolve_report_format(
    config: &dyn ConfigPort,
    format_override: Option<&str>,
    output_path: &Path,
) -> Result<ReportFormat, DcaBenchError> {
    let configured = config.get_non_empty("report", "format");
    if let Some(raw) = format_override.or(configured.as_deref()) {
        return parse_report_format(raw);
    }
    Ok(ReportFormat::from_path(output_path).unwrap_or(ReportFormat::Json))
}

/// Load candles for `symbol` and run one strategy over them.
pub fn run_pipeline(
    candle_port: &dyn CandlePort,
    symbol: &str,
    spec: &StrategySpec,
) -> Result<StrategyResult, DcaBenchError> {
    info!(symbol, "loading candles");
    let candles = candle_port.fetch_candles(symbol)?;

    info!(strategy = %spec.kind(), candles = candles.len(), "running strategy");
    run_strategy(&candles, spec).ok_or_else(|| DcaBenchError::NoResult {
        strategy: spec.kind().to_string(),
    })
}

/// Load candles once and run every spec in parallel. Individual strategies
/// may come back empty; it is an error only when all of them do.
pub fn compare_pipeline(
    candle_port: &dyn CandlePort,
    symbol: &str,
    specs: &[StrategySpec],
) -> Result<Vec<Option<StrategyResult>>, DcaBenchError> {
    info!(symbol, "loading candles");
    let candles = candle_port.fetch_candles(symbol)?;

    info!(strategies = specs.len(), candles = candles.len(), "running comparison");
    let results = run_many(&candles, specs);

    for (spec, result) in specs.iter().zip(&results) {
        if result.is_none() {
            warn!(strategy = %spec.kind(), "strategy produced no result");
        }
    }
    if results.iter().all(Option::is_none) {
        let names: Vec<String> = specs.iter().map(|s| s.kind().to_string()).collect();
        return Err(DcaBenchError::NoResult {
            strategy: names.join(", "),
        });
    }
    Ok(results)
}

fn pct(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

fn describe_window(window: DateWindow) -> String {
    let bound = |d: Option<chrono::NaiveDate>| d.map_or_else(|| "*".to_string(), |d| d.to_string());
    format!("{} .. {}", bound(window.from), bound(window.to))
}

pub fn format_summary(symbol: &str, spec: &StrategySpec, result: &StrategyResult) -> String {
    format!(
        "Strategy:      {}\n\
         Symbol:        {}\n\
         Period:        {} .. {}\n\
         Investments:   {}\n\
         Invested:      {:.2}\n\
         Final value:   {:.2}\n\
         Total return:  {}\n\
         CAGR:          {}\n\
         Max drawdown:  {}",
        spec.kind(),
        symbol,
        result.start,
        result.end,
        result.invest_count,
        result.invested,
        result.final_value,
        pct(result.total_return),
        pct(result.cagr),
        pct(result.max_drawdown),
    )
}

pub fn format_comparison(
    symbol: &str,
    specs: &[StrategySpec],
    results: &[Option<StrategyResult>],
) -> String {
    let mut lines = vec![
        format!("Symbol: {symbol}"),
        format!(
            "{:<16} {:>8} {:>14} {:>14} {:>10} {:>10} {:>10}",
            "strategy", "buys", "invested", "final", "return", "cagr", "max dd"
        ),
    ];
    for (spec, result) in specs.iter().zip(results) {
        let name = spec.kind().to_string();
        lines.push(match result {
            Some(r) => format!(
                "{:<16} {:>8} {:>14.2} {:>14.2} {:>10} {:>10} {:>10}",
                name,
                r.invest_count,
                r.invested,
                r.final_value,
                pct(r.total_return),
                pct(r.cagr),
                pct(r.max_drawdown)
            ),
            None => format!("{:<16} {:>8}", name, "no result"),
        });
    }
    lines.join("\n")
}

#[cfg(feature = "sqlite")]
pub fn open_run_store(config: &dyn ConfigPort) -> Result<Box<dyn RunStorePort>, DcaBenchError> {
    use crate::adapters::sqlite_adapter::SqliteRunStore;
    Ok(Box::new(SqliteRunStore::from_config(config)?))
}

#[cfg(not(feature = "sqlite"))]
pub fn open_run_store(_config: &dyn ConfigPort) -> Result<Box<dyn RunStorePort>, DcaBenchError> {
    Err(DcaBenchError::Storage {
        reason: "sqlite feature is required for saved runs".into(),
    })
}

pub fn list_runs(store: &dyn RunStorePort) -> Result<String, DcaBenchError> {
    let runs = store.list()?;
    if runs.is_empty() {
        return Ok("No saved runs".to_string());
    }
    let lines: Vec<String> = runs
        .iter()
        .map(|r| {
            format!(
                "{:>4}  {}  {:<4} {:<10} {:>10}  {}",
                r.id,
                r.saved_at.format("%Y-%m-%d %H:%M"),
                r.strategy,
                r.symbol,
                pct(r.total_return),
                r.name
            )
        })
        .collect();
    Ok(lines.join("\n"))
}

pub fn show_run(store: &dyn RunStorePort, id: i64) -> Result<String, DcaBenchError> {
    let run = store.get(id)?.ok_or(DcaBenchError::RunNotFound { id })?;
    Ok(format!(
        "Run {} '{}' saved {}\n{}",
        run.id,
        run.name,
        run.saved_at.format("%Y-%m-%d %H:%M:%S UTC"),
        format_summary(&run.symbol, &run.spec, &run.result)
    ))
}

/// Replay a saved run's parameters and symbol over candles from
/// `candle_port`. The stored run is left untouched.
pub fn rerun_saved_run(
    store: &dyn RunStorePort,
    candle_port: &dyn CandlePort,
    id: i64,
) -> Result<(SavedRun, StrategyResult), DcaBenchError> {
    let saved = store.get(id)?.ok_or(DcaBenchError::RunNotFound { id })?;
    info!(id, name = %saved.name, "rerunning saved run");
    let result = run_pipeline(candle_port, &saved.symbol, &saved.spec)?;
    Ok((saved, result))
}

pub fn format_rerun(saved: &SavedRun, result: &StrategyResult) -> String {
    format!(
        "Rerun of run {} '{}' (saved total return {})\n{}",
        saved.id,
        saved.name,
        pct(saved.result.total_return),
        format_summary(&saved.symbol, &saved.spec, result)
    )
}

pub fn delete_run(store: &dyn RunStorePort, id: i64) -> Result<(), DcaBenchError> {
    if store.delete(id)? {
        Ok(())
    } else {
        Err(DcaBenchError::RunNotFound { id })
    }
}
