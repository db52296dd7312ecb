//! SMCLab CLI: backtest, scan and signal commands.
//!
//! Commands:
//! - `backtest`: run a TOML-configured backtest over CSV bars, write JSON and Markdown
//! - `scan`: list pattern signals in one CSV series
//! - `signal`: the engine's decision at the latest bar
//!
//! Logs go to stderr (`RUST_LOG` overrides the `info` default); results go to
//! stdout or the requested files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;

use smclab_core::patterns::{scan_signals, PatternKind};
use smclab_core::session::{Session, SessionTable};
use smclab_runner::{
    latest_decision, load_frame, load_series, markdown_report, run_from_files, BacktestConfig,
    BacktestResult,
};

#[derive(Parser)]
#[command(
    name = "smclab",
    about = "SMCLab CLI: smart-money pattern detection and backtesting"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a backtest from a TOML config over CSV bars.
    Backtest {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Timeframe data as `label=path` (e.g. 15m=eurusd_15m.csv). Repeatable.
        #[arg(long = "data", required = true, value_parser = parse_labeled_path)]
        data: Vec<(String, PathBuf)>,

        /// Write the full result as JSON here.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write a Markdown report here.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// List pattern signals in one CSV series as JSON.
    Scan {
        /// CSV file with `time,open,high,low,close[,volume]` rows.
        #[arg(long)]
        data: PathBuf,

        /// Keep only signals in these sessions (asia, london, new_york, off).
        #[arg(long = "session", value_parser = parse_name::<Session>)]
        sessions: Vec<Session>,

        /// Detectors to run (fair_value_gap, order_block, breaker_block, structure). Defaults to all.
        #[arg(long = "kind", value_parser = parse_name::<PatternKind>)]
        kinds: Vec<PatternKind>,
    },
    /// Print the engine's decision at the latest bar as JSON.
    Signal {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Timeframe data as `label=path`. Repeatable.
        #[arg(long = "data", required = true, value_parser = parse_labeled_path)]
        data: Vec<(String, PathBuf)>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Backtest {
            config,
            data,
            output,
            report,
        } => run_backtest_cmd(config, data, output, report),
        Commands::Scan {
            data,
            sessions,
            kinds,
        } => run_scan(data, sessions, kinds),
        Commands::Signal { config, data } => run_signal(config, data),
    }
}

fn parse_labeled_path(s: &str) -> Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((label, path)) if !label.is_empty() && !path.is_empty() => {
            Ok((label.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected label=path, got '{s}'")),
    }
}

/// Parse a snake_case name through the type's serde representation.
fn parse_name<T: DeserializeOwned>(s: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| format!("unknown name '{s}'"))
}

fn data_map(data: Vec<(String, PathBuf)>) -> Result<BTreeMap<String, PathBuf>> {
    let mut map = BTreeMap::new();
    for (label, path) in data {
        if map.insert(label.clone(), path).is_some() {
            bail!("timeframe '{label}' given more than once");
        }
    }
    Ok(map)
}

fn run_backtest_cmd(
    config_path: PathBuf,
    data: Vec<(String, PathBuf)>,
    output: Option<PathBuf>,
    report: Option<PathBuf>,
) -> Result<()> {
    let config = BacktestConfig::load(&config_path)?;
    let paths = data_map(data)?;
    let result = run_from_files(&config, &paths)?;

    print_summary(&result);

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Result saved to: {}", path.display());
    }
    if let Some(path) = report {
        std::fs::write(&path, markdown_report(&result))
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Report saved to: {}", path.display());
    }
    Ok(())
}

fn run_scan(data: PathBuf, sessions: Vec<Session>, kinds: Vec<PatternKind>) -> Result<()> {
    let series = load_series(&data)?;
    let kinds = if kinds.is_empty() {
        PatternKind::ALL.to_vec()
    } else {
        kinds
    };
    let table = SessionTable::standard();
    let signals: Vec<_> = scan_signals(series.as_slice(), &table, &kinds)
        .into_iter()
        .filter(|s| sessions.is_empty() || sessions.contains(&s.session))
        .collect();
    tracing::info!(bars = series.len(), signals = signals.len(), "scan complete");
    println!("{}", serde_json::to_string_pretty(&signals)?);
    Ok(())
}

fn run_signal(config_path: PathBuf, data: Vec<(String, PathBuf)>) -> Result<()> {
    let config = BacktestConfig::load(&config_path)?;
    let paths = data_map(data)?;
    let frame = load_frame(&config.backtest.reference, &paths)?;
    match latest_decision(&config, &frame)? {
        Some(decision) => println!("{}", serde_json::to_string_pretty(&decision)?),
        None => bail!("no aligned bars to evaluate"),
    }
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let s = &result.summary;
    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:         {}", result.symbol);
    println!("Reference:      {}", result.reference);
    println!(
        "Bars:           {} ({} warmup)",
        result.bar_count, result.warmup_bars
    );
    println!("Decisions:      {}", result.decisions.len());
    println!("Signals:        {}", result.signals.len());
    println!("Trades:         {} ({} unresolved)", s.trades, s.unresolved);
    println!();
    println!("--- Performance ---");
    println!("Win Rate:       {:.1}%", s.win_rate * 100.0);
    println!("Total PnL:      {:+.2}", s.total_pnl);
    println!("Avg Weekly PnL: {:+.2} ({} weeks)", s.avg_weekly_pnl, s.weeks);
    println!("Run ID:         {}", result.run_id);
}
