//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::adapters::csv_adapter::CsvTickSource;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{load_engine_config, EngineConfig};
use crate::domain::error::EngineError;
use crate::domain::metrics::PerformanceSnapshot;
use crate::domain::orchestrator::StrategyOrchestrator;
use crate::domain::strategy::{ShutdownReport, StrategyInstance};
use crate::ports::tick_port::TickSource;

#[derive(Parser, Debug)]
#[command(name = "streamtrader", about = "Streaming strategy execution engine")]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a tick file through every configured strategy
    Run {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        ticks: PathBuf,
        /// Close open positions at the last price instead of reporting them as unrealized
        #[arg(long)]
        liquidate: bool,
        /// Abort on the first malformed tick instead of skipping it
        #[arg(long)]
        strict: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(&cli.log_level);
    match cli.command {
        Command::Run {
            config,
            ticks,
            liquidate,
            strict,
        } => run_engine(&config, &ticks, liquidate, strict),
        Command::Validate { config } => run_validate(&config),
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn init_tracing(level: &str) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    // a subscriber may already be installed when embedded
    let _ = tracing::subscriber::set_global_default(subscriber);
}

pub fn load_config(path: &Path) -> Result<EngineConfig, EngineError> {
    let adapter = FileConfigAdapter::from_file(path)?;
    load_engine_config(&adapter)
}

fn fail(err: &EngineError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

fn run_engine(config_path: &Path, ticks_path: &Path, liquidate: bool, strict: bool) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    let mut orchestrator = StrategyOrchestrator::new(config.settings);
    for strategy in config.strategies {
        if let Err(e) = orchestrator.register(StrategyInstance::new(strategy)) {
            return fail(&e);
        }
    }

    let source = match CsvTickSource::from_path(ticks_path) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    eprintln!(
        "Streaming {} through {} strategies",
        ticks_path.display(),
        orchestrator.len()
    );

    let (skipped, mut faults) = match stream_ticks(&mut orchestrator, source, strict) {
        Ok(counts) => counts,
        Err(e) => return fail(&e),
    };
    info!(
        ticks = orchestrator.dispatched(),
        skipped,
        faults,
        halted = orchestrator.is_halted(),
        "feed finished"
    );

    let aggregate = orchestrator.aggregate();
    let reports = orchestrator.shutdown(liquidate);

    println!("=== Strategy Results ===");
    for report in &reports {
        match report {
            Ok(report) => print_report(report),
            Err(e) => {
                eprintln!("error: {e}");
                faults += 1;
            }
        }
    }

    println!("\n=== Aggregate ===");
    println!("Ticks:            {}", orchestrator.dispatched());
    println!("Skipped Ticks:    {skipped}");
    println!("Strategies:       {}", aggregate.instances);
    println!("Total Trades:     {}", aggregate.total_trades);
    println!("Win Rate:         {:.1}%", aggregate.win_rate() * 100.0);
    println!("Total PnL:        {:.2}", aggregate.total_pnl);
    println!("Total Fees:       {:.2}", aggregate.total_fees);
    println!("Capital:          {:.2}", aggregate.current_capital);
    if orchestrator.is_halted() {
        println!("Halted:           total loss limit reached");
    }

    if faults > 0 {
        eprintln!("error: {faults} settlement faults during run");
        return ExitCode::from(4);
    }
    ExitCode::SUCCESS
}

/// Dispatch every tick from `source`. Returns the skipped-tick and fault
/// counts; in strict mode the first feed error aborts.
fn stream_ticks(
    orchestrator: &mut StrategyOrchestrator,
    source: impl TickSource,
    strict: bool,
) -> Result<(u64, u64), EngineError> {
    let parallel = orchestrator.settings().parallel;
    let mut skipped = 0u64;
    let mut faults = 0u64;
    for item in source {
        let tick = match item {
            Ok(tick) => tick,
            Err(e) if strict => return Err(e),
            Err(e) => {
                warn!(error = %e, "skipping malformed tick");
                skipped += 1;
                continue;
            }
        };
        let outcomes = if parallel {
            orchestrator.dispatch_parallel(&tick)
        } else {
            orchestrator.dispatch(&tick)
        };
        faults += outcomes.iter().filter(|o| o.result.is_err()).count() as u64;
        if orchestrator.is_halted() {
            break;
        }
    }
    Ok((skipped, faults))
}

fn print_report(report: &ShutdownReport) {
    println!("\n[{}]", report.name);
    print_snapshot(&report.snapshot);
    if let Some(open) = &report.unrealized {
        println!(
            "Open Position:    {} {:.6} @ {:.4}, mark {:.4}, unrealized {:.2}",
            open.side, open.size, open.entry_price, open.mark_price, open.net_pnl
        );
    }
    if let Some(trade) = &report.liquidated {
        println!(
            "Liquidated:       {} @ {:.4}, net {:.2}",
            trade.side, trade.exit_price, trade.net_pnl
        );
    }
}

fn print_snapshot(snap: &PerformanceSnapshot) {
    println!("Total Trades:     {}", snap.total_trades);
    println!(
        "Wins / Losses:    {} / {}",
        snap.winning_trades, snap.losing_trades
    );
    println!("Win Rate:         {:.1}%", snap.win_rate * 100.0);
    println!("Total PnL:        {:.2}", snap.total_pnl);
    println!("Total Fees:       {:.2}", snap.total_fees);
    println!("Capital:          {:.2}", snap.current_capital);
    println!("ROI:              {:.2}%", snap.roi_pct);
    println!("Max Drawdown:     -{:.1}%", snap.max_drawdown_pct);
    println!("Profit Factor:    {:.2}", snap.profit_factor);
    for (reason, count) in &snap.exits_by_reason {
        println!("  {reason:<16}{count}");
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    let settings = &config.settings;
    println!(
        "Engine: max_total_loss={} parallel={} snapshot_interval={}",
        settings.max_total_loss, settings.parallel, settings.snapshot_interval
    );
    for strategy in config.strategies {
        let kinds = strategy.rule.required_indicators(&strategy.indicators);
        let instance = StrategyInstance::new(strategy);
        let names: Vec<String> = kinds.iter().map(ToString::to_string).collect();
        println!("\n[{}]", instance.name());
        println!("  Rule:       {}", instance.config().rule);
        println!("  Indicators: {}", names.join(", "));
        println!("  Warm-up:    {} ticks", instance.warmup());
        println!("  Leverage:   {}x", instance.config().leverage);
    }
    eprintln!("\nConfig validated successfully");
    ExitCode::SUCCESS
}
