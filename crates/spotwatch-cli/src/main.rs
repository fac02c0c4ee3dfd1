//! spotwatch - Spot instance termination watcher
//!
//! Polls the instance metadata service and exits with status 1 as soon as
//! the instance is scheduled for reclamation.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use spotwatch_core::DetectorKind;

mod cmd;
mod config;

use config::{Config, Overrides};

#[derive(Parser)]
#[command(name = "spotwatch")]
#[command(about = "Spot instance termination watcher")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file path (default: ./spotwatch.toml or ~/.config/spotwatch/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Metadata service base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Endpoint to poll
    #[arg(short, long, value_enum, global = true)]
    mode: Option<Mode>,

    /// Milliseconds between checks
    #[arg(long, global = true)]
    interval_ms: Option<u64>,

    /// Per-request timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Poll until the instance is reclaimed, then exit with status 1
    Watch,
    /// Query the endpoint once (exit 0: not terminating, 1: terminating)
    Check(cmd::check::CheckArgs),
    /// Show current configuration
    Config,
}

#[derive(Clone, Copy, ValueEnum, Debug)]
enum Mode {
    /// JSON action record at /spot/instance-action
    InstanceAction,
    /// Bare timestamp at /spot/termination-time
    TerminationTime,
}

impl From<Mode> for DetectorKind {
    fn from(m: Mode) -> Self {
        match m {
            Mode::InstanceAction => DetectorKind::InstanceAction,
            Mode::TerminationTime => DetectorKind::TerminationTime,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    spotwatch_core::init_logging(cli.quiet, cli.debug);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            log::error!("Fatal error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    // Config file defaults, CLI overrides
    let mut config = if let Some(path) = &cli.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };
    config.apply(Overrides {
        base_url: cli.base_url,
        mode: cli.mode.map(DetectorKind::from),
        interval_ms: cli.interval_ms,
        timeout_ms: cli.timeout_ms,
    });
    config.validate()?;

    match cli.command {
        Command::Watch => cmd::watch::run(&config),
        Command::Check(args) => cmd::check::run(args, &config),
        Command::Config => {
            use comfy_table::{
                Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
            };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            let watch = config.watch_config();
            table.add_row(vec!["Base URL", &config.metadata.base_url]);
            table.add_row(vec!["Mode", config.metadata.mode.name()]);
            table.add_row(vec!["Path", config.metadata.mode.path()]);
            table.add_row(vec!["Interval", &format!("{}ms", config.poll.interval_ms)]);
            table.add_row(vec!["Timeout", &format!("{}ms", config.poll.timeout_ms)]);
            table.add_row(vec!["After first notice", &format!("{:?}", watch.after_fire)]);

            eprintln!("\n{table}");
            Ok(ExitCode::SUCCESS)
        }
    }
}
