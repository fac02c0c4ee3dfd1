//! Watch subcommand - block until the instance is reclaimed

use std::process::ExitCode;

use anyhow::{Context, Result};

use crate::config::Config;

pub fn run(config: &Config) -> Result<ExitCode> {
    spotwatch_core::install_signal_handlers().context("Failed to register signal handlers")?;

    let exit = spotwatch_core::watch(&config.watch_config(), spotwatch_core::shutdown_flag())
        .context("Failed to start watcher")?;

    Ok(ExitCode::from(exit.code()))
}
