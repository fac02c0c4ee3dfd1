//! Check subcommand - query the metadata endpoint once

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use spotwatch_core::{Decision, Detector, MetadataClient};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Full endpoint URL (overrides base URL + mode path)
    #[arg(long)]
    pub url: Option<String>,
}

/// Exit status: 0 not terminating, 1 terminating
pub fn run(args: CheckArgs, config: &Config) -> Result<ExitCode> {
    let kind = config.metadata.mode;
    let client = MetadataClient::new(config.timeout()).context("Failed to build HTTP client")?;
    let detector = match args.url {
        Some(url) => Detector::with_url(kind, client, url),
        None => Detector::new(kind, client, &config.metadata.base_url),
    };
    log::debug!("Checking {}", detector.url());

    let decision = detector
        .check()
        .with_context(|| format!("{kind} check failed"))?;

    match decision {
        Decision::NotTerminating => {
            println!("not terminating");
            Ok(ExitCode::SUCCESS)
        }
        Decision::Terminating(notice) => {
            println!("terminating: {notice}");
            Ok(ExitCode::from(1))
        }
    }
}
