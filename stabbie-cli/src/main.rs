// SPDX-License-Identifier: GPL-3.0-only

//! stabbie - mount remote filesystems from fstab while their server answers
//!
//! One pass per invocation: every fstab entry carrying the marker option is
//! probed, compared with the live mount table and mounted or unmounted to
//! match. Scheduling (timers, network hooks) is left to the caller.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use stabbie_core::{ReconciliationEngine, StrategyRegistry};
use stabbie_sys::{CommandMountExecutor, MountInfoInspector, TcpProbe};
use stabbie_types::RunReport;

mod cli;
mod config;
mod logging;
mod report;

use cli::Cli;
use config::Settings;
use report::EXIT_FATAL;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match config::resolve(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("stabbie: {e:#}");
            return ExitCode::from(EXIT_FATAL);
        }
    };

    logging::init(&settings);
    tracing::debug!(
        "stabbie v{} with {:?}",
        env!("CARGO_PKG_VERSION"),
        settings.run
    );

    match run(&settings).await {
        Ok(run_report) => {
            report::log_report(&run_report);
            if settings.json {
                match report::render_json(&run_report) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        tracing::error!("{e:#}");
                        return ExitCode::from(EXIT_FATAL);
                    }
                }
            }
            ExitCode::from(report::exit_status(&run_report))
        }
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn run(settings: &Settings) -> Result<RunReport> {
    let registry = StrategyRegistry::with_defaults();
    tracing::debug!("Supported types: {:?}", registry.supported_types());

    let engine = ReconciliationEngine::new(
        Arc::new(TcpProbe::new()),
        Arc::new(MountInfoInspector::new()),
        Arc::new(CommandMountExecutor::new(settings.run.command_timeout)),
        registry,
    );

    Ok(engine.run(&settings.run).await?)
}
