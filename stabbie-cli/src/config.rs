// SPDX-License-Identifier: GPL-3.0-only

//! Settings layering
//!
//! Defaults, then the TOML config file, then the unprefixed `LOG_LEVEL` and
//! `COLOR_LOGS` variables, then `STABBIE_*` variables and command-line flags
//! (clap resolves those two).

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use stabbie_types::{RunConfig, UnmountPolicy};

use crate::cli::{Cli, LoggingLevel};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/stabbie.toml";

/// Contents of the config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub fstab: Option<PathBuf>,
    pub marker: Option<String>,
    pub probe_timeout: Option<f64>,
    pub max_concurrency: Option<usize>,
    pub deadline: Option<f64>,
    pub command_timeout: Option<f64>,
    pub force_unmount: Option<bool>,
    pub lazy_unmount: Option<bool>,
    pub log_level: Option<LoggingLevel>,
    pub log_file: Option<PathBuf>,
    pub color: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))
    }
}

/// Unprefixed logging variables older deployments still set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyEnv {
    /// `DEBUG`, `INFO`, `WARNING`, `ERROR` or `CRITICAL`
    pub log_level: Option<String>,
    /// `1` turns colors on, anything else off
    pub color_logs: Option<String>,
}

impl LegacyEnv {
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("LOG_LEVEL").ok(),
            color_logs: env::var("COLOR_LOGS").ok(),
        }
    }

    /// Layer the variables over the file settings.
    pub fn apply(self, mut file: FileConfig) -> Result<FileConfig> {
        if let Some(raw) = self.log_level {
            let level = LoggingLevel::from_legacy(&raw)
                .with_context(|| format!("LOG_LEVEL is not a log level: {raw:?}"))?;
            file.log_level = Some(level);
        }
        if let Some(raw) = self.color_logs {
            file.color = Some(raw.trim() == "1");
        }
        Ok(file)
    }
}

/// Everything the binary needs after layering
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub run: RunConfig,
    pub json: bool,
    pub color: bool,
    pub log_level: LoggingLevel,
    pub log_file: Option<PathBuf>,
}

/// Load the config file the command line points at, or the default one
/// when it exists.
pub fn load_file(cli: &Cli) -> Result<FileConfig> {
    match &cli.config {
        Some(path) => FileConfig::load(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                FileConfig::load(default)
            } else {
                Ok(FileConfig::default())
            }
        }
    }
}

pub fn resolve(cli: &Cli) -> Result<Settings> {
    let file = LegacyEnv::from_env().apply(load_file(cli)?)?;
    merge(cli, file)
}

pub fn merge(cli: &Cli, file: FileConfig) -> Result<Settings> {
    let defaults = RunConfig::default();

    let probe_timeout = match cli.probe_timeout.or(file.probe_timeout) {
        Some(secs) => seconds("probe timeout", secs)?,
        None => defaults.probe_timeout,
    };
    let command_timeout = match cli.command_timeout.or(file.command_timeout) {
        Some(secs) => seconds("command timeout", secs)?,
        None => defaults.command_timeout,
    };
    let deadline = cli
        .deadline
        .or(file.deadline)
        .map(|secs| seconds("deadline", secs))
        .transpose()?;

    let max_concurrency = cli
        .max_concurrency
        .or(file.max_concurrency)
        .unwrap_or(defaults.max_concurrency);
    if max_concurrency == 0 {
        bail!("max concurrency must be at least 1");
    }

    let marker = cli
        .marker
        .clone()
        .or(file.marker)
        .unwrap_or(defaults.marker);
    if marker.is_empty() || marker.contains(',') || marker.contains(char::is_whitespace) {
        bail!("marker must be a single option token, got {:?}", marker);
    }

    let run = RunConfig {
        table_path: cli.fstab.clone().or(file.fstab).unwrap_or(defaults.table_path),
        marker,
        probe_timeout,
        max_concurrency,
        deadline,
        command_timeout,
        unmount: UnmountPolicy {
            force: cli.force_unmount || file.force_unmount.unwrap_or(false),
            lazy: cli.lazy_unmount || file.lazy_unmount.unwrap_or(false),
        },
        dry_run: cli.dry_run,
    };

    Ok(Settings {
        run,
        json: cli.json,
        color: cli.color || file.color.unwrap_or(false),
        log_level: cli.log_level.or(file.log_level).unwrap_or_default(),
        log_file: cli.log_file.clone().or(file.log_file),
    })
}

fn seconds(name: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .with_context(|| format!("{name} must be a non-negative number of seconds, got {secs}"))
}
