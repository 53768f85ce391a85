// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LoggingLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LoggingLevel {
    /// Level names as older deployments spell them, case-insensitive
    pub fn from_legacy(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "critical" | "error" => Some(Self::Error),
            "warning" | "warn" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" => Some(Self::Trace),
            _ => None,
        }
    }

    pub fn as_directive(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Options left unset fall back to the config file, then to defaults.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "stabbie", version)]
#[command(about = "Mount remote filesystems from fstab when their server answers, unmount them when it stops")]
pub struct Cli {
    /// TOML config file [default: /etc/stabbie.toml when present]
    #[arg(long, env = "STABBIE_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Mount table to reconcile [default: /etc/fstab]
    #[arg(long, env = "STABBIE_FSTAB", value_name = "FILE")]
    pub fstab: Option<PathBuf>,

    /// Option that opts an entry in [default: x-stabbie]
    #[arg(long, env = "STABBIE_MARKER", value_name = "TOKEN")]
    pub marker: Option<String>,

    /// Seconds to wait for each server [default: 3]
    #[arg(long, env = "STABBIE_PROBE_TIMEOUT", value_name = "SECS")]
    pub probe_timeout: Option<f64>,

    /// Entries processed at the same time [default: 8]
    #[arg(long, env = "STABBIE_MAX_CONCURRENCY", value_name = "N")]
    pub max_concurrency: Option<usize>,

    /// Seconds after which pending probes count as unreachable
    #[arg(long, env = "STABBIE_DEADLINE", value_name = "SECS")]
    pub deadline: Option<f64>,

    /// Seconds allowed for each mount or umount command [default: 30]
    #[arg(long, env = "STABBIE_COMMAND_TIMEOUT", value_name = "SECS")]
    pub command_timeout: Option<f64>,

    /// Pass -f to umount
    #[arg(long, env = "STABBIE_FORCE_UNMOUNT")]
    pub force_unmount: bool,

    /// Pass -l to umount
    #[arg(long, env = "STABBIE_LAZY_UNMOUNT")]
    pub lazy_unmount: bool,

    /// Decide and report without mounting or unmounting anything
    #[arg(long, env = "STABBIE_DRY_RUN")]
    pub dry_run: bool,

    /// Print the run report as JSON on stdout
    #[arg(long, env = "STABBIE_JSON")]
    pub json: bool,

    /// Colored log output
    #[arg(long, env = "STABBIE_COLOR")]
    pub color: bool,

    /// Log level, overridden by RUST_LOG [default: info]
    #[arg(long, env = "STABBIE_LOG_LEVEL", value_enum)]
    pub log_level: Option<LoggingLevel>,

    /// Also write logs to this file
    #[arg(long, env = "STABBIE_LOG_FILE", value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_flags() {
        let cli = Cli::try_parse_from([
            "stabbie",
            "--fstab",
            "/tmp/fstab",
            "--probe-timeout",
            "1.5",
            "--max-concurrency",
            "2",
            "--dry-run",
            "--log-level",
            "debug",
        ])
        .expect("valid arguments");

        assert_eq!(cli.fstab, Some(PathBuf::from("/tmp/fstab")));
        assert_eq!(cli.probe_timeout, Some(1.5));
        assert_eq!(cli.max_concurrency, Some(2));
        assert!(cli.dry_run);
        assert!(!cli.force_unmount);
        assert_eq!(cli.log_level, Some(LoggingLevel::Debug));
    }

    #[test]
    fn legacy_level_names_map_onto_levels() {
        assert_eq!(LoggingLevel::from_legacy("CRITICAL"), Some(LoggingLevel::Error));
        assert_eq!(LoggingLevel::from_legacy("WARNING"), Some(LoggingLevel::Warn));
        assert_eq!(LoggingLevel::from_legacy("debug"), Some(LoggingLevel::Debug));
        assert_eq!(LoggingLevel::from_legacy("NOTSET"), None);
    }

    #[test]
    fn rejects_unknown_log_level() {
        assert!(Cli::try_parse_from(["stabbie", "--log-level", "loud"]).is_err());
    }
}
