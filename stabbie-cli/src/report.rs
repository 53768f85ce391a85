// SPDX-License-Identifier: GPL-3.0-only

use anyhow::{Context, Result};
use stabbie_types::{Decision, EntryReport, ExecutionOutcome, ParseWarning, RunReport};
use tracing::{info, warn};

pub const EXIT_OK: u8 = 0;
pub const EXIT_FAILED_ENTRIES: u8 = 1;
pub const EXIT_FATAL: u8 = 2;

/// One line per entry, e.g.
/// `/mnt/a (10.0.0.5:2049): unreachable, mounted -> unmount: failed: busy`
///
/// Types that log in as someone show the login too: `backup@nas:22`.
pub fn describe(report: &EntryReport) -> String {
    let target = match report.entry.remote().and_then(|remote| remote.user.as_deref()) {
        Some(user) => format!("{user}@{}", report.target),
        None => report.target.to_string(),
    };
    let reachability = report
        .reachability
        .map(|status| status.to_string())
        .unwrap_or_else(|| "not probed".to_string());
    let state = report
        .mount_state
        .map(|state| state.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    format!(
        "{} ({}): {}, {} -> {}: {}",
        report.entry.mount_point.display(),
        target,
        reachability,
        state,
        report.decision,
        report.outcome
    )
}

pub fn log_report(report: &RunReport) {
    for entry in &report.entries {
        match entry.outcome {
            ExecutionOutcome::Failed(_) => warn!("{}", describe(entry)),
            _ => info!("{}", describe(entry)),
        }
    }

    if !report.conflicts.is_empty() {
        warn!(
            "{} mount point(s) claimed more than once were left alone",
            report.conflicts.len()
        );
    }

    info!("{}", summary(report));
}

pub fn summary(report: &RunReport) -> String {
    let mut line = format!(
        "{} entries: {} mounted, {} unmounted, {} untouched, {} failed",
        report.entries.len(),
        count_successes(report, Decision::Mount),
        count_successes(report, Decision::Unmount),
        report.count(Decision::NoOp),
        report.failures().count(),
    );
    if !report.warnings.is_empty() {
        let lines: Vec<String> = report
            .warnings
            .iter()
            .map(ParseWarning::line)
            .map(|line| line.to_string())
            .collect();
        line.push_str(&format!(", unreadable line(s) {}", lines.join(", ")));
    }
    if report.dry_run {
        line.push_str(" (dry run)");
    }
    line
}

fn count_successes(report: &RunReport, decision: Decision) -> usize {
    report
        .entries
        .iter()
        .filter(|entry| entry.decision == decision && entry.outcome == ExecutionOutcome::Success)
        .count()
}

pub fn render_json(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize run report")
}

pub fn exit_status(report: &RunReport) -> u8 {
    if report.has_failures() {
        EXIT_FAILED_ENTRIES
    } else {
        EXIT_OK
    }
}
