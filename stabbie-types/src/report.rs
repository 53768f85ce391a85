// SPDX-License-Identifier: GPL-3.0-only

//! Run report handed back to the reporting layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use crate::entry::{Entry, ProbeTarget};
use crate::status::{Decision, ExecutionOutcome, MountState, ReachabilityStatus};

/// A table line that could not be turned into an entry
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ParseWarning {
    #[error("line {line}: expected 4 to 6 fields, found {found}")]
    FieldCount { line: usize, found: usize },

    #[error("line {line}: {field} field is not a number: {value:?}")]
    InvalidNumber {
        line: usize,
        field: String,
        value: String,
    },

    #[error("line {line}: invalid {fs_type} device: {reason}")]
    DeviceSpec {
        line: usize,
        fs_type: String,
        reason: String,
    },

    #[error("line {line}: mount point is not absolute: {}", .mount_point.display())]
    RelativeMountPoint { line: usize, mount_point: PathBuf },
}

impl ParseWarning {
    pub fn line(&self) -> usize {
        match self {
            ParseWarning::FieldCount { line, .. }
            | ParseWarning::InvalidNumber { line, .. }
            | ParseWarning::DeviceSpec { line, .. }
            | ParseWarning::RelativeMountPoint { line, .. } => *line,
        }
    }
}

/// Eligible entries that cannot be reconciled together
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ConfigurationError {
    #[error("mount point {} is claimed by lines {lines:?}, all of them are excluded", .mount_point.display())]
    DuplicateMountPoint {
        mount_point: PathBuf,
        lines: Vec<usize>,
    },
}

/// What happened to one eligible entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryReport {
    pub entry: Entry,
    pub target: ProbeTarget,
    /// `None` when the entry never got to the probe
    pub reachability: Option<ReachabilityStatus>,
    /// `None` when the mount table could not be read for this entry
    pub mount_state: Option<MountState>,
    pub decision: Decision,
    pub outcome: ExecutionOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    /// In table order
    pub entries: Vec<EntryReport>,
    pub warnings: Vec<ParseWarning>,
    pub conflicts: Vec<ConfigurationError>,
    /// False when at least one entry failed
    pub success: bool,
}

impl RunReport {
    pub fn new(
        run_id: Uuid,
        started_at: DateTime<Utc>,
        dry_run: bool,
        entries: Vec<EntryReport>,
        warnings: Vec<ParseWarning>,
        conflicts: Vec<ConfigurationError>,
    ) -> Self {
        let success = !entries.iter().any(|entry| entry.outcome.is_failed());
        Self {
            run_id,
            started_at,
            finished_at: Utc::now(),
            dry_run,
            entries,
            warnings,
            conflicts,
            success,
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.success
    }

    pub fn failures(&self) -> impl Iterator<Item = &EntryReport> {
        self.entries.iter().filter(|entry| entry.outcome.is_failed())
    }

    pub fn count(&self, decision: Decision) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.decision == decision)
            .count()
    }
}
