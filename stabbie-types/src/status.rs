// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReachabilityStatus {
    Reachable,
    Unreachable,
}

impl fmt::Display for ReachabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReachabilityStatus::Reachable => write!(f, "reachable"),
            ReachabilityStatus::Unreachable => write!(f, "unreachable"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MountState {
    Mounted,
    Unmounted,
}

impl MountState {
    pub fn from_present(present: bool) -> Self {
        if present {
            MountState::Mounted
        } else {
            MountState::Unmounted
        }
    }
}

impl fmt::Display for MountState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountState::Mounted => write!(f, "mounted"),
            MountState::Unmounted => write!(f, "unmounted"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Mount,
    Unmount,
    NoOp,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Mount => write!(f, "mount"),
            Decision::Unmount => write!(f, "unmount"),
            Decision::NoOp => write!(f, "no-op"),
        }
    }
}

/// Result of acting (or not acting) on one entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum ExecutionOutcome {
    Success,
    Skipped,
    Failed(String),
}

impl ExecutionOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        ExecutionOutcome::Failed(reason.into())
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ExecutionOutcome::Failed(_))
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionOutcome::Success => write!(f, "success"),
            ExecutionOutcome::Skipped => write!(f, "skipped"),
            ExecutionOutcome::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_outcome_serializes_with_reason() {
        let json = serde_json::to_string(&ExecutionOutcome::failed("busy")).expect("serialize");
        assert_eq!(json, r#"{"status":"failed","reason":"busy"}"#);

        let json = serde_json::to_string(&ExecutionOutcome::Skipped).expect("serialize");
        assert_eq!(json, r#"{"status":"skipped"}"#);
    }
}
