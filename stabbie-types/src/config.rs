// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TABLE_PATH: &str = "/etc/fstab";
pub const DEFAULT_MARKER: &str = "x-stabbie";
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// How `umount` is allowed to detach a mount point
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmountPolicy {
    /// `umount -f`
    pub force: bool,
    /// `umount -l`
    pub lazy: bool,
}

/// Settings for one reconciliation pass
///
/// Built by the binary from defaults, the config file, the environment and
/// flags, then passed explicitly to the engine. Nothing in the core reads
/// process-wide settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub table_path: PathBuf,
    /// Option token that opts an entry in
    pub marker: String,
    pub probe_timeout: Duration,
    /// Upper bound on entries processed at the same time
    pub max_concurrency: usize,
    /// Probes still running this long after the start count as unreachable
    pub deadline: Option<Duration>,
    pub command_timeout: Duration,
    pub unmount: UnmountPolicy,
    /// Decide without touching the OS
    pub dry_run: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            table_path: PathBuf::from(DEFAULT_TABLE_PATH),
            marker: DEFAULT_MARKER.to_string(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            deadline: None,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            unmount: UnmountPolicy::default(),
            dry_run: false,
        }
    }
}

impl RunConfig {
    /// Parallelism actually used, never zero
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_safe() {
        let config = RunConfig::default();
        assert_eq!(config.table_path, PathBuf::from("/etc/fstab"));
        assert_eq!(config.marker, "x-stabbie");
        assert!(!config.unmount.force);
        assert!(!config.unmount.lazy);
        assert!(config.deadline.is_none());
    }

    #[test]
    fn zero_concurrency_is_clamped() {
        let config = RunConfig {
            max_concurrency: 0,
            ..RunConfig::default()
        };
        assert_eq!(config.effective_concurrency(), 1);
    }
}
