// SPDX-License-Identifier: GPL-3.0-only

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use stabbie_contracts::{MountStateInspector, StabbieError};
use stabbie_types::{MountState, normalize_mount_point, unescape_mount_field};
use tracing::debug;

use crate::error::{Result, SysError};

pub const DEFAULT_MOUNTINFO_PATH: &str = "/proc/self/mountinfo";

/// Mount state straight from the kernel's mountinfo table
///
/// The table is read again on every query.
#[derive(Debug, Clone)]
pub struct MountInfoInspector {
    mountinfo_path: PathBuf,
}

impl MountInfoInspector {
    pub fn new() -> Self {
        Self::with_path(DEFAULT_MOUNTINFO_PATH)
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            mountinfo_path: path.into(),
        }
    }

    pub async fn active_mount_points(&self) -> Result<Vec<PathBuf>> {
        let mount_info = tokio::fs::read_to_string(&self.mountinfo_path).await?;
        parse_mountinfo(&mount_info)
    }
}

impl Default for MountInfoInspector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MountStateInspector for MountInfoInspector {
    async fn current_state(
        &self,
        mount_point: &Path,
    ) -> std::result::Result<MountState, StabbieError> {
        let mount_points = self.active_mount_points().await?;
        let state = MountState::from_present(is_listed(&mount_points, mount_point));
        debug!("{} is {}", mount_point.display(), state);
        Ok(state)
    }
}

/// Mount targets listed in a mountinfo table, in table order.
///
/// Stacked mounts show up once per record.
pub fn parse_mountinfo(input: &str) -> Result<Vec<PathBuf>> {
    let mut targets = Vec::new();

    for line in input.lines().filter(|line| !line.trim().is_empty()) {
        let (left, _) = line
            .split_once(" - ")
            .ok_or_else(|| SysError::InvalidMountInfoLine(line.to_string()))?;

        let mount_point = left
            .split_whitespace()
            .nth(4)
            .ok_or_else(|| SysError::InvalidMountInfoLine(line.to_string()))?;

        targets.push(PathBuf::from(unescape_mount_field(mount_point)));
    }

    Ok(targets)
}

/// Any matching record counts, however many there are.
pub fn is_listed(mount_points: &[PathBuf], mount_point: &Path) -> bool {
    let wanted = normalize_mount_point(mount_point);
    mount_points
        .iter()
        .any(|listed| normalize_mount_point(listed) == wanted)
}
