// SPDX-License-Identifier: GPL-3.0-only

use std::path::Path;

use async_trait::async_trait;

use stabbie_types::MountState;

use crate::StabbieError;

/// Read-only view of the live mount table
///
/// Reports presence only. Several records for the same target (stacked
/// mounts) still yield a single [`MountState::Mounted`].
#[async_trait]
pub trait MountStateInspector: Send + Sync {
    async fn current_state(&self, mount_point: &Path) -> Result<MountState, StabbieError>;
}
