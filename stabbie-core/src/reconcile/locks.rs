// SPDX-License-Identifier: GPL-3.0-only

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use stabbie_types::normalize_mount_point;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async lock per mount point
///
/// Execution against distinct mount points runs in parallel, execution
/// against the same mount point is serialized. Paths are compared in their
/// normalized form.
#[derive(Debug, Clone, Default)]
pub struct MountPointLocks {
    inner: Arc<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>>,
}

impl MountPointLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `mount_point`. Released on drop.
    pub async fn acquire(&self, mount_point: &Path) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().await;
            locks
                .entry(normalize_mount_point(mount_point))
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_mount_point_is_serialized() {
        let locks = MountPointLocks::new();
        let guard = locks.acquire(Path::new("/mnt/a")).await;

        let contender = locks.clone();
        let waiting =
            tokio::spawn(async move { contender.acquire(Path::new("/mnt/a/")).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiting.is_finished());

        drop(guard);
        let second = tokio::time::timeout(Duration::from_secs(1), waiting)
            .await
            .expect("lock released")
            .expect("task completed");
        drop(second);
    }

    #[tokio::test]
    async fn distinct_mount_points_do_not_block() {
        let locks = MountPointLocks::new();
        let _a = locks.acquire(Path::new("/mnt/a")).await;
        let b = tokio::time::timeout(Duration::from_secs(1), locks.acquire(Path::new("/mnt/b")))
            .await;
        assert!(b.is_ok());
    }
}
