// SPDX-License-Identifier: GPL-3.0-only

use stabbie_contracts::StabbieError;
use which::which;

pub const MOUNT_BINARY: &str = "mount";
pub const UMOUNT_BINARY: &str = "umount";

pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

pub fn require_root() -> Result<(), StabbieError> {
    if is_root() {
        Ok(())
    } else {
        Err(StabbieError::permission_denied(
            "insufficient privileges to mount and unmount, run as root",
        ))
    }
}

/// Every binary must resolve on PATH
pub fn require_binaries(names: &[&str]) -> Result<(), StabbieError> {
    for name in names {
        which(name)
            .map_err(|e| StabbieError::unavailable(format!("{name} not found on PATH: {e}")))?;
    }
    Ok(())
}
