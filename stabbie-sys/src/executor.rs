// SPDX-License-Identifier: GPL-3.0-only

//! `mount(8)` / `umount(8)` wrapper
//!
//! The helpers are used instead of the raw syscalls so that network
//! filesystem helpers (`mount.nfs`, `mount.cifs`, `sshfs`) take care of name
//! resolution and option translation.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use stabbie_contracts::{MountExecutor, StabbieError};
use stabbie_types::{DEFAULT_COMMAND_TIMEOUT, ExecutionOutcome, MountInvocation, UnmountPolicy};
use tracing::{debug, info, warn};

use crate::cmd::{self, CommandOutcome};
use crate::error::SysError;
use crate::privileges::{self, MOUNT_BINARY, UMOUNT_BINARY};

/// Executes mounts through the system mount helpers
#[derive(Debug, Clone)]
pub struct CommandMountExecutor {
    command_timeout: Duration,
}

impl CommandMountExecutor {
    pub fn new(command_timeout: Duration) -> Self {
        Self { command_timeout }
    }

    pub fn mount_args(invocation: &MountInvocation) -> Vec<String> {
        let mut args = vec!["-t".to_string(), invocation.fs_type.clone()];
        if !invocation.options.is_empty() {
            args.push("-o".to_string());
            args.push(invocation.options.clone());
        }
        args.push(invocation.source.clone());
        args.push(invocation.target.display().to_string());
        args
    }

    pub fn unmount_args(target: &Path, policy: UnmountPolicy) -> Vec<String> {
        let mut args = Vec::new();
        if policy.force {
            args.push("-f".to_string());
        }
        if policy.lazy {
            args.push("-l".to_string());
        }
        args.push(target.display().to_string());
        args
    }

    fn command_error_outcome(&self, error: SysError) -> ExecutionOutcome {
        match error {
            SysError::CommandTimeout { timeout, .. } => {
                ExecutionOutcome::failed(format!("timed out after {}s", timeout.as_secs_f64()))
            }
            other => ExecutionOutcome::failed(other.to_string()),
        }
    }
}

impl Default for CommandMountExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

#[async_trait]
impl MountExecutor for CommandMountExecutor {
    async fn preflight(&self) -> Result<(), StabbieError> {
        privileges::require_root()?;
        privileges::require_binaries(&[MOUNT_BINARY, UMOUNT_BINARY])
    }

    async fn mount(&self, invocation: &MountInvocation) -> ExecutionOutcome {
        info!(
            "Mounting {} at {}",
            invocation.source,
            invocation.target.display()
        );
        let args = Self::mount_args(invocation);
        match cmd::run(MOUNT_BINARY, &args, self.command_timeout).await {
            Ok(output) => mount_outcome(&output),
            Err(e) => self.command_error_outcome(e),
        }
    }

    async fn unmount(&self, target: &Path, policy: UnmountPolicy) -> ExecutionOutcome {
        info!("Unmounting {}", target.display());
        let args = Self::unmount_args(target, policy);
        match cmd::run(UMOUNT_BINARY, &args, self.command_timeout).await {
            Ok(output) => unmount_outcome(&output),
            Err(e) => self.command_error_outcome(e),
        }
    }
}

/// Interpret a finished `mount` command.
///
/// An "already mounted" refusal means someone else won the race, which
/// leaves the target in the wanted state.
pub fn mount_outcome(output: &CommandOutcome) -> ExecutionOutcome {
    if output.success {
        return ExecutionOutcome::Success;
    }

    let stderr = output.stderr.to_lowercase();
    if stderr.contains("already mounted") {
        debug!("{}: target already mounted", output.command);
        return ExecutionOutcome::Success;
    }

    let message = output.failure_message();
    warn!("{} failed: {}", output.command, message);
    ExecutionOutcome::Failed(message)
}

/// Interpret a finished `umount` command.
pub fn unmount_outcome(output: &CommandOutcome) -> ExecutionOutcome {
    if output.success {
        return ExecutionOutcome::Success;
    }

    let stderr = output.stderr.to_lowercase();
    if stderr.contains("busy") {
        warn!("{}: target is busy", output.command);
        return ExecutionOutcome::failed("busy");
    }
    if stderr.contains("not mounted") {
        debug!("{}: target already unmounted", output.command);
        return ExecutionOutcome::Success;
    }

    let message = output.failure_message();
    warn!("{} failed: {}", output.command, message);
    ExecutionOutcome::Failed(message)
}
