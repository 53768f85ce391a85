// SPDX-License-Identifier: GPL-3.0-only

use std::path::Path;

use async_trait::async_trait;

use stabbie_types::{ExecutionOutcome, MountInvocation, UnmountPolicy};

use crate::StabbieError;

/// Side-effecting half of a reconciliation pass
///
/// Per-call failures come back as [`ExecutionOutcome::Failed`] and are never
/// turned into errors here. Only [`MountExecutor::preflight`] may stop a run.
#[async_trait]
pub trait MountExecutor: Send + Sync {
    /// Checked once before any entry is acted on
    async fn preflight(&self) -> Result<(), StabbieError> {
        Ok(())
    }

    /// Mount `invocation.source` on `invocation.target`.
    ///
    /// A target that turns out to be mounted already is a success.
    async fn mount(&self, invocation: &MountInvocation) -> ExecutionOutcome;

    /// Detach `target`. A busy target yields `Failed("busy")` unless the
    /// policy allows forcing it.
    async fn unmount(&self, target: &Path, policy: UnmountPolicy) -> ExecutionOutcome;
}
