// SPDX-License-Identifier: GPL-3.0-only

use std::time::Duration;

use async_trait::async_trait;

use stabbie_types::{ProbeTarget, ReachabilityStatus};

/// Bounded check of whether a remote endpoint answers
///
/// Implementations never fail: timeouts, refused connections, resolution
/// errors and any other transport error all resolve to
/// [`ReachabilityStatus::Unreachable`]. The timeout has no default and must
/// be supplied by the caller.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn probe(&self, target: &ProbeTarget, timeout: Duration) -> ReachabilityStatus;
}
