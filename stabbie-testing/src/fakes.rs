// SPDX-License-Identifier: GPL-3.0-only

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use stabbie_contracts::{
    MountExecutor, MountStateInspector, ReachabilityProbe, StabbieError, StabbieErrorKind,
};
use stabbie_types::{
    ExecutionOutcome, MountInvocation, MountState, ProbeTarget, ReachabilityStatus,
    UnmountPolicy, normalize_mount_point,
};

/// Probe answering from a per-host table
///
/// Unknown hosts are unreachable. A host with a delay longer than the probe
/// timeout resolves to unreachable once the timeout has elapsed, like a
/// server that never answers.
#[derive(Debug, Default)]
pub struct FakeProbe {
    statuses: Mutex<HashMap<String, ReachabilityStatus>>,
    delays: Mutex<HashMap<String, Duration>>,
    probes: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, host: &str, status: ReachabilityStatus) {
        lock(&self.statuses).insert(host.to_string(), status);
    }

    pub fn reachable(self, host: &str) -> Self {
        self.set_status(host, ReachabilityStatus::Reachable);
        self
    }

    pub fn unreachable(self, host: &str) -> Self {
        self.set_status(host, ReachabilityStatus::Unreachable);
        self
    }

    pub fn with_delay(self, host: &str, delay: Duration) -> Self {
        lock(&self.delays).insert(host.to_string(), delay);
        self
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Highest number of probes that were running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReachabilityProbe for FakeProbe {
    async fn probe(&self, target: &ProbeTarget, timeout: Duration) -> ReachabilityStatus {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let delay = lock(&self.delays).get(target.host()).copied();
        let status = match delay {
            Some(delay) if delay >= timeout => {
                tokio::time::sleep(timeout).await;
                ReachabilityStatus::Unreachable
            }
            Some(delay) => {
                tokio::time::sleep(delay).await;
                self.status_of(target.host())
            }
            None => {
                tokio::task::yield_now().await;
                self.status_of(target.host())
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        status
    }
}

impl FakeProbe {
    fn status_of(&self, host: &str) -> ReachabilityStatus {
        lock(&self.statuses)
            .get(host)
            .copied()
            .unwrap_or(ReachabilityStatus::Unreachable)
    }
}

/// Live mount table and mount helper in one
///
/// Mounting adds the target, unmounting removes it, and both count as one
/// OS call. Busy targets, failing mounts, stacked mounts and unreadable
/// state can be injected per mount point.
#[derive(Debug, Default)]
pub struct FakeMountTable {
    mounted: Mutex<HashMap<PathBuf, usize>>,
    busy: Mutex<HashSet<PathBuf>>,
    mount_failures: Mutex<HashMap<PathBuf, String>>,
    unreadable: Mutex<HashSet<PathBuf>>,
    preflight_error: Mutex<Option<StabbieError>>,
    invocations: Mutex<Vec<MountInvocation>>,
    unmounts: Mutex<Vec<(PathBuf, UnmountPolicy)>>,
    mount_calls: AtomicUsize,
    unmount_calls: AtomicUsize,
}

impl FakeMountTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `mount_point` mounted once
    pub fn with_mounted(self, mount_point: impl AsRef<Path>) -> Self {
        self.stack(mount_point, 1)
    }

    /// Start with `layers` mounts stacked on `mount_point`
    pub fn stack(self, mount_point: impl AsRef<Path>, layers: usize) -> Self {
        lock(&self.mounted).insert(key(mount_point.as_ref()), layers);
        self
    }

    /// Unmounting `mount_point` fails with "busy" unless forced
    pub fn busy(self, mount_point: impl AsRef<Path>) -> Self {
        lock(&self.busy).insert(key(mount_point.as_ref()));
        self
    }

    pub fn failing_mount(self, mount_point: impl AsRef<Path>, reason: &str) -> Self {
        lock(&self.mount_failures).insert(key(mount_point.as_ref()), reason.to_string());
        self
    }

    /// Inspection of `mount_point` returns an error
    pub fn unreadable(self, mount_point: impl AsRef<Path>) -> Self {
        lock(&self.unreadable).insert(key(mount_point.as_ref()));
        self
    }

    pub fn refusing_preflight(self, error: StabbieError) -> Self {
        *lock(&self.preflight_error) = Some(error);
        self
    }

    /// Detach behind the engine's back, like a server-side disconnect
    pub fn drop_mount(&self, mount_point: impl AsRef<Path>) {
        lock(&self.mounted).remove(&key(mount_point.as_ref()));
    }

    pub fn is_mounted(&self, mount_point: impl AsRef<Path>) -> bool {
        lock(&self.mounted).contains_key(&key(mount_point.as_ref()))
    }

    pub fn mount_calls(&self) -> usize {
        self.mount_calls.load(Ordering::SeqCst)
    }

    pub fn unmount_calls(&self) -> usize {
        self.unmount_calls.load(Ordering::SeqCst)
    }

    pub fn os_calls(&self) -> usize {
        self.mount_calls() + self.unmount_calls()
    }

    pub fn invocations(&self) -> Vec<MountInvocation> {
        lock(&self.invocations).clone()
    }

    pub fn unmounts(&self) -> Vec<(PathBuf, UnmountPolicy)> {
        lock(&self.unmounts).clone()
    }
}

#[async_trait]
impl MountStateInspector for FakeMountTable {
    async fn current_state(&self, mount_point: &Path) -> Result<MountState, StabbieError> {
        let mount_point = key(mount_point);
        if lock(&self.unreadable).contains(&mount_point) {
            return Err(StabbieError::new(
                StabbieErrorKind::Unavailable,
                "mount table unreadable",
            ));
        }
        Ok(MountState::from_present(
            lock(&self.mounted).contains_key(&mount_point),
        ))
    }
}

#[async_trait]
impl MountExecutor for FakeMountTable {
    async fn preflight(&self) -> Result<(), StabbieError> {
        match lock(&self.preflight_error).clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn mount(&self, invocation: &MountInvocation) -> ExecutionOutcome {
        self.mount_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.invocations).push(invocation.clone());
        tokio::task::yield_now().await;

        let target = key(&invocation.target);
        if let Some(reason) = lock(&self.mount_failures).get(&target) {
            return ExecutionOutcome::failed(reason.clone());
        }
        *lock(&self.mounted).entry(target).or_insert(0) += 1;
        ExecutionOutcome::Success
    }

    async fn unmount(&self, target: &Path, policy: UnmountPolicy) -> ExecutionOutcome {
        self.unmount_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.unmounts).push((target.to_path_buf(), policy));
        tokio::task::yield_now().await;

        let target = key(target);
        if lock(&self.busy).contains(&target) && !policy.force && !policy.lazy {
            return ExecutionOutcome::failed("busy");
        }

        let mut mounted = lock(&self.mounted);
        match mounted.get_mut(&target) {
            Some(layers) if *layers > 1 => *layers -= 1,
            Some(_) => {
                mounted.remove(&target);
            }
            None => {}
        }
        ExecutionOutcome::Success
    }
}

fn key(mount_point: &Path) -> PathBuf {
    normalize_mount_point(mount_point)
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
