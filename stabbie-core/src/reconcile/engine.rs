// SPDX-License-Identifier: GPL-3.0-only

//! One reconciliation pass
//!
//! Every eligible entry runs in its own task, bounded by a semaphore. Probe
//! and inspection run side by side, then the decision is executed while
//! holding the lock of the entry's mount point. Reports are written back
//! into a slot per entry so the run report keeps table order.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use stabbie_contracts::{MountExecutor, MountStateInspector, ReachabilityProbe};
use stabbie_types::{
    Decision, EntryReport, ExecutionOutcome, MountState, ReachabilityStatus, RunConfig, RunReport,
    UnmountPolicy,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{Duration, Instant, timeout_at};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::decision::decide;
use super::locks::MountPointLocks;
use crate::error::EngineError;
use crate::fstab::{EligibleEntry, EntryParser, StrategyRegistry};

#[derive(Clone)]
pub struct ReconciliationEngine {
    probe: Arc<dyn ReachabilityProbe>,
    inspector: Arc<dyn MountStateInspector>,
    executor: Arc<dyn MountExecutor>,
    registry: Arc<StrategyRegistry>,
}

/// Per-pass settings copied into every entry task
#[derive(Debug, Clone)]
struct EntrySettings {
    probe_timeout: Duration,
    deadline: Option<Instant>,
    dry_run: bool,
    unmount: UnmountPolicy,
}

impl ReconciliationEngine {
    pub fn new(
        probe: Arc<dyn ReachabilityProbe>,
        inspector: Arc<dyn MountStateInspector>,
        executor: Arc<dyn MountExecutor>,
        registry: StrategyRegistry,
    ) -> Self {
        Self {
            probe,
            inspector,
            executor,
            registry: Arc::new(registry),
        }
    }

    /// Read the configured table and reconcile it.
    pub async fn run(&self, config: &RunConfig) -> Result<RunReport, EngineError> {
        let text = tokio::fs::read_to_string(&config.table_path)
            .await
            .map_err(|source| EngineError::TableRead {
                path: config.table_path.clone(),
                source,
            })?;
        self.reconcile_table(&text, config).await
    }

    /// Reconcile already loaded table text.
    ///
    /// Only a failed precondition aborts the pass. Everything else is
    /// recorded in the report.
    pub async fn reconcile_table(
        &self,
        text: &str,
        config: &RunConfig,
    ) -> Result<RunReport, EngineError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let started = Instant::now();

        let parser = EntryParser::new(&self.registry, &config.marker);
        let table = parser.parse(text);
        let eligible = parser.eligible(&table.entries);
        info!(
            "Run {}: {} eligible of {} entries ({} warnings, {} conflicts)",
            run_id,
            eligible.entries.len(),
            table.entries.len(),
            table.warnings.len(),
            eligible.conflicts.len()
        );

        if config.dry_run {
            info!("Dry run, no mount or unmount will be performed");
        } else if !eligible.is_empty() {
            self.executor
                .preflight()
                .await
                .map_err(EngineError::Precondition)?;
        }

        let settings = EntrySettings {
            probe_timeout: config.probe_timeout,
            deadline: config.deadline.map(|deadline| started + deadline),
            dry_run: config.dry_run,
            unmount: config.unmount,
        };
        let entries = self
            .fan_out(eligible.entries, settings, config.effective_concurrency())
            .await;

        let report = RunReport::new(
            run_id,
            started_at,
            config.dry_run,
            entries,
            table.warnings,
            eligible.conflicts,
        );
        info!(
            "Run {} finished in {} ms: {} mount, {} unmount, {} no-op, {} failed",
            run_id,
            started.elapsed().as_millis(),
            report.count(Decision::Mount),
            report.count(Decision::Unmount),
            report.count(Decision::NoOp),
            report.failures().count()
        );
        Ok(report)
    }

    async fn fan_out(
        &self,
        entries: Vec<EligibleEntry>,
        settings: EntrySettings,
        max_parallel: usize,
    ) -> Vec<EntryReport> {
        let semaphore = Arc::new(Semaphore::new(max_parallel));
        let locks = MountPointLocks::new();
        let mut set = JoinSet::new();
        let mut slots: Vec<Option<EntryReport>> = vec![None; entries.len()];
        let mut tasks = HashMap::new();
        let mut unfinished = Vec::with_capacity(entries.len());

        for (index, eligible) in entries.into_iter().enumerate() {
            unfinished.push(eligible.clone());
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    slots[index] = Some(failed_report(
                        &eligible,
                        format!("worker pool closed: {e}"),
                    ));
                    continue;
                }
            };

            let engine = self.clone();
            let locks = locks.clone();
            let settings = settings.clone();
            let handle = set.spawn(async move {
                let _permit = permit;
                engine.reconcile_entry(eligible, &settings, &locks).await
            });
            tasks.insert(handle.id(), index);
        }

        while let Some(joined) = set.join_next_with_id().await {
            match joined {
                Ok((id, report)) => {
                    if let Some(index) = tasks.get(&id) {
                        slots[*index] = Some(report);
                    }
                }
                Err(e) => {
                    error!("Entry worker task failed: {}", e);
                    if let Some(index) = tasks.get(&e.id()) {
                        slots[*index] = Some(failed_report(
                            &unfinished[*index],
                            format!("worker task failed: {e}"),
                        ));
                    }
                }
            }
        }

        slots
            .into_iter()
            .zip(unfinished)
            .map(|(slot, eligible)| {
                slot.unwrap_or_else(|| failed_report(&eligible, "worker task lost"))
            })
            .collect()
    }

    async fn reconcile_entry(
        &self,
        eligible: EligibleEntry,
        settings: &EntrySettings,
        locks: &MountPointLocks,
    ) -> EntryReport {
        let EligibleEntry {
            entry,
            target,
            invocation,
        } = eligible;

        let probe = async {
            let attempt = self.probe.probe(&target, settings.probe_timeout);
            match settings.deadline {
                Some(deadline) => timeout_at(deadline, attempt).await.unwrap_or_else(|_| {
                    debug!("Probe of {} cut off by the run deadline", target);
                    ReachabilityStatus::Unreachable
                }),
                None => attempt.await,
            }
        };
        let (reachability, state) =
            tokio::join!(probe, self.inspector.current_state(&entry.mount_point));
        info!("Service {}: {}", target, reachability);

        let state = match state {
            Ok(state) => state,
            Err(e) => {
                warn!(
                    "Cannot tell whether {} is mounted: {}",
                    entry.mount_point.display(),
                    e
                );
                return EntryReport {
                    entry,
                    target,
                    reachability: Some(reachability),
                    mount_state: None,
                    decision: Decision::NoOp,
                    outcome: ExecutionOutcome::failed(format!("mount state unavailable: {e}")),
                };
            }
        };

        let decision = decide(state, reachability);
        let outcome = match decision {
            Decision::NoOp => {
                info!(
                    "{} skipped, {} and {}",
                    entry.mount_point.display(),
                    state,
                    reachability
                );
                ExecutionOutcome::Skipped
            }
            _ if settings.dry_run => {
                info!(
                    "{} would {} (dry run)",
                    entry.mount_point.display(),
                    decision
                );
                ExecutionOutcome::Skipped
            }
            Decision::Mount => {
                let _guard = locks.acquire(&entry.mount_point).await;
                let outcome = self.executor.mount(&invocation).await;
                self.verify(&entry.mount_point, outcome, MountState::Mounted)
                    .await
            }
            Decision::Unmount => {
                let _guard = locks.acquire(&entry.mount_point).await;
                let outcome = self
                    .executor
                    .unmount(&entry.mount_point, settings.unmount)
                    .await;
                self.verify(&entry.mount_point, outcome, MountState::Unmounted)
                    .await
            }
        };

        match &outcome {
            ExecutionOutcome::Failed(reason) => warn!(
                "{} {} failed: {}",
                decision,
                entry.mount_point.display(),
                reason
            ),
            ExecutionOutcome::Success => {
                info!("{} {}: success", decision, entry.mount_point.display())
            }
            ExecutionOutcome::Skipped => {}
        }

        EntryReport {
            entry,
            target,
            reachability: Some(reachability),
            mount_state: Some(state),
            decision,
            outcome,
        }
    }

    /// Check that a successful action left the mount point in `expected`.
    ///
    /// A mount point that stays mounted after an unmount is a stacked mount
    /// the unmount only peeled one layer off.
    async fn verify(
        &self,
        mount_point: &Path,
        outcome: ExecutionOutcome,
        expected: MountState,
    ) -> ExecutionOutcome {
        if outcome != ExecutionOutcome::Success {
            return outcome;
        }

        match self.inspector.current_state(mount_point).await {
            Ok(state) if state == expected => outcome,
            Ok(MountState::Mounted) => ExecutionOutcome::failed("still mounted after unmount"),
            Ok(MountState::Unmounted) => ExecutionOutcome::failed("not mounted after mount"),
            Err(e) => {
                warn!(
                    "Could not verify {} after execution: {}",
                    mount_point.display(),
                    e
                );
                outcome
            }
        }
    }
}

fn failed_report(eligible: &EligibleEntry, reason: impl Into<String>) -> EntryReport {
    EntryReport {
        entry: eligible.entry.clone(),
        target: eligible.target.clone(),
        reachability: None,
        mount_state: None,
        decision: Decision::NoOp,
        outcome: ExecutionOutcome::failed(reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use stabbie_contracts::StabbieError;
    use stabbie_types::{MountInvocation, ProbeTarget};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticProbe(ReachabilityStatus);

    #[async_trait]
    impl ReachabilityProbe for StaticProbe {
        async fn probe(&self, _target: &ProbeTarget, _timeout: Duration) -> ReachabilityStatus {
            self.0
        }
    }

    struct StuckProbe;

    #[async_trait]
    impl ReachabilityProbe for StuckProbe {
        async fn probe(&self, _target: &ProbeTarget, timeout: Duration) -> ReachabilityStatus {
            tokio::time::sleep(timeout).await;
            ReachabilityStatus::Reachable
        }
    }

    /// Mount table that only changes through its own executor
    #[derive(Default)]
    struct Table {
        mounted: Mutex<Vec<std::path::PathBuf>>,
        calls: AtomicUsize,
        sticky: bool,
        refuse_preflight: bool,
    }

    #[async_trait]
    impl MountStateInspector for Table {
        async fn current_state(&self, mount_point: &Path) -> Result<MountState, StabbieError> {
            let mounted = self.mounted.lock().expect("table lock");
            Ok(MountState::from_present(
                mounted.iter().any(|p| p == mount_point),
            ))
        }
    }

    #[async_trait]
    impl MountExecutor for Table {
        async fn preflight(&self) -> Result<(), StabbieError> {
            if self.refuse_preflight {
                return Err(StabbieError::permission_denied("not root"));
            }
            Ok(())
        }

        async fn mount(&self, invocation: &MountInvocation) -> ExecutionOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.mounted
                .lock()
                .expect("table lock")
                .push(invocation.target.clone());
            ExecutionOutcome::Success
        }

        async fn unmount(&self, target: &Path, _policy: UnmountPolicy) -> ExecutionOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.sticky {
                self.mounted
                    .lock()
                    .expect("table lock")
                    .retain(|p| p != target);
            }
            ExecutionOutcome::Success
        }
    }

    const ONE_ENTRY: &str = "10.0.0.5:/export /mnt/a nfs x-stabbie,noauto 0 0\n";

    fn engine(probe: Arc<dyn ReachabilityProbe>, table: Arc<Table>) -> ReconciliationEngine {
        ReconciliationEngine::new(
            probe,
            table.clone(),
            table,
            StrategyRegistry::with_defaults(),
        )
    }

    #[tokio::test]
    async fn reachable_unmounted_entry_is_mounted_once() {
        let table = Arc::new(Table::default());
        let engine = engine(
            Arc::new(StaticProbe(ReachabilityStatus::Reachable)),
            table.clone(),
        );

        let report = engine
            .reconcile_table(ONE_ENTRY, &RunConfig::default())
            .await
            .expect("run");
        assert!(report.success);
        assert_eq!(report.entries[0].decision, Decision::Mount);
        assert_eq!(report.entries[0].outcome, ExecutionOutcome::Success);
        assert_eq!(table.calls.load(Ordering::SeqCst), 1);

        let again = engine
            .reconcile_table(ONE_ENTRY, &RunConfig::default())
            .await
            .expect("second run");
        assert_eq!(again.entries[0].decision, Decision::NoOp);
        assert_eq!(table.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stacked_mount_surviving_unmount_fails() {
        let table = Arc::new(Table {
            mounted: Mutex::new(vec!["/mnt/a".into()]),
            sticky: true,
            ..Table::default()
        });
        let engine = engine(
            Arc::new(StaticProbe(ReachabilityStatus::Unreachable)),
            table.clone(),
        );

        let report = engine
            .reconcile_table(ONE_ENTRY, &RunConfig::default())
            .await
            .expect("run");
        assert_eq!(report.entries[0].decision, Decision::Unmount);
        assert_eq!(
            report.entries[0].outcome,
            ExecutionOutcome::failed("still mounted after unmount")
        );
        assert!(report.has_failures());
    }

    #[tokio::test]
    async fn failed_preflight_aborts_before_any_entry() {
        let table = Arc::new(Table {
            refuse_preflight: true,
            ..Table::default()
        });
        let engine = engine(
            Arc::new(StaticProbe(ReachabilityStatus::Reachable)),
            table.clone(),
        );

        let result = engine
            .reconcile_table(ONE_ENTRY, &RunConfig::default())
            .await;
        assert!(matches!(result, Err(EngineError::Precondition(_))));
        assert_eq!(table.calls.load(Ordering::SeqCst), 0);

        let dry_run = RunConfig {
            dry_run: true,
            ..RunConfig::default()
        };
        let report = engine
            .reconcile_table(ONE_ENTRY, &dry_run)
            .await
            .expect("dry run skips preflight");
        assert_eq!(report.entries[0].decision, Decision::Mount);
        assert_eq!(report.entries[0].outcome, ExecutionOutcome::Skipped);
        assert_eq!(table.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn deadline_turns_pending_probes_unreachable() {
        let table = Arc::new(Table::default());
        let engine = engine(Arc::new(StuckProbe), table.clone());
        let config = RunConfig {
            probe_timeout: Duration::from_secs(60),
            deadline: Some(Duration::from_millis(100)),
            ..RunConfig::default()
        };

        let report = engine
            .reconcile_table(ONE_ENTRY, &config)
            .await
            .expect("run");
        assert_eq!(
            report.entries[0].reachability,
            Some(ReachabilityStatus::Unreachable)
        );
        assert_eq!(report.entries[0].decision, Decision::NoOp);
        assert_eq!(table.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_table_is_fatal() {
        let table = Arc::new(Table::default());
        let engine = engine(
            Arc::new(StaticProbe(ReachabilityStatus::Reachable)),
            table,
        );
        let config = RunConfig {
            table_path: "/nonexistent/stabbie/fstab".into(),
            ..RunConfig::default()
        };

        let result = engine.run(&config).await;
        assert!(matches!(result, Err(EngineError::TableRead { .. })));
    }
}
