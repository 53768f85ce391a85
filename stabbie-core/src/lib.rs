// SPDX-License-Identifier: GPL-3.0-only

//! Reconciliation core for stabbie
//!
//! - [`fstab`]: turns mount table text into typed entries and picks the
//!   eligible ones, with per-filesystem-type strategies
//! - [`reconcile`]: probes, inspects, decides and acts on every eligible
//!   entry, then reports
//!
//! The OS is only reached through the traits in `stabbie-contracts`.

pub mod error;
pub mod fstab;
pub mod reconcile;

pub use error::EngineError;
pub use fstab::{
    DeviceSpecError, EligibleEntry, EligibleSet, EntryParser, FsStrategy, ParsedTable,
    StrategyRegistry,
};
pub use reconcile::{MountPointLocks, ReconciliationEngine, decide};
