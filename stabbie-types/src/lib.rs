// SPDX-License-Identifier: GPL-3.0-only

//! Canonical domain models for stabbie
//!
//! Every type that crosses a crate boundary lives here:
//!
//! - **stabbie-core**: parses table lines into [`Entry`] values and produces a [`RunReport`]
//! - **stabbie-sys**: consumes [`ProbeTarget`] and [`MountInvocation`] to talk to the OS
//! - **stabbie** (binary): builds a [`RunConfig`] and renders the report
//!
//! Nothing here survives a run. Reachability and mount state are derived
//! fresh on every pass and are never cached.

pub mod config;
pub mod entry;
pub mod options;
pub mod report;
pub mod status;

pub use config::{
    DEFAULT_COMMAND_TIMEOUT, DEFAULT_MARKER, DEFAULT_MAX_CONCURRENCY, DEFAULT_PROBE_TIMEOUT,
    DEFAULT_TABLE_PATH, RunConfig, UnmountPolicy,
};
pub use entry::{
    DeviceSpec, Entry, MountInvocation, ProbeTarget, RemoteDevice, normalize_mount_point,
    unescape_mount_field,
};
pub use options::{MountOption, MountOptions};
pub use report::{ConfigurationError, EntryReport, ParseWarning, RunReport};
pub use status::{Decision, ExecutionOutcome, MountState, ReachabilityStatus};
