// SPDX-License-Identifier: GPL-3.0-only

//! Low-level system operations for stabbie
//!
//! This crate is the only place that touches the operating system:
//! - TCP and ICMP reachability probes
//! - Reading the kernel's table of active mounts
//! - Running `mount(8)` and `umount(8)`
//! - Privilege checks
//!
//! Mounting and unmounting require root. Probing and inspection do not.

pub mod cmd;
pub mod error;
pub mod executor;
pub mod mounts;
pub mod privileges;
pub mod probe;

pub use error::{Result, SysError};
pub use executor::CommandMountExecutor;
pub use mounts::{MountInfoInspector, parse_mountinfo};
pub use probe::TcpProbe;
