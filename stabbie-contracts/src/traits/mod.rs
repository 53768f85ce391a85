// SPDX-License-Identifier: GPL-3.0-only

pub mod executor;
pub mod inspector;
pub mod probe;

pub use executor::MountExecutor;
pub use inspector::MountStateInspector;
pub use probe::ReachabilityProbe;
