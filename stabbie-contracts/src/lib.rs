// SPDX-License-Identifier: GPL-3.0-only

pub mod protocol;
pub mod traits;

pub use protocol::{StabbieError, StabbieErrorKind};
pub use traits::{MountExecutor, MountStateInspector, ReachabilityProbe};
