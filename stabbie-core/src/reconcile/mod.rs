// SPDX-License-Identifier: GPL-3.0-only

pub mod decision;
pub mod engine;
pub mod locks;

pub use decision::decide;
pub use engine::ReconciliationEngine;
pub use locks::MountPointLocks;
