// SPDX-License-Identifier: GPL-3.0-only

use stabbie_types::{Decision, MountState, ReachabilityStatus};

/// What to do with an entry given what was observed.
///
/// Only the two mismatched combinations lead to an action, so a pass over a
/// table already in the wanted state never touches the OS.
pub fn decide(state: MountState, reachability: ReachabilityStatus) -> Decision {
    match (state, reachability) {
        (MountState::Unmounted, ReachabilityStatus::Reachable) => Decision::Mount,
        (MountState::Mounted, ReachabilityStatus::Unreachable) => Decision::Unmount,
        (MountState::Unmounted, ReachabilityStatus::Unreachable)
        | (MountState::Mounted, ReachabilityStatus::Reachable) => Decision::NoOp,
    }
}
