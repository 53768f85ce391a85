// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;

use stabbie_contracts::StabbieError;
use thiserror::Error;

/// Errors that abort a whole pass
///
/// Everything that concerns a single entry ends up in that entry's
/// outcome instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to read mount table {}: {source}", .path.display())]
    TableRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("precondition failed: {0}")]
    Precondition(StabbieError),
}
