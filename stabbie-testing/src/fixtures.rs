// SPDX-License-Identifier: GPL-3.0-only

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use stabbie_core::{ReconciliationEngine, StrategyRegistry};
use stabbie_types::RunConfig;
use tempfile::NamedTempFile;

use crate::fakes::{FakeMountTable, FakeProbe};

pub fn engine(probe: &Arc<FakeProbe>, table: &Arc<FakeMountTable>) -> ReconciliationEngine {
    ReconciliationEngine::new(
        probe.clone(),
        table.clone(),
        table.clone(),
        StrategyRegistry::with_defaults(),
    )
}

/// Defaults with a short probe timeout
pub fn config() -> RunConfig {
    RunConfig {
        probe_timeout: Duration::from_millis(200),
        ..RunConfig::default()
    }
}

/// An NFS line carrying the default marker
pub fn nfs_line(host: &str, export: &str, mount_point: &str) -> String {
    format!("{host}:{export} {mount_point} nfs x-stabbie,noauto 0 0")
}

pub fn table(lines: &[String]) -> String {
    let mut text = String::from("# managed by stabbie tests\n");
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    text
}

/// Write table text to a temporary file kept alive by the returned handle
pub fn table_file(text: &str) -> std::io::Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(text.as_bytes())?;
    file.flush()?;
    Ok(file)
}
