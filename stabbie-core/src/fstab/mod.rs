// SPDX-License-Identifier: GPL-3.0-only

pub mod parser;
pub mod strategy;

pub use parser::{EligibleEntry, EligibleSet, EntryParser, ParsedTable};
pub use strategy::{DeviceSpecError, FsStrategy, StrategyRegistry};
