// SPDX-License-Identifier: GPL-3.0-only

//! Test support for the reconciliation engine
//!
//! [`FakeProbe`] and [`FakeMountTable`] stand in for the network and the
//! kernel so that whole passes can run without root or a server.

pub mod fakes;
pub mod fixtures;

pub use fakes::{FakeMountTable, FakeProbe};
