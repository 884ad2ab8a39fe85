// SPDX-License-Identifier: MIT

//! Daemon orchestrator library half: state directory lifecycle, IPC
//! protocol, wait registry, and the single-writer orchestrator loop
//! (spec §4.7, §4.8, §5). `main.rs` wires these into the `rdtd` binary.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod env;
mod error;
mod ipc;
mod orchestrator;
mod protocol;
mod state_file;
mod wait;

pub use error::DaemonError;
pub use ipc::{serve_ipc, IpcInbound};
pub use orchestrator::{Internal, Orchestrator};
pub use protocol::{ComponentRef, Request, Response};
pub use state_file::{cleanup, recover_stale_state, DaemonInfo, StateDir};
pub use wait::{WaitCondition, WaitOutcome, WaitRegistry};
