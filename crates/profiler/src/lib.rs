// SPDX-License-Identifier: MIT

//! Per-commit render aggregation and reporting (spec §4.5).

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod error;
mod payload;
mod profiler;

pub use error::ProfilerError;
pub use profiler::{
    CommitComponentDetail, CommitDetails, Profiler, ProfileSummary, ProfilingSession, Report, TimelineEntry,
};
