// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("failed to bind {what}: {source}")]
    BindFailure { what: String, #[source] source: std::io::Error },
    #[error("another daemon is already running (pid {0})")]
    AlreadyRunning(u32),
}
