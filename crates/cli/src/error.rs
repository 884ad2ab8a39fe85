// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon is not running (no socket at {0})")]
    NotRunning(std::path::PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed response from daemon: {0}")]
    Transport(#[from] serde_json::Error),
}
