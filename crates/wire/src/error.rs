// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Decode-time failures for the string table / operations decoder.
///
/// Never fatal to the connection: the bridge drops the offending batch and
/// keeps the connection open (spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("string table declared size overruns the batch buffer")]
    TableOverrun,
    #[error("operation payload was truncated")]
    TruncatedOperation,
}
