// SPDX-License-Identifier: MIT

//! Binary wire decoders for the DevTools "Wall" operations stream:
//! the per-batch string table (spec §4.1) and the opcode stream that
//! mutates the component tree (spec §4.2).

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod error;
mod ops;
mod string_table;

pub use error::DecodeError;
pub use ops::{Batch, Op, OperationsDecoder};
pub use string_table::StringTable;
