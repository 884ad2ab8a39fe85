// SPDX-License-Identifier: MIT

//! The canonical component tree store (spec §4.3): an arena keyed by node
//! id, a name index, and label assignment for client-facing `@cN` refs.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod tree;

pub use tree::{AddedSummary, ComponentTree, TreeEntry};
