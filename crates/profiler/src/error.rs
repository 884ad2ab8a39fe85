// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProfilerError {
    #[error("no active profiling session, or component never rendered in-session")]
    NotReady,
    #[error("commit index out of range")]
    NotFound,
}
