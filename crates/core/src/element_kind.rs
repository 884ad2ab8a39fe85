// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

/// The kind of a React component tree node.
///
/// Wire encoding (see `rdt-wire`'s ADD decoding): `Class = 1`, `Context = 2`
/// (mapped to `Other` — contexts are not otherwise tagged), `Function = 5`,
/// `ForwardRef = 6`, `Host = 7`, `Memo = 8`, `Other = 9`, `Profiler = 10`,
/// `Root = 11`, `Suspense = 12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Class,
    Function,
    Host,
    Memo,
    ForwardRef,
    Profiler,
    Suspense,
    Context,
    Root,
    Other,
}

impl ElementKind {
    /// Decode the wire integer code used by ADD operations.
    ///
    /// Unrecognized codes (including `Context`'s raw code 2, which the wire
    /// format never tags distinctly) map to `Other`.
    pub fn from_wire(code: i64) -> Self {
        match code {
            1 => ElementKind::Class,
            5 => ElementKind::Function,
            6 => ElementKind::ForwardRef,
            7 => ElementKind::Host,
            8 => ElementKind::Memo,
            10 => ElementKind::Profiler,
            11 => ElementKind::Root,
            12 => ElementKind::Suspense,
            _ => ElementKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Class => "Class",
            ElementKind::Function => "Function",
            ElementKind::Host => "Host",
            ElementKind::Memo => "Memo",
            ElementKind::ForwardRef => "ForwardRef",
            ElementKind::Profiler => "Profiler",
            ElementKind::Suspense => "Suspense",
            ElementKind::Context => "Context",
            ElementKind::Root => "Root",
            ElementKind::Other => "Other",
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[test]
    fn unknown_and_context_codes_map_to_other() {
        assert_eq!(ElementKind::from_wire(2), ElementKind::Other);
        assert_eq!(ElementKind::from_wire(99), ElementKind::Other);
    }

    #[parameterized(
        class = {1, ElementKind::Class},
        function = {5, ElementKind::Function},
        forward_ref = {6, ElementKind::ForwardRef},
        host = {7, ElementKind::Host},
        memo = {8, ElementKind::Memo},
        profiler = {10, ElementKind::Profiler},
        root = {11, ElementKind::Root},
        suspense = {12, ElementKind::Suspense},
    )]
    fn known_codes_round_trip(code: i64, expected: ElementKind) {
        assert_eq!(ElementKind::from_wire(code), expected);
    }
}
