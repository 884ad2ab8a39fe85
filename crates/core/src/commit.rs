// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use crate::node::NodeId;

/// One atomic batch of renders reported by the runtime, with per-component
/// timings (see `rdt-profiler`'s commit buffer).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Commit {
    pub timestamp: f64,
    pub duration: f64,
    pub actual_durations: HashMap<NodeId, f64>,
    pub self_durations: HashMap<NodeId, f64>,
    pub change_descriptions: HashMap<NodeId, ChangeDescription>,
}

/// Why a component re-rendered in a given commit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChangeDescription {
    pub did_hooks_change: bool,
    pub is_first_mount: bool,
    pub props: Option<Vec<String>>,
    pub state: Option<Vec<String>>,
    pub hooks: Option<Vec<usize>>,
}

/// A derived cause of re-render, as produced by `rdt-profiler`'s cause
/// derivation (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cause {
    FirstMount,
    PropsChanged,
    StateChanged,
    HooksChanged,
    ParentRendered,
    /// Reserved: the wire format never reports this cause distinctly.
    ForceUpdate,
}

impl Cause {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cause::FirstMount => "FirstMount",
            Cause::PropsChanged => "PropsChanged",
            Cause::StateChanged => "StateChanged",
            Cause::HooksChanged => "HooksChanged",
            Cause::ParentRendered => "ParentRendered",
            Cause::ForceUpdate => "ForceUpdate",
        }
    }
}

impl ChangeDescription {
    /// Derive the ordered set of causes per spec §4.5:
    /// first mount wins outright; otherwise props/state/hooks causes are
    /// included independently, falling back to `ParentRendered` only when
    /// none of the three apply.
    pub fn causes(&self) -> Vec<Cause> {
        if self.is_first_mount {
            return vec![Cause::FirstMount];
        }

        let mut causes = Vec::new();
        if self.props.as_ref().is_some_and(|p| !p.is_empty()) {
            causes.push(Cause::PropsChanged);
        }
        if self.state.as_ref().is_some_and(|s| !s.is_empty()) {
            causes.push(Cause::StateChanged);
        }
        if self.did_hooks_change {
            causes.push(Cause::HooksChanged);
        }
        if causes.is_empty() {
            causes.push(Cause::ParentRendered);
        }
        causes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_mount_never_co_occurs_with_other_causes() {
        let cd = ChangeDescription {
            is_first_mount: true,
            props: Some(vec!["x".into()]),
            ..Default::default()
        };
        assert_eq!(cd.causes(), vec![Cause::FirstMount]);
    }

    #[test]
    fn parent_rendered_is_fallback_only() {
        let cd = ChangeDescription::default();
        assert_eq!(cd.causes(), vec![Cause::ParentRendered]);
    }

    #[test]
    fn props_state_hooks_all_combine() {
        let cd = ChangeDescription {
            props: Some(vec!["a".into()]),
            state: Some(vec!["b".into()]),
            did_hooks_change: true,
            ..Default::default()
        };
        assert_eq!(
            cd.causes(),
            vec![Cause::PropsChanged, Cause::StateChanged, Cause::HooksChanged]
        );
    }
}
