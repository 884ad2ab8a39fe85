// SPDX-License-Identifier: MIT

//! Per-commit aggregation, cause derivation, and reporting (spec §4.5).

use std::cmp::Ordering;
use std::collections::HashMap;

use rdt_core::{Cause, Commit, NodeId};
use rdt_tree::ComponentTree;
use serde_json::Value;

use crate::error::ProfilerError;
use crate::payload::{parse_commit, raw_commits};

/// One completed or in-flight profiling run.
#[derive(Debug, Clone)]
pub struct ProfilingSession {
    pub name: String,
    pub started_at_ms: u64,
    pub stopped_at_ms: Option<u64>,
    pub commits: Vec<Commit>,
    /// Snapshotted at `start()` so components can still be named after they unmount.
    pub cached_display_names: HashMap<NodeId, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSummary {
    pub name: String,
    pub duration_ms: u64,
    pub commit_count: usize,
    /// `(id, display_name, render_count)`, sorted desc by count.
    pub per_component_render_counts: Vec<(NodeId, String, usize)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub id: NodeId,
    pub display_name: String,
    pub render_count: usize,
    pub total_duration: f64,
    pub avg_duration: f64,
    pub max_duration: f64,
    pub causes: Vec<Cause>,
    pub changed_keys: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineEntry {
    pub index: usize,
    pub timestamp: f64,
    pub duration: f64,
    pub component_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommitComponentDetail {
    pub id: NodeId,
    pub display_name: String,
    pub actual_duration: f64,
    pub self_duration: f64,
    pub causes: Vec<Cause>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommitDetails {
    pub index: usize,
    pub total_components: usize,
    pub rows: Vec<CommitComponentDetail>,
}

/// At most one active session at a time (spec §3 invariant).
#[derive(Debug, Clone, Default)]
pub struct Profiler {
    session: Option<ProfilingSession>,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.stopped_at_ms.is_none())
    }

    /// Clears cached names and replaces any prior session with a new one.
    pub fn start(&mut self, name: Option<String>, now_ms: u64, tree: &ComponentTree) {
        let cached_display_names = tree
            .all_node_ids()
            .into_iter()
            .filter_map(|id| tree.get_node(id).map(|node| (id, node.display_name.clone())))
            .collect();
        self.session = Some(ProfilingSession {
            name: name.unwrap_or_else(|| "session".to_string()),
            started_at_ms: now_ms,
            stopped_at_ms: None,
            commits: Vec::new(),
            cached_display_names,
        });
    }

    pub fn stop(&mut self, now_ms: u64, tree: &ComponentTree) -> Result<ProfileSummary, ProfilerError> {
        let session = self.session.as_mut().ok_or(ProfilerError::NotReady)?;
        session.stopped_at_ms = Some(now_ms);

        let mut counts: HashMap<NodeId, usize> = HashMap::new();
        for commit in &session.commits {
            for id in commit.actual_durations.keys() {
                *counts.entry(*id).or_insert(0) += 1;
            }
        }
        let mut per_component: Vec<(NodeId, String, usize)> = counts
            .into_iter()
            .map(|(id, count)| (id, self.resolve_name(id, tree), count))
            .collect();
        per_component.sort_by(|a, b| b.2.cmp(&a.2));

        let session = self.session.as_ref().expect("checked above");
        Ok(ProfileSummary {
            name: session.name.clone(),
            duration_ms: now_ms.saturating_sub(session.started_at_ms),
            commit_count: session.commits.len(),
            per_component_render_counts: per_component,
        })
    }

    /// Forwarded from the bridge; a no-op if no session is active.
    pub fn process_profiling_payload(&mut self, payload: &Value) {
        let Some(session) = self.session.as_mut() else { return };
        session.commits.extend(raw_commits(payload).iter().map(|v| parse_commit(v)));
    }

    pub fn get_report(&self, id: NodeId, tree: &ComponentTree) -> Result<Report, ProfilerError> {
        let session = self.session.as_ref().ok_or(ProfilerError::NotReady)?;

        let mut render_count = 0usize;
        let mut total_duration = 0.0;
        let mut max_duration = 0.0;
        let mut causes: Vec<Cause> = Vec::new();
        let mut changed_keys: Vec<String> = Vec::new();

        for commit in &session.commits {
            let Some(&duration) = commit.actual_durations.get(&id) else { continue };
            render_count += 1;
            total_duration += duration;
            if duration > max_duration {
                max_duration = duration;
            }
            if let Some(change) = commit.change_descriptions.get(&id) {
                for cause in change.causes() {
                    if !causes.contains(&cause) {
                        causes.push(cause);
                    }
                }
                for key in change.props.iter().flatten().chain(change.state.iter().flatten()) {
                    if !changed_keys.contains(key) {
                        changed_keys.push(key.clone());
                    }
                }
                for hook in change.hooks.iter().flatten() {
                    let key = hook.to_string();
                    if !changed_keys.contains(&key) {
                        changed_keys.push(key);
                    }
                }
            }
        }

        if render_count == 0 {
            return Err(ProfilerError::NotReady);
        }

        Ok(Report {
            id,
            display_name: self.resolve_name(id, tree),
            render_count,
            total_duration,
            avg_duration: total_duration / render_count as f64,
            max_duration,
            causes,
            changed_keys,
        })
    }

    pub fn get_slowest(&self, tree: &ComponentTree, limit: usize) -> Vec<Report> {
        self.ranked_reports(tree, limit, |r| r.avg_duration)
    }

    pub fn get_most_rerenders(&self, tree: &ComponentTree, limit: usize) -> Vec<Report> {
        self.ranked_reports(tree, limit, |r| r.render_count as f64)
    }

    fn ranked_reports(&self, tree: &ComponentTree, limit: usize, key: impl Fn(&Report) -> f64) -> Vec<Report> {
        let Some(session) = &self.session else { return Vec::new() };
        let mut ids: Vec<NodeId> = Vec::new();
        for commit in &session.commits {
            for id in commit.actual_durations.keys() {
                if !ids.contains(id) {
                    ids.push(*id);
                }
            }
        }
        let mut reports: Vec<Report> = ids.into_iter().filter_map(|id| self.get_report(id, tree).ok()).collect();
        reports.sort_by(|a, b| key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal));
        reports.truncate(limit);
        reports
    }

    pub fn get_timeline(&self, limit: Option<usize>) -> Vec<TimelineEntry> {
        let Some(session) = &self.session else { return Vec::new() };
        let mut entries: Vec<TimelineEntry> = session
            .commits
            .iter()
            .enumerate()
            .map(|(index, commit)| TimelineEntry {
                index,
                timestamp: commit.timestamp,
                duration: commit.duration,
                component_count: commit.actual_durations.len(),
            })
            .collect();
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        entries
    }

    pub fn get_commit_details(
        &self,
        index: usize,
        tree: &ComponentTree,
        limit: usize,
    ) -> Result<CommitDetails, ProfilerError> {
        let session = self.session.as_ref().ok_or(ProfilerError::NotReady)?;
        let commit = session.commits.get(index).ok_or(ProfilerError::NotFound)?;

        let mut rows: Vec<CommitComponentDetail> = commit
            .actual_durations
            .iter()
            .map(|(id, &actual_duration)| CommitComponentDetail {
                id: *id,
                display_name: self.resolve_name(*id, tree),
                actual_duration,
                self_duration: commit.self_durations.get(id).copied().unwrap_or(0.0),
                causes: commit.change_descriptions.get(id).map(|cd| cd.causes()).unwrap_or_default(),
            })
            .collect();
        let total_components = rows.len();
        rows.sort_by(|a, b| b.self_duration.partial_cmp(&a.self_duration).unwrap_or(Ordering::Equal));
        rows.truncate(limit);

        Ok(CommitDetails { index, total_components, rows })
    }

    fn resolve_name(&self, id: NodeId, tree: &ComponentTree) -> String {
        tree.get_node(id)
            .map(|node| node.display_name.clone())
            .or_else(|| self.session.as_ref().and_then(|s| s.cached_display_names.get(&id).cloned()))
            .unwrap_or_else(|| format!("Component#{id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn e6_profiling_aggregation() {
        let mut profiler = Profiler::new();
        let tree = ComponentTree::new();
        profiler.start(None, 0, &tree);

        let payload = json!({
            "commitData": [{
                "timestamp": 1.0,
                "duration": 15.0,
                "fiberActualDurations": [[1, 10], [2, 5]],
                "fiberSelfDurations": [[1, 4], [2, 5]],
                "changeDescriptions": [[1, {"props": ["x"]}], [2, {"isFirstMount": true}]],
            }]
        });
        profiler.process_profiling_payload(&payload);

        let report1 = profiler.get_report(1, &tree).unwrap();
        assert_eq!(report1.render_count, 1);
        assert_eq!(report1.total_duration, 10.0);
        assert_eq!(report1.avg_duration, 10.0);
        assert_eq!(report1.max_duration, 10.0);
        assert_eq!(report1.causes, vec![Cause::PropsChanged]);
        assert_eq!(report1.changed_keys, vec!["x".to_string()]);

        let report2 = profiler.get_report(2, &tree).unwrap();
        assert_eq!(report2.causes, vec![Cause::FirstMount]);

        let slowest = profiler.get_slowest(&tree, 1);
        assert_eq!(slowest[0].id, 1);
    }

    #[test]
    fn report_for_component_with_no_commits_is_not_ready() {
        let mut profiler = Profiler::new();
        let tree = ComponentTree::new();
        profiler.start(None, 0, &tree);
        assert_eq!(profiler.get_report(42, &tree), Err(ProfilerError::NotReady));
    }

    #[test]
    fn stop_without_a_session_is_not_ready() {
        let mut profiler = Profiler::new();
        let tree = ComponentTree::new();
        assert_eq!(profiler.stop(0, &tree).unwrap_err(), ProfilerError::NotReady);
    }

    #[test]
    fn commit_details_out_of_range_is_not_found() {
        let mut profiler = Profiler::new();
        let tree = ComponentTree::new();
        profiler.start(None, 0, &tree);
        assert_eq!(profiler.get_commit_details(0, &tree, 10).unwrap_err(), ProfilerError::NotFound);
    }

    #[test]
    fn name_falls_back_to_cached_then_placeholder() {
        let mut profiler = Profiler::new();
        let tree = ComponentTree::new();
        profiler.start(None, 0, &tree);
        assert_eq!(profiler.resolve_name(7, &tree), "Component#7".to_string());
    }

    proptest::proptest! {
        /// Whatever durations a single commit reports, `get_slowest` always
        /// comes back sorted by descending average duration.
        #[test]
        fn slowest_is_always_sorted_descending(durations in proptest::collection::vec(0.0f64..1000.0, 1..20)) {
            let mut profiler = Profiler::new();
            let tree = ComponentTree::new();
            profiler.start(None, 0, &tree);

            let duration_map: Vec<Value> = durations
                .iter()
                .enumerate()
                .map(|(i, d)| json!([i as u64 + 1, d]))
                .collect();
            profiler.process_profiling_payload(&json!({
                "commitData": [{"timestamp": 0.0, "duration": 0.0, "fiberActualDurations": duration_map}]
            }));

            let slowest = profiler.get_slowest(&tree, durations.len());
            for pair in slowest.windows(2) {
                proptest::prop_assert!(pair[0].avg_duration >= pair[1].avg_duration);
            }
        }
    }
}
