// SPDX-License-Identifier: MIT

//! Wait Registry (spec §4.7): deferred `wait` command resolution.
//!
//! The orchestrator is a single cooperative task (spec §5), so a `wait`
//! command cannot simply `.await` a condition without blocking every other
//! client and peer. Instead it registers a waiter here and keeps running;
//! the orchestrator calls `signal` after every event that could make a
//! condition true, and `expire` once per tick against the nearest deadline.

use std::time::Instant;

use rdt_bridge::ConnectionHealthTracker;
use rdt_tree::ComponentTree;
use tokio::sync::oneshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    AppConnected,
    NamedComponentPresent(String),
}

impl WaitCondition {
    pub fn parse(condition: &str, name: Option<&str>) -> Option<Self> {
        match condition {
            "connected" => Some(WaitCondition::AppConnected),
            "component" => name.map(|n| WaitCondition::NamedComponentPresent(n.to_string())),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WaitCondition::AppConnected => "connected",
            WaitCondition::NamedComponentPresent(_) => "component",
        }
    }

    fn is_met(&self, tree: &ComponentTree, health: &ConnectionHealthTracker) -> bool {
        match self {
            WaitCondition::AppConnected => health.live_connections() > 0,
            WaitCondition::NamedComponentPresent(name) => {
                tree.find_by_name(name, true).iter().any(|e| &e.display_name == name)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOutcome {
    pub met: bool,
    pub timeout: bool,
}

struct Waiter {
    condition: WaitCondition,
    deadline: Instant,
    respond: oneshot::Sender<WaitOutcome>,
}

#[derive(Default)]
pub struct WaitRegistry {
    waiters: Vec<Waiter>,
}

impl WaitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a waiter, resolving it immediately (and returning `true`)
    /// if the condition is already met.
    pub fn register(
        &mut self,
        condition: WaitCondition,
        deadline: Instant,
        respond: oneshot::Sender<WaitOutcome>,
        tree: &ComponentTree,
        health: &ConnectionHealthTracker,
    ) -> bool {
        if condition.is_met(tree, health) {
            let _ = respond.send(WaitOutcome { met: true, timeout: false });
            return true;
        }
        self.waiters.push(Waiter { condition, deadline, respond });
        false
    }

    /// Resolves every waiter whose condition now holds (spec §4.7: signalled
    /// after connection open/close and each `AddedSummary`).
    pub fn signal(&mut self, tree: &ComponentTree, health: &ConnectionHealthTracker) {
        let mut i = 0;
        while i < self.waiters.len() {
            if self.waiters[i].condition.is_met(tree, health) {
                let waiter = self.waiters.remove(i);
                let _ = waiter.respond.send(WaitOutcome { met: true, timeout: false });
            } else {
                i += 1;
            }
        }
    }

    /// Resolves every waiter whose deadline has passed with `met=false`.
    pub fn expire(&mut self, now: Instant) {
        let mut i = 0;
        while i < self.waiters.len() {
            if self.waiters[i].deadline <= now {
                let waiter = self.waiters.remove(i);
                let _ = waiter.respond.send(WaitOutcome { met: false, timeout: true });
            } else {
                i += 1;
            }
        }
    }

    /// The nearest outstanding deadline, used to size the orchestrator's
    /// next timer tick.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.waiters.iter().map(|w| w.deadline).min()
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use yare::parameterized;

    #[parameterized(
        connected = {"connected", None, Some(WaitCondition::AppConnected)},
        component_named = {"component", Some("Counter"), Some(WaitCondition::NamedComponentPresent("Counter".to_string()))},
        component_without_name = {"component", None, None},
        unknown = {"bogus", None, None},
    )]
    fn parse_condition(condition: &str, name: Option<&str>, expected: Option<WaitCondition>) {
        assert_eq!(WaitCondition::parse(condition, name), expected);
    }

    #[test]
    fn app_connected_resolves_immediately_when_already_true() {
        let mut registry = WaitRegistry::new();
        let tree = ComponentTree::new();
        let health = {
            let mut h = ConnectionHealthTracker::new();
            h.on_connect(0);
            h
        };
        let (tx, rx) = oneshot::channel();
        let resolved = registry.register(
            WaitCondition::AppConnected,
            Instant::now() + Duration::from_secs(5),
            tx,
            &tree,
            &health,
        );
        assert!(resolved);
        assert_eq!(rx.try_recv().unwrap(), WaitOutcome { met: true, timeout: false });
    }

    #[test]
    fn e7_named_component_resolves_on_signal_after_registration() {
        let mut registry = WaitRegistry::new();
        let mut tree = ComponentTree::new();
        let health = ConnectionHealthTracker::new();
        let (tx, mut rx) = oneshot::channel();

        let resolved = registry.register(
            WaitCondition::NamedComponentPresent("Counter".to_string()),
            Instant::now() + Duration::from_secs(5),
            tx,
            &tree,
            &health,
        );
        assert!(!resolved);
        assert_eq!(registry.len(), 1);

        let table = {
            let mut t = vec![7i64];
            t.extend("Counter".chars().map(|c| c as i64));
            t
        };
        let ints = {
            let mut out = vec![1i64, 1, table.len() as i64];
            out.extend(table);
            out.extend(vec![1, 1, 11, 1, 1, 1, 0, 1, 2, 5, 1, 0, 1, 0]);
            out
        };
        let batch = rdt_wire::OperationsDecoder::new().decode_batch(&ints).unwrap();
        tree.apply_batch(&batch);

        registry.signal(&tree, &health);
        assert!(registry.is_empty());
        assert_eq!(rx.try_recv().unwrap(), WaitOutcome { met: true, timeout: false });
    }

    #[test]
    fn expiry_resolves_with_timeout_and_drops_the_waiter() {
        let mut registry = WaitRegistry::new();
        let tree = ComponentTree::new();
        let health = ConnectionHealthTracker::new();
        let (tx, mut rx) = oneshot::channel();
        let deadline = Instant::now();
        registry.register(WaitCondition::AppConnected, deadline, tx, &tree, &health);

        registry.expire(deadline + Duration::from_millis(1));
        assert!(registry.is_empty());
        assert_eq!(rx.try_recv().unwrap(), WaitOutcome { met: false, timeout: true });
    }

    proptest::proptest! {
        /// Expiring at or past the latest deadline among any batch of
        /// never-met waiters always drains the registry completely.
        #[test]
        fn expire_past_every_deadline_drains_the_registry(offsets_ms in proptest::collection::vec(0u64..10_000, 0..32)) {
            let mut registry = WaitRegistry::new();
            let tree = ComponentTree::new();
            let health = ConnectionHealthTracker::new();
            let base = Instant::now();
            let mut max_deadline = base;
            for offset in &offsets_ms {
                let (tx, _rx) = oneshot::channel();
                let deadline = base + Duration::from_millis(*offset);
                max_deadline = max_deadline.max(deadline);
                registry.register(WaitCondition::NamedComponentPresent("Nope".to_string()), deadline, tx, &tree, &health);
            }
            registry.expire(max_deadline);
            proptest::prop_assert!(registry.is_empty());
        }
    }
}
