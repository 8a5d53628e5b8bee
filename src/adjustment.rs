//! Forgetting after the transfer: precision abstraction and the two thresholds.
//!
//! The abstraction forgets what the precision does not track. The thresholds
//! forget what changes too often, at a node (reached-set threshold) or along
//! a path (path threshold). Thresholds may drop values that are needed for a
//! proof, so both are off unless configured.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use im::{HashSet, OrdMap};

use crate::cfa::{CfaNode, NodeId};
use crate::config::ValueAnalysisConfig;
use crate::location::MemoryLocation;
use crate::precision::ValuePrecision;
use crate::state::ValueState;
use crate::value::Value;

/// Read access to the states explored so far.
pub trait ReachedSetView {
    /// States already reached at `node`.
    fn states_at(&self, node: NodeId) -> &[ValueState];
}

/// Reached states grouped by node.
#[derive(Debug, Clone, Default)]
pub struct ReachedSet {
    states: BTreeMap<NodeId, Vec<ValueState>>,
}

impl ReachedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: NodeId, state: ValueState) {
        self.states.entry(node).or_default().push(state);
    }

    /// Total number of states.
    pub fn len(&self) -> usize {
        self.states.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReachedSetView for ReachedSet {
    fn states_at(&self, node: NodeId) -> &[ValueState] {
        self.states.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Information about the path leading to a state.
pub trait PathConditions {
    /// Number of distinct values assigned to `location` along the path.
    fn assignment_count(&self, location: &MemoryLocation) -> usize;
}

/// Distinct values per location seen along one path.
///
/// Persistent: [`record`](Self::record) returns the counter of the extended
/// path and leaves the counter of the prefix intact, so sibling paths share
/// their common prefix.
#[derive(Debug, Clone, Default)]
pub struct AssignmentCounter {
    values: OrdMap<MemoryLocation, HashSet<Value>>,
}

impl AssignmentCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter after reaching `state`: its changed locations are counted with their new values.
    pub fn record(&self, state: &ValueState) -> Self {
        let mut values = self.values.clone();
        for location in state.delta() {
            if let Some(value) = state.value_of(location) {
                values
                    .entry(location.clone())
                    .or_insert_with(HashSet::default)
                    .insert(value.clone());
            }
        }
        Self { values }
    }
}

impl PathConditions for AssignmentCounter {
    fn assignment_count(&self, location: &MemoryLocation) -> usize {
        self.values.get(location).map_or(0, HashSet::len)
    }
}

#[derive(Debug, Default)]
pub struct AdjustmentStatistics {
    abstractions: AtomicUsize,
    forgotten_by_precision: AtomicUsize,
    forgotten_by_reached_set: AtomicUsize,
    forgotten_by_path: AtomicUsize,
}

impl AdjustmentStatistics {
    pub fn abstractions(&self) -> usize {
        self.abstractions.load(Ordering::Relaxed)
    }

    pub fn forgotten_by_precision(&self) -> usize {
        self.forgotten_by_precision.load(Ordering::Relaxed)
    }

    pub fn forgotten_by_reached_set(&self) -> usize {
        self.forgotten_by_reached_set.load(Ordering::Relaxed)
    }

    pub fn forgotten_by_path(&self) -> usize {
        self.forgotten_by_path.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
pub struct ValuePrecisionAdjustment {
    config: ValueAnalysisConfig,
    stats: AdjustmentStatistics,
}

impl ValuePrecisionAdjustment {
    pub fn new(config: ValueAnalysisConfig) -> Self {
        Self {
            config,
            stats: AdjustmentStatistics::default(),
        }
    }

    pub fn statistics(&self) -> &AdjustmentStatistics {
        &self.stats
    }

    /// Adjusts a fresh successor reached at `node`.
    pub fn prec(
        &self,
        mut state: ValueState,
        precision: &ValuePrecision,
        node: &CfaNode,
        reached: &dyn ReachedSetView,
        path: Option<&dyn PathConditions>,
    ) -> ValueState {
        if self.config.abstraction.is_abstraction_point(node) {
            self.stats.abstractions.fetch_add(1, Ordering::Relaxed);
            let forgotten = precision.compute_abstraction(&mut state, node);
            self.stats.forgotten_by_precision.fetch_add(forgotten, Ordering::Relaxed);
        }

        let thresholds = precision.thresholds();
        if let Some(threshold) = thresholds.reached_set {
            let forgotten = enforce_reached_set_threshold(&mut state, reached.states_at(node.id), threshold);
            self.stats.forgotten_by_reached_set.fetch_add(forgotten, Ordering::Relaxed);
        }
        if let (Some(threshold), Some(path)) = (thresholds.path, path) {
            let forgotten = enforce_path_threshold(&mut state, path, threshold);
            self.stats.forgotten_by_path.fetch_add(forgotten, Ordering::Relaxed);
        }
        state
    }
}

/// Forgets every location that took more than `threshold` distinct values at this node.
fn enforce_reached_set_threshold(state: &mut ValueState, reached: &[ValueState], threshold: usize) -> usize {
    let doomed: Vec<MemoryLocation> = state
        .entries()
        .filter(|(location, entry)| {
            let mut seen: Vec<&Value> = vec![&entry.value];
            for other in reached {
                if let Some(v) = other.value_of(location) {
                    if !seen.contains(&v) {
                        seen.push(v);
                    }
                }
            }
            seen.len() > threshold
        })
        .map(|(location, _)| location.clone())
        .collect();
    for location in &doomed {
        log::trace!("Reached-set threshold exceeded, forgetting {}", location);
        state.forget(location);
    }
    doomed.len()
}

/// Forgets every location assigned more than `threshold` distinct values along the path.
fn enforce_path_threshold(state: &mut ValueState, path: &dyn PathConditions, threshold: usize) -> usize {
    let doomed: Vec<MemoryLocation> = state
        .tracked_locations()
        .filter(|location| path.assignment_count(location) > threshold)
        .cloned()
        .collect();
    for location in &doomed {
        log::trace!("Path threshold exceeded, forgetting {}", location);
        state.forget(location);
    }
    doomed.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AbstractionPoints;
    use crate::precision::{AllowList, PrecisionFilter, PrecisionIncrement, Thresholds};
    use crate::types::Type;

    use std::sync::Arc;

    use test_log::test;

    fn x() -> MemoryLocation {
        MemoryLocation::local("main", "x")
    }

    fn with_x(v: i64) -> ValueState {
        let mut s = ValueState::new();
        s.assign(x(), Value::int(v), Type::int());
        s
    }

    fn precision(thresholds: Thresholds) -> ValuePrecision {
        ValuePrecision::new(AllowList::Full, PrecisionFilter::default(), thresholds)
    }

    #[test]
    fn test_abstraction_only_at_abstraction_points() {
        let mut inc = PrecisionIncrement::new();
        inc.add_everywhere(MemoryLocation::global("g"));
        let p = Arc::new(ValuePrecision::scoped_empty()).refine(&inc);
        let adjustment = ValuePrecisionAdjustment::new(ValueAnalysisConfig {
            abstraction: AbstractionPoints::LoopHeads,
            ..ValueAnalysisConfig::default()
        });
        let plain = CfaNode::new(1, "main");
        let head = CfaNode::new(2, "main").as_loop_head();
        let reached = ReachedSet::new();

        let s = adjustment.prec(with_x(1), &p, &plain, &reached, None);
        assert!(s.contains(&x()));
        let s = adjustment.prec(with_x(1), &p, &head, &reached, None);
        assert!(!s.contains(&x()));
        assert_eq!(adjustment.statistics().abstractions(), 1);
        assert_eq!(adjustment.statistics().forgotten_by_precision(), 1);
    }

    #[test]
    fn test_reached_set_threshold() {
        let node = CfaNode::new(3, "main");
        let mut reached = ReachedSet::new();
        reached.add(node.id, with_x(1));
        reached.add(node.id, with_x(2));
        reached.add(node.id, with_x(2));
        let adjustment = ValuePrecisionAdjustment::default();

        let p = precision(Thresholds {
            reached_set: Some(3),
            path: None,
        });
        assert!(adjustment.prec(with_x(3), &p, &node, &reached, None).contains(&x()));
        let p = precision(Thresholds {
            reached_set: Some(2),
            path: None,
        });
        assert!(!adjustment.prec(with_x(3), &p, &node, &reached, None).contains(&x()));
        // A value already seen does not count twice.
        assert!(adjustment.prec(with_x(2), &p, &node, &reached, None).contains(&x()));
        assert_eq!(adjustment.statistics().forgotten_by_reached_set(), 1);
    }

    #[test]
    fn test_thresholds_off_by_default() {
        let node = CfaNode::new(3, "main");
        let mut reached = ReachedSet::new();
        for v in 0..10 {
            reached.add(node.id, with_x(v));
        }
        let adjustment = ValuePrecisionAdjustment::default();
        let s = adjustment.prec(with_x(42), &ValuePrecision::with_full(), &node, &reached, None);
        assert!(s.contains(&x()));
    }

    #[test]
    fn test_path_threshold() {
        let counter = AssignmentCounter::new();
        let c1 = counter.record(&with_x(1));
        let mut s2 = with_x(1);
        s2.clear_delta();
        s2.assign(x(), Value::int(2), Type::int());
        let c2 = c1.record(&s2);
        assert_eq!(counter.assignment_count(&x()), 0);
        assert_eq!(c1.assignment_count(&x()), 1);
        assert_eq!(c2.assignment_count(&x()), 2);
        assert_eq!(c2.record(&s2).assignment_count(&x()), 2);

        let p = precision(Thresholds {
            reached_set: None,
            path: Some(1),
        });
        let node = CfaNode::new(4, "main");
        let adjustment = ValuePrecisionAdjustment::default();
        let reached = ReachedSet::new();
        assert!(adjustment.prec(s2.clone(), &p, &node, &reached, Some(&c1)).contains(&x()));
        assert!(!adjustment.prec(s2, &p, &node, &reached, Some(&c2)).contains(&x()));
        assert_eq!(adjustment.statistics().forgotten_by_path(), 1);
    }
}
