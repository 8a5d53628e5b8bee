//! Which locations the analysis tracks.
//!
//! A precision is immutable. Refinement returns a new [`ValuePrecision`] (or
//! the very same `Arc` when the increment adds nothing), so the refinement
//! loop detects a fixed point by pointer equality.
//!
//! # Text format
//!
//! A line ending in `:` opens a scope; every following line names one tracked
//! location of that scope.
//!
//! ```text
//! *:
//! counter
//! main:
//! i
//! s/4
//! @N12:
//! main::flag
//! ```
//!
//! `*:` holds globals, `<function>:` locals of that function, and `@N<id>:`
//! (localized precisions only) fully qualified locations at one node. The `@`
//! keeps node scopes apart from functions, whatever they are called.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use regex::Regex;

use crate::cfa::{CfaNode, NodeId};
use crate::classification::VariableClassification;
use crate::error::AnalysisError;
use crate::location::MemoryLocation;
use crate::state::ValueState;
use crate::types::Type;

/// Locations to add to a precision, optionally restricted to one node.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct PrecisionIncrement {
    entries: BTreeSet<(Option<NodeId>, MemoryLocation)>,
}

impl PrecisionIncrement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: NodeId, location: MemoryLocation) {
        self.entries.insert((Some(node), location));
    }

    pub fn add_everywhere(&mut self, location: MemoryLocation) {
        self.entries.insert((None, location));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Option<NodeId>, &MemoryLocation)> + '_ {
        self.entries.iter().map(|(n, l)| (*n, l))
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum AllowList {
    /// Everything is tracked.
    Full,
    /// One set of locations, the same at every node.
    Scoped(BTreeSet<MemoryLocation>),
    /// Locations tracked everywhere plus locations tracked at single nodes.
    Localized {
        everywhere: BTreeSet<MemoryLocation>,
        per_node: BTreeMap<NodeId, BTreeSet<MemoryLocation>>,
    },
}

fn contains_location(set: &BTreeSet<MemoryLocation>, location: &MemoryLocation) -> bool {
    set.contains(location) || (location.offset().is_some() && set.contains(&location.owner()))
}

impl AllowList {
    pub fn scoped_empty() -> Self {
        AllowList::Scoped(BTreeSet::new())
    }

    pub fn localized_empty() -> Self {
        AllowList::Localized {
            everywhere: BTreeSet::new(),
            per_node: BTreeMap::new(),
        }
    }

    pub fn contains(&self, location: &MemoryLocation, node: NodeId) -> bool {
        match self {
            AllowList::Full => true,
            AllowList::Scoped(set) => contains_location(set, location),
            AllowList::Localized { everywhere, per_node } => {
                contains_location(everywhere, location)
                    || per_node.get(&node).is_some_and(|set| contains_location(set, location))
            }
        }
    }

    /// Number of entries, `-1` for [`AllowList::Full`].
    pub fn size(&self) -> i64 {
        match self {
            AllowList::Full => -1,
            AllowList::Scoped(set) => set.len() as i64,
            AllowList::Localized { everywhere, per_node } => {
                (everywhere.len() + per_node.values().map(BTreeSet::len).sum::<usize>()) as i64
            }
        }
    }

    /// The union with `increment`, or `None` when nothing would change.
    fn join(&self, increment: &PrecisionIncrement) -> Option<AllowList> {
        let mut result = self.clone();
        let mut changed = false;
        match &mut result {
            AllowList::Full => return None,
            AllowList::Scoped(set) => {
                for (_, loc) in increment.iter() {
                    changed |= set.insert(loc.clone());
                }
            }
            AllowList::Localized { everywhere, per_node } => {
                for (node, loc) in increment.iter() {
                    changed |= match node {
                        Some(node) => {
                            !everywhere.contains(loc) && per_node.entry(node).or_default().insert(loc.clone())
                        }
                        None => everywhere.insert(loc.clone()),
                    };
                }
            }
        }
        changed.then_some(result)
    }

    /// Renders the allow-list in the line-oriented text format.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        match self {
            AllowList::Full => {}
            AllowList::Scoped(set) => write_scoped(set, &mut out),
            AllowList::Localized { everywhere, per_node } => {
                write_scoped(everywhere, &mut out);
                for (node, locs) in per_node {
                    if locs.is_empty() {
                        continue;
                    }
                    let _ = writeln!(out, "@{}:", node);
                    for loc in locs {
                        let _ = writeln!(out, "{}", loc);
                    }
                }
            }
        }
        out
    }

    /// Parses the text format. Node scopes require `localized`.
    pub fn from_text(text: &str, localized: bool) -> Result<AllowList, AnalysisError> {
        enum Scope {
            Global,
            Function(String),
            Node(NodeId),
        }

        let mut everywhere = BTreeSet::new();
        let mut per_node: BTreeMap<NodeId, BTreeSet<MemoryLocation>> = BTreeMap::new();
        let mut scope: Option<Scope> = None;

        for (i, raw) in text.lines().enumerate() {
            let line_no = i + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let invalid = |message: String| AnalysisError::InvalidPrecision { line: line_no, message };
            if let Some(name) = line.strip_suffix(':') {
                scope = Some(if name == "*" {
                    Scope::Global
                } else if let Some(node) = name.strip_prefix('@') {
                    let id = node
                        .strip_prefix('N')
                        .and_then(|n| n.parse::<u32>().ok())
                        .ok_or_else(|| invalid(format!("invalid node scope '{}'", name)))?;
                    if !localized {
                        return Err(invalid(format!("node scope {} in a scoped precision", name)));
                    }
                    Scope::Node(NodeId(id))
                } else if name.is_empty() || name.contains(char::is_whitespace) {
                    return Err(invalid(format!("invalid scope '{}'", name)));
                } else {
                    Scope::Function(name.to_string())
                });
                continue;
            }
            let parse = |s: &str| s.parse::<MemoryLocation>().map_err(|e| invalid(e.to_string()));
            match &scope {
                None => return Err(invalid(format!("'{}' outside of any scope", line))),
                Some(Scope::Global) => {
                    everywhere.insert(parse(line)?);
                }
                Some(Scope::Function(f)) => {
                    everywhere.insert(parse(&format!("{}::{}", f, line))?);
                }
                Some(Scope::Node(node)) => {
                    per_node.entry(*node).or_default().insert(parse(line)?);
                }
            }
        }

        Ok(if localized {
            AllowList::Localized { everywhere, per_node }
        } else {
            AllowList::Scoped(everywhere)
        })
    }

    pub fn load(path: impl AsRef<Path>, localized: bool) -> Result<AllowList, AnalysisError> {
        let text = std::fs::read_to_string(path)?;
        AllowList::from_text(&text, localized)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AnalysisError> {
        std::fs::write(path, self.to_text())?;
        Ok(())
    }
}

fn write_scoped(set: &BTreeSet<MemoryLocation>, out: &mut String) {
    let mut by_scope: BTreeMap<Option<&str>, Vec<&MemoryLocation>> = BTreeMap::new();
    for loc in set {
        by_scope.entry(loc.function()).or_default().push(loc);
    }
    for (scope, locs) in by_scope {
        let _ = writeln!(out, "{}:", scope.unwrap_or("*"));
        for loc in locs {
            let _ = writeln!(out, "{}", unqualified(loc));
        }
    }
}

/// `x` or `x/8`: a location without its function.
fn unqualified(loc: &MemoryLocation) -> String {
    let full = loc.to_string();
    match loc.function() {
        Some(f) => full[f.len() + 2..].to_string(),
        None => full,
    }
}

/// Filters applied on top of the allow-list; they never change during refinement.
#[derive(Debug, Clone)]
pub struct PrecisionFilter {
    /// Matched against the qualified name.
    pub blacklist: Option<Regex>,
    pub classification: Option<Arc<dyn VariableClassification>>,
    pub track_boolean: bool,
    pub track_int_equal: bool,
    pub track_int_add: bool,
    pub track_other: bool,
}

impl Default for PrecisionFilter {
    fn default() -> Self {
        Self {
            blacklist: None,
            classification: None,
            track_boolean: true,
            track_int_equal: true,
            track_int_add: true,
            track_other: true,
        }
    }
}

impl PrecisionFilter {
    pub fn is_blacklisted(&self, location: &MemoryLocation) -> bool {
        self.blacklist
            .as_ref()
            .is_some_and(|re| re.is_match(&location.qualified_name()))
    }

    /// Whether the variable class of `location` is tracked.
    pub fn is_in_tracked_class(&self, location: &MemoryLocation) -> bool {
        let classes = match &self.classification {
            Some(c) => c,
            None => return true,
        };
        let boolean = classes.is_boolean(location);
        let int_equal = classes.is_int_equal(location);
        let int_add = classes.is_int_add(location);
        if boolean && !self.track_boolean {
            return false;
        }
        if int_equal && !self.track_int_equal {
            return false;
        }
        if int_add && !self.track_int_add {
            return false;
        }
        boolean || int_equal || int_add || self.track_other
    }
}

/// Forgetting bounds that approximate instead of refine. Both are off by default.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Thresholds {
    pub reached_set: Option<usize>,
    pub path: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ValuePrecision {
    allow_list: AllowList,
    filter: Arc<PrecisionFilter>,
    thresholds: Thresholds,
}

impl ValuePrecision {
    pub fn new(allow_list: AllowList, filter: PrecisionFilter, thresholds: Thresholds) -> Self {
        Self {
            allow_list,
            filter: Arc::new(filter),
            thresholds,
        }
    }

    pub fn with_full() -> Self {
        Self::new(AllowList::Full, PrecisionFilter::default(), Thresholds::default())
    }

    pub fn scoped_empty() -> Self {
        Self::new(AllowList::scoped_empty(), PrecisionFilter::default(), Thresholds::default())
    }

    pub fn localized_empty() -> Self {
        Self::new(AllowList::localized_empty(), PrecisionFilter::default(), Thresholds::default())
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    pub fn filter(&self) -> &PrecisionFilter {
        &self.filter
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn size(&self) -> i64 {
        self.allow_list.size()
    }

    /// Whether `location` of type `ty` is tracked at `node`.
    pub fn is_tracking(&self, location: &MemoryLocation, ty: &Type, node: &CfaNode) -> bool {
        ty.is_tracked()
            && self.allow_list.contains(location, node.id)
            && !self.filter.is_blacklisted(location)
            && self.filter.is_in_tracked_class(location)
    }

    /// The precision extended by `increment`; `self` when nothing is new.
    pub fn refine(self: &Arc<Self>, increment: &PrecisionIncrement) -> Arc<Self> {
        match self.allow_list.join(increment) {
            Some(allow_list) => Arc::new(Self {
                allow_list,
                filter: self.filter.clone(),
                thresholds: self.thresholds,
            }),
            None => Arc::clone(self),
        }
    }

    /// Forgets every location of `state` not tracked at `node`, then starts a
    /// new delta. Returns the number of forgotten locations.
    pub fn compute_abstraction(&self, state: &mut ValueState, node: &CfaNode) -> usize {
        let before = state.size();
        state.retain(|loc, entry| self.is_tracking(loc, &entry.ty, node));
        let forgotten = before - state.size();
        if forgotten > 0 {
            log::trace!("Abstraction at {} forgot {} locations", node.id, forgotten);
        }
        state.clear_delta();
        state.collect_garbage();
        forgotten
    }
}
