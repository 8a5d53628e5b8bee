//! The abstract state: a persistent map from memory locations to values.
//!
//! States are values. Every mutator works on an owned copy; copies share
//! structure through [`im::OrdMap`], so cloning a state per edge is cheap and
//! a state published to the reached set is never observed changing.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use im::{OrdMap, OrdSet};
use rustc_hash::FxHasher;

use crate::location::MemoryLocation;
use crate::types::Type;
use crate::value::{ArrayId, ArrayObject, Value, ValueAndType};

/// Locations the analysis must never track.
pub type Blacklist = Arc<BTreeSet<MemoryLocation>>;

#[derive(Debug, Clone, Default)]
pub struct ValueState {
    constants: OrdMap<MemoryLocation, ValueAndType>,
    /// Java arrays, referenced from `Value::Array`.
    arrays: OrdMap<ArrayId, ArrayObject>,
    /// Locations written since the last abstraction.
    delta: OrdSet<MemoryLocation>,
    /// Order-independent sum of the entry hashes of `constants`.
    hash: u64,
    blacklist: Blacklist,
}

fn entry_hash(location: &MemoryLocation, entry: &ValueAndType) -> u64 {
    let mut hasher = FxHasher::default();
    location.hash(&mut hasher);
    entry.hash(&mut hasher);
    hasher.finish()
}

impl ValueState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blacklist(blacklist: Blacklist) -> Self {
        Self {
            blacklist,
            ..Self::default()
        }
    }

    pub fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }

    pub fn is_blacklisted(&self, location: &MemoryLocation) -> bool {
        self.blacklist.contains(location) || self.blacklist.contains(&location.owner())
    }

    /// Binds `location` to `value`.
    ///
    /// Writes to blacklisted locations are dropped. Writing `Unknown` removes
    /// the entry: a state never stores `Unknown`.
    pub fn assign(&mut self, location: MemoryLocation, value: Value, ty: Type) {
        if self.is_blacklisted(&location) {
            log::trace!("Not tracking blacklisted location {}", location);
            return;
        }
        if value.is_unknown() {
            self.forget(&location);
            return;
        }
        let entry = ValueAndType::new(value, ty);
        self.hash = self.hash.wrapping_add(entry_hash(&location, &entry));
        self.delta.insert(location.clone());
        if let Some(old) = self.constants.insert(location.clone(), entry) {
            self.hash = self.hash.wrapping_sub(entry_hash(&location, &old));
        }
    }

    /// Removes `location`, returning what it held so it can be remembered later.
    pub fn forget(&mut self, location: &MemoryLocation) -> Option<ValueAndType> {
        let old = self.constants.remove(location)?;
        self.hash = self.hash.wrapping_sub(entry_hash(location, &old));
        self.delta.insert(location.clone());
        Some(old)
    }

    /// Undoes a [`forget`](Self::forget).
    pub fn remember(&mut self, location: MemoryLocation, forgotten: ValueAndType) {
        self.assign(location, forgotten.value, forgotten.ty);
    }

    pub fn contains(&self, location: &MemoryLocation) -> bool {
        self.constants.contains_key(location)
    }

    pub fn get(&self, location: &MemoryLocation) -> Option<&ValueAndType> {
        self.constants.get(location)
    }

    pub fn value_of(&self, location: &MemoryLocation) -> Option<&Value> {
        self.get(location).map(|e| &e.value)
    }

    pub fn type_of(&self, location: &MemoryLocation) -> Option<&Type> {
        self.get(location).map(|e| &e.ty)
    }

    /// Number of tracked locations.
    pub fn size(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    pub fn tracked_locations(&self) -> impl Iterator<Item = &MemoryLocation> + '_ {
        self.constants.keys()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&MemoryLocation, &ValueAndType)> + '_ {
        self.constants.iter()
    }

    pub fn delta(&self) -> impl Iterator<Item = &MemoryLocation> + '_ {
        self.delta.iter()
    }

    pub fn clear_delta(&mut self) {
        self.delta = OrdSet::new();
    }

    /// Keeps only the entries satisfying `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&MemoryLocation, &ValueAndType) -> bool) {
        let doomed: Vec<MemoryLocation> = self
            .constants
            .iter()
            .filter(|(loc, entry)| !keep(loc, entry))
            .map(|(loc, _)| loc.clone())
            .collect();
        for loc in doomed {
            self.forget(&loc);
        }
    }

    /// Drops every location local to `function`.
    pub fn drop_frame(&mut self, function: &str) {
        self.retain(|loc, _| !loc.is_on_function_stack(function));
    }

    /// Must-agree join: the entries on which `self` and `other` agree.
    ///
    /// When the result has as many entries as `other`, `other` itself is returned.
    pub fn join(&self, other: &ValueState) -> ValueState {
        let (small, large) = if self.size() <= other.size() {
            (self, other)
        } else {
            (other, self)
        };
        let mut constants = OrdMap::new();
        let mut hash = 0u64;
        for (loc, entry) in small.constants.iter() {
            if let Some(theirs) = large.constants.get(loc) {
                if theirs.value == entry.value {
                    let kept = other.constants.get(loc).unwrap_or(entry).clone();
                    hash = hash.wrapping_add(entry_hash(loc, &kept));
                    constants.insert(loc.clone(), kept);
                }
            }
        }
        let arrays = join_arrays(&self.arrays, &other.arrays);
        if constants.len() == other.size() && arrays == other.arrays {
            let mut result = other.clone();
            result.clear_delta();
            return result;
        }
        ValueState {
            constants,
            arrays,
            delta: OrdSet::new(),
            hash,
            blacklist: self.blacklist.clone(),
        }
    }

    /// Partial order: `self` is at least as precise as `other`.
    ///
    /// Types are not compared.
    pub fn is_less_or_equal(&self, other: &ValueState) -> bool {
        if self.size() < other.size() {
            return false;
        }
        let entries_agree = other
            .constants
            .iter()
            .all(|(loc, entry)| self.value_of(loc) == Some(&entry.value));
        entries_agree
            && other.arrays.iter().all(|(id, theirs)| match self.arrays.get(id) {
                Some(ours) => {
                    ours.len() == theirs.len()
                        && ours
                            .elements
                            .iter()
                            .zip(theirs.elements.iter())
                            .all(|(a, b)| b.is_unknown() || a == b)
                }
                None => false,
            })
    }

    // Java arrays

    pub fn array(&self, id: ArrayId) -> Option<&ArrayObject> {
        self.arrays.get(&id)
    }

    pub fn arrays(&self) -> impl Iterator<Item = (&ArrayId, &ArrayObject)> + '_ {
        self.arrays.iter()
    }

    /// Stores a freshly allocated array under `id`.
    ///
    /// An allocation site executed again produces a new object under the same
    /// id: everything still pointing at the previous object is forgotten.
    pub fn allocate_array(&mut self, id: ArrayId, object: ArrayObject) {
        if self.arrays.contains_key(&id) {
            log::trace!("Reallocation of {}, forgetting old references", id);
            let stale = Value::Array(id);
            self.retain(|_, entry| entry.value != stale);
            let referencing: Vec<ArrayId> = self
                .arrays
                .iter()
                .filter(|(_, obj)| obj.elements.iter().any(|e| *e == stale))
                .map(|(id, _)| *id)
                .collect();
            for other in referencing {
                if let Some(obj) = self.arrays.get_mut(&other) {
                    for e in obj.elements.iter_mut() {
                        if *e == stale {
                            *e = Value::Unknown;
                        }
                    }
                }
            }
        }
        self.arrays.insert(id, object);
    }

    /// Writes one element; returns false when the array or the index is unknown.
    pub fn set_array_element(&mut self, id: ArrayId, index: i64, value: Value) -> bool {
        let updated = match self.arrays.get(&id).and_then(|a| a.with_element(index, value)) {
            Some(updated) => updated,
            None => return false,
        };
        self.arrays.insert(id, updated);
        true
    }

    /// Forgets the whole contents of an array (its length stays known).
    pub fn forget_array_elements(&mut self, id: ArrayId) {
        if let Some(obj) = self.arrays.get_mut(&id) {
            for e in obj.elements.iter_mut() {
                *e = Value::Unknown;
            }
        }
    }

    /// Drops arrays no tracked location can reach.
    pub fn collect_garbage(&mut self) {
        let mut reachable = BTreeSet::new();
        let mut work: Vec<ArrayId> = self
            .constants
            .values()
            .filter_map(|e| match e.value {
                Value::Array(id) => Some(id),
                _ => None,
            })
            .collect();
        while let Some(id) = work.pop() {
            if !reachable.insert(id) {
                continue;
            }
            if let Some(obj) = self.arrays.get(&id) {
                work.extend(obj.elements.iter().filter_map(|e| match e {
                    Value::Array(inner) => Some(*inner),
                    _ => None,
                }));
            }
        }
        if reachable.len() < self.arrays.len() {
            self.arrays = self
                .arrays
                .iter()
                .filter(|(id, _)| reachable.contains(*id))
                .map(|(id, obj)| (*id, obj.clone()))
                .collect();
        }
    }
}

/// Arrays present in both arenas with equal length; disagreeing elements become unknown.
fn join_arrays(a: &OrdMap<ArrayId, ArrayObject>, b: &OrdMap<ArrayId, ArrayObject>) -> OrdMap<ArrayId, ArrayObject> {
    let mut out = OrdMap::new();
    for (id, theirs) in b.iter() {
        let ours = match a.get(id) {
            Some(o) if o.len() == theirs.len() => o,
            _ => continue,
        };
        if ours == theirs {
            out.insert(*id, theirs.clone());
            continue;
        }
        let elements = ours.elements.iter().zip(theirs.elements.iter()).map(|(x, y)| {
            if x == y {
                y.clone()
            } else {
                Value::Unknown
            }
        });
        out.insert(*id, ArrayObject::new(theirs.element_type.clone(), elements));
    }
    out
}

impl PartialEq for ValueState {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.constants == other.constants && self.arrays == other.arrays
    }
}

impl Eq for ValueState {}

impl Hash for ValueState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
        self.arrays.len().hash(state);
    }
}

impl fmt::Display for ValueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, (loc, entry)) in self.constants.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", loc, entry)?;
        }
        write!(f, "]")?;
        if !self.arrays.is_empty() {
            write!(f, " arrays{{")?;
            for (i, (id, obj)) in self.arrays.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: [", id)?;
                for (j, e) in obj.elements.iter().enumerate() {
                    if j > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, "]")?;
            }
            write!(f, "}}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn x() -> MemoryLocation {
        MemoryLocation::global("x")
    }

    fn y() -> MemoryLocation {
        MemoryLocation::local("main", "y")
    }

    fn state(entries: &[(MemoryLocation, i64)]) -> ValueState {
        let mut s = ValueState::new();
        for (loc, v) in entries {
            s.assign(loc.clone(), Value::int(*v), Type::int());
        }
        s
    }

    #[test]
    fn test_assign_and_read() {
        let s = state(&[(x(), 1), (y(), 2)]);
        assert_eq!(s.value_of(&x()), Some(&Value::int(1)));
        assert_eq!(s.type_of(&y()), Some(&Type::int()));
        assert_eq!(s.size(), 2);
        assert_eq!(s.delta().count(), 2);
    }

    #[test]
    fn test_assign_unknown_removes() {
        let mut s = state(&[(x(), 1)]);
        s.assign(x(), Value::Unknown, Type::int());
        assert!(!s.contains(&x()));
    }

    #[test]
    fn test_blacklisted_locations_are_not_tracked() {
        let blacklist: Blacklist = Arc::new([x()].into_iter().collect());
        let mut s = ValueState::with_blacklist(blacklist);
        s.assign(x(), Value::int(1), Type::int());
        s.assign(x().with_added_offset(4).unwrap(), Value::int(1), Type::int());
        s.assign(y(), Value::int(1), Type::int());
        assert_eq!(s.size(), 1);
        assert!(s.contains(&y()));
    }

    #[test]
    fn test_forget_remember_restores_state() {
        let s = state(&[(x(), 1), (y(), 2)]);
        let mut t = s.clone();
        let forgotten = t.forget(&x()).unwrap();
        assert_ne!(s, t);
        t.remember(x(), forgotten);
        assert_eq!(s, t);
        assert!(t.forget(&MemoryLocation::global("z")).is_none());
    }

    #[test]
    fn test_hash_is_order_independent() {
        let a = state(&[(x(), 1), (y(), 2)]);
        let b = state(&[(y(), 2), (x(), 1)]);
        assert_eq!(a, b);
        assert_eq!(a.hash, b.hash);
        let mut c = b.clone();
        c.assign(x(), Value::int(3), Type::int());
        c.assign(x(), Value::int(1), Type::int());
        assert_eq!(a.hash, c.hash);
    }

    #[test]
    fn test_join_keeps_agreeing_entries() {
        let a = state(&[(x(), 1), (y(), 2)]);
        let b = state(&[(x(), 1), (y(), 3)]);
        let j = a.join(&b);
        assert_eq!(j.size(), 1);
        assert_eq!(j.value_of(&x()), Some(&Value::int(1)));
        assert!(j.is_less_or_equal(&j));
        assert!(a.is_less_or_equal(&j));
        assert!(b.is_less_or_equal(&j));
    }

    #[test]
    fn test_join_returns_other_when_it_is_the_result() {
        let a = state(&[(x(), 1), (y(), 2)]);
        let b = state(&[(x(), 1)]);
        assert_eq!(a.join(&b), b);
        assert_eq!(a.join(&a), a);
    }

    #[test]
    fn test_less_or_equal_ignores_types() {
        let mut a = ValueState::new();
        a.assign(x(), Value::int(1), Type::long());
        let b = state(&[(x(), 1)]);
        assert!(a.is_less_or_equal(&b));
        assert!(!ValueState::new().is_less_or_equal(&b));
    }

    #[test]
    fn test_drop_frame() {
        let mut s = state(&[(x(), 1), (y(), 2), (MemoryLocation::local("f", "y"), 3)]);
        s.drop_frame("main");
        assert_eq!(s.size(), 2);
        assert!(!s.contains(&y()));
    }

    #[test]
    fn test_reallocation_forgets_old_references() {
        let id = ArrayId { site: 1, index: 0 };
        let mut s = ValueState::new();
        let arr_ty = Type::JavaArray(Box::new(Type::java_int()));
        s.allocate_array(id, ArrayObject::new(Type::java_int(), vec![Value::int(0); 2]));
        s.assign(x(), Value::Array(id), arr_ty.clone());
        assert!(s.set_array_element(id, 1, Value::int(5)));
        assert!(!s.set_array_element(id, 2, Value::int(5)));

        let before = s.clone();
        s.allocate_array(id, ArrayObject::new(Type::java_int(), vec![Value::int(0); 3]));
        s.assign(y(), Value::Array(id), arr_ty);
        assert!(!s.contains(&x()));
        assert_eq!(s.array(id).unwrap().len(), 3);
        // The earlier state is unaffected.
        assert_eq!(before.array(id).unwrap().get(1), Some(&Value::int(5)));
    }

    #[test]
    fn test_array_join_and_order() {
        let id = ArrayId { site: 1, index: 0 };
        let mut a = ValueState::new();
        a.allocate_array(id, ArrayObject::new(Type::java_int(), vec![Value::int(1), Value::int(2)]));
        a.assign(x(), Value::Array(id), Type::JavaArray(Box::new(Type::java_int())));
        let mut b = a.clone();
        b.set_array_element(id, 1, Value::int(3));
        let j = a.join(&b);
        assert_eq!(j.array(id).unwrap().get(0), Some(&Value::int(1)));
        assert_eq!(j.array(id).unwrap().get(1), Some(&Value::Unknown));
        assert!(a.is_less_or_equal(&j));
        assert!(b.is_less_or_equal(&j));
        assert!(!j.is_less_or_equal(&a));
    }

    #[test]
    fn test_garbage_collection() {
        let outer = ArrayId { site: 1, index: 0 };
        let inner = ArrayId { site: 1, index: 1 };
        let lost = ArrayId { site: 2, index: 0 };
        let mut s = ValueState::new();
        s.allocate_array(inner, ArrayObject::new(Type::java_int(), vec![Value::int(0)]));
        s.allocate_array(outer, ArrayObject::new(Type::Unspecified, vec![Value::Array(inner)]));
        s.allocate_array(lost, ArrayObject::new(Type::java_int(), vec![]));
        s.assign(x(), Value::Array(outer), Type::Unspecified);
        s.collect_garbage();
        assert!(s.array(outer).is_some());
        assert!(s.array(inner).is_some());
        assert!(s.array(lost).is_none());
    }

    #[test]
    fn test_display() {
        let s = state(&[(x(), 1), (y(), 2)]);
        assert_eq!(s.to_string(), "[x=1 (int), main::y=2 (int)]");
    }
}
