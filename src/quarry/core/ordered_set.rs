//! Ordered-uniqued accumulation (component H.1 of the propagation engine,
//! but also the backing store for `sources`, `deps`, `configs` and friends on
//! [`Target`](crate::core::target::Target)).
//!
//! `IndexSet` already gives us exactly the contract the data model asks for:
//! insertion order preserved, O(1) amortized "insert if absent", and
//! insertion of an already-present element is a silent no-op that does not
//! move it.

use std::hash::Hash;

use indexmap::{IndexMap, IndexSet};

/// An ordered, uniqued sequence of `T`.
#[derive(Debug, Clone)]
pub struct OrderedSet<T: Hash + Eq> {
    items: IndexSet<T>,
}

impl<T: Hash + Eq> OrderedSet<T> {
    pub fn new() -> OrderedSet<T> {
        OrderedSet {
            items: IndexSet::new(),
        }
    }

    /// Appends `item` if it is not already present. Returns `true` if it was
    /// newly inserted.
    pub fn push_back_if_unique(&mut self, item: T) -> bool {
        self.items.insert(item)
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> indexmap::set::Iter<'_, T> {
        self.items.iter()
    }

    pub fn extend_unique<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.push_back_if_unique(item);
        }
    }
}

impl<T: Hash + Eq> Default for OrderedSet<T> {
    fn default() -> Self {
        OrderedSet::new()
    }
}

impl<T: Hash + Eq> IntoIterator for OrderedSet<T> {
    type Item = T;
    type IntoIter = indexmap::set::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T: Hash + Eq> IntoIterator for &'a OrderedSet<T> {
    type Item = &'a T;
    type IntoIter = indexmap::set::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Hash + Eq> FromIterator<T> for OrderedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = OrderedSet::new();
        set.extend_unique(iter);
        set
    }
}

/// An ordered, uniqued mapping from `K` to `V` where a repeated key's value
/// can be *upgraded* in place without disturbing its position — the shape
/// `inherited_libraries` needs for its "public wins" merge rule (4.H.2).
#[derive(Debug, Clone)]
pub struct UpgradeMap<K: Hash + Eq, V> {
    items: IndexMap<K, V>,
}

impl<K: Hash + Eq, V> UpgradeMap<K, V> {
    pub fn new() -> UpgradeMap<K, V> {
        UpgradeMap {
            items: IndexMap::new(),
        }
    }

    /// Inserts `(key, value)`, or if `key` is already present, calls
    /// `merge(existing, value)` to fold the new value into the existing one
    /// in place — original position is kept either way.
    pub fn upsert(&mut self, key: K, value: V, merge: impl FnOnce(&mut V, V)) {
        match self.items.get_mut(&key) {
            Some(slot) => merge(slot, value),
            None => {
                self.items.insert(key, value);
            }
        }
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, K, V> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.items.get(key)
    }
}

impl<K: Hash + Eq, V> Default for UpgradeMap<K, V> {
    fn default() -> Self {
        UpgradeMap::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn reinserting_is_a_noop_on_position() {
        let mut set = OrderedSet::new();
        set.push_back_if_unique("a");
        set.push_back_if_unique("b");
        set.push_back_if_unique("a");
        let collected: Vec<_> = set.iter().copied().collect();
        assert_eq!(collected, vec!["a", "b"]);
    }

    #[test]
    fn upgrade_map_merges_without_reordering_visible_order() {
        let mut map: UpgradeMap<&str, bool> = UpgradeMap::new();
        map.upsert("a", false, |old, new| *old = *old || new);
        map.upsert("b", false, |old, new| *old = *old || new);
        map.upsert("a", true, |old, new| *old = *old || new);
        let keys: Vec<_> = map.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(*map.get(&"a").unwrap(), true);
    }

    proptest! {
        /// spec.md §8: "for every ordered-uniqued accumulation, inserting
        /// already-present elements does not change the sequence." Pushing
        /// an arbitrary sequence once, then pushing the same sequence again
        /// on top, must leave the set identical to the single pass.
        #[test]
        fn reinserting_any_sequence_leaves_it_unchanged(xs in proptest::collection::vec(0i32..64, 0..40)) {
            let mut once = OrderedSet::new();
            once.extend_unique(xs.iter().copied());
            let single_pass: Vec<i32> = once.iter().copied().collect();

            let mut twice = OrderedSet::new();
            twice.extend_unique(xs.iter().copied());
            twice.extend_unique(xs.iter().copied());
            let double_pass: Vec<i32> = twice.iter().copied().collect();

            prop_assert_eq!(single_pass, double_pass);
        }
    }
}
