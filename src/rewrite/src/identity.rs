// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Maps keyed by node identity.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// A map from nodes to values that compares keys by pointer identity.
///
/// Structurally equal nodes that live in different allocations are different keys.
/// The map holds on to every key, so an address cannot be reused by another node
/// while it is still present.
pub struct IdentityMap<T, V> {
    entries: BTreeMap<*const T, (Rc<T>, V)>,
}

impl<T, V> IdentityMap<T, V> {
    /// Creates an empty map.
    pub fn new() -> Self {
        IdentityMap {
            entries: BTreeMap::new(),
        }
    }

    /// The value associated with `node`, if any.
    pub fn get(&self, node: &Rc<T>) -> Option<&V> {
        self.entries.get(&Rc::as_ptr(node)).map(|(_, value)| value)
    }

    /// Associates `value` with `node`, returning the previously associated value.
    pub fn insert(&mut self, node: Rc<T>, value: V) -> Option<V> {
        self.entries
            .insert(Rc::as_ptr(&node), (node, value))
            .map(|(_, value)| value)
    }

    /// Removes and returns the value associated with `node`.
    pub fn remove(&mut self, node: &Rc<T>) -> Option<V> {
        self.entries
            .remove(&Rc::as_ptr(node))
            .map(|(_, value)| value)
    }

    /// Whether `node` has an associated value.
    pub fn contains_key(&self, node: &Rc<T>) -> bool {
        self.entries.contains_key(&Rc::as_ptr(node))
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T, V> Default for IdentityMap<T, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug, V: fmt::Debug> fmt::Debug for IdentityMap<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.values().map(|(node, value)| (node, value)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_values_are_distinct_keys() {
        let a = Rc::new(1);
        let b = Rc::new(1);
        let mut map = IdentityMap::new();
        map.insert(Rc::clone(&a), "a");
        assert_eq!(map.get(&a), Some(&"a"));
        assert_eq!(map.get(&b), None);
        assert_eq!(map.insert(Rc::clone(&a), "again"), Some("a"));
        assert_eq!(map.len(), 1);
        assert_eq!(map.remove(&a), Some("again"));
        assert!(map.is_empty());
    }
}
