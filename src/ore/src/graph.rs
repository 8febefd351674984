// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository, or online at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Partial orders and their topological orders.

use std::collections::{BTreeMap, BTreeSet};

/// A set of elements together with a "depends on" relation over them.
///
/// Elements remember the order in which they were added; [`any_topological_order`]
/// uses that order to break ties, which keeps the result deterministic.
#[derive(Debug, Clone)]
pub struct PartialOrder<N> {
    elements: Vec<N>,
    positions: BTreeMap<N, usize>,
    dependencies: BTreeMap<N, BTreeSet<N>>,
}

impl<N: Ord + Copy> Default for PartialOrder<N> {
    fn default() -> Self {
        Self {
            elements: Vec::new(),
            positions: BTreeMap::new(),
            dependencies: BTreeMap::new(),
        }
    }
}

impl<N: Ord + Copy> PartialOrder<N> {
    /// Creates an empty partial order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `element` unless it is already present. Returns `true` if it was added.
    pub fn add_element(&mut self, element: N) -> bool {
        if self.positions.contains_key(&element) {
            return false;
        }
        self.positions.insert(element, self.elements.len());
        self.elements.push(element);
        true
    }

    /// Records that `element` depends on `dependency`, adding both if needed.
    ///
    /// A dependency is ordered before its dependants.
    pub fn add_dependency(&mut self, element: N, dependency: N) {
        self.add_element(element);
        self.add_element(dependency);
        self.dependencies
            .entry(element)
            .or_default()
            .insert(dependency);
    }

    /// The elements in insertion order.
    pub fn elements(&self) -> &[N] {
        &self.elements
    }

    /// The direct dependencies of `element`.
    pub fn dependencies_of(&self, element: &N) -> impl Iterator<Item = &N> + '_ {
        self.dependencies.get(element).into_iter().flatten()
    }

    /// The number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether there are no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Returns an order of all elements of `order` in which every element comes after
/// all of its dependencies, or `None` if the dependency relation has a cycle.
///
/// Among the elements whose dependencies have all been emitted, the one added to
/// the partial order first is emitted next.
pub fn any_topological_order<N: Ord + Copy>(order: &PartialOrder<N>) -> Option<Vec<N>> {
    let mut in_degree = vec![0usize; order.elements.len()];
    let mut dependants: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (element, dependencies) in order.dependencies.iter() {
        let position = order.positions[element];
        for dependency in dependencies {
            let dependency_position = order.positions[dependency];
            in_degree[position] += 1;
            dependants
                .entry(dependency_position)
                .or_default()
                .push(position);
        }
    }

    let mut ready: BTreeSet<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(position, _)| position)
        .collect();
    let mut result = Vec::with_capacity(order.elements.len());
    while let Some(position) = ready.pop_first() {
        result.push(order.elements[position]);
        for dependant in dependants.get(&position).into_iter().flatten() {
            in_degree[*dependant] -= 1;
            if in_degree[*dependant] == 0 {
                ready.insert(*dependant);
            }
        }
    }

    if result.len() == order.elements.len() {
        Some(result)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn chain_is_ordered_children_first() {
        // a -> b -> c
        let mut order = PartialOrder::new();
        order.add_dependency('a', 'b');
        order.add_dependency('b', 'c');
        assert_eq!(any_topological_order(&order), Some(vec!['c', 'b', 'a']));
    }

    #[test]
    fn independent_elements_keep_insertion_order() {
        let mut order = PartialOrder::new();
        order.add_element(3);
        order.add_element(1);
        order.add_element(2);
        assert_eq!(any_topological_order(&order), Some(vec![3, 1, 2]));
    }

    #[test]
    fn cycle_is_detected() {
        let mut order = PartialOrder::new();
        order.add_dependency("a", "b");
        order.add_dependency("b", "a");
        order.add_element("c");
        assert_eq!(any_topological_order(&order), None);
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let mut order = PartialOrder::new();
        order.add_dependency(0, 0);
        assert_eq!(any_topological_order(&order), None);
    }

    proptest! {
        // Edges only ever point from a larger to a smaller element, so the graph is acyclic.
        #[test]
        fn respects_every_dependency(edges in proptest::collection::vec((0u8..32, 0u8..32), 0..64)) {
            let mut order = PartialOrder::new();
            for (x, y) in edges.iter() {
                if x > y {
                    order.add_dependency(*x, *y);
                } else {
                    order.add_element(*x);
                    order.add_element(*y);
                }
            }
            let sorted = any_topological_order(&order).expect("acyclic");
            prop_assert_eq!(sorted.len(), order.len());
            let position: BTreeMap<u8, usize> =
                sorted.iter().enumerate().map(|(i, n)| (*n, i)).collect();
            for element in order.elements() {
                for dependency in order.dependencies_of(element) {
                    prop_assert!(position[dependency] < position[element]);
                }
            }
        }
    }
}
