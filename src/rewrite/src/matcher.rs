// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Patterns over trees.
//!
//! A [`Matcher`] enumerates every way in which a node matches a pattern. Each
//! match is described by a set of [`Bindings`] that map the keys named in the
//! pattern to the nodes they matched. Patterns are built from a few combinators:
//!
//! ```text
//! operator(Op::Add).exactly(vec![Box::new(any_bound("left")), Box::new(any_bound("right"))])
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::tree::TreeLike;

/// The nodes bound by one match of a pattern.
pub struct Bindings<T> {
    bound: BTreeMap<&'static str, Vec<Rc<T>>>,
}

impl<T> Bindings<T> {
    /// Bindings that bind nothing.
    pub fn new() -> Self {
        Bindings {
            bound: BTreeMap::new(),
        }
    }

    /// Returns a copy of these bindings that additionally binds `node` under `key`.
    pub fn bind(&self, key: &'static str, node: &Rc<T>) -> Self {
        let mut bindings = self.clone();
        bindings
            .bound
            .entry(key)
            .or_default()
            .push(Rc::clone(node));
        bindings
    }

    /// The first node bound under `key`.
    pub fn get(&self, key: &'static str) -> Option<&Rc<T>> {
        self.bound.get(key).and_then(|nodes| nodes.first())
    }

    /// Every node bound under `key`, in binding order.
    pub fn get_all(&self, key: &'static str) -> &[Rc<T>] {
        self.bound.get(key).map_or(&[], |nodes| nodes.as_slice())
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }
}

impl<T> Clone for Bindings<T> {
    fn clone(&self) -> Self {
        Bindings {
            bound: self
                .bound
                .iter()
                .map(|(key, nodes)| (*key, nodes.iter().map(Rc::clone).collect()))
                .collect(),
        }
    }
}

impl<T> Default for Bindings<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Bindings<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.bound.iter()).finish()
    }
}

/// A pattern over nodes of type `T`.
pub trait Matcher<T: TreeLike>: fmt::Debug {
    /// Returns the bindings of every match of this pattern against `node`, each
    /// extending `outer`. Returns nothing if `node` does not match.
    fn bind_matches(&self, outer: &Bindings<T>, node: &Rc<T>) -> Vec<Bindings<T>>;
}

/// Matches any node.
#[derive(Debug, Clone, Copy)]
pub struct AnyMatcher {
    key: Option<&'static str>,
}

/// Matches any node without binding it.
pub const fn any() -> AnyMatcher {
    AnyMatcher { key: None }
}

/// Matches any node and binds it under `key`.
pub const fn any_bound(key: &'static str) -> AnyMatcher {
    AnyMatcher { key: Some(key) }
}

impl<T: TreeLike> Matcher<T> for AnyMatcher {
    fn bind_matches(&self, outer: &Bindings<T>, node: &Rc<T>) -> Vec<Bindings<T>> {
        match self.key {
            Some(key) => vec![outer.bind(key, node)],
            None => vec![outer.clone()],
        }
    }
}

#[derive(Debug)]
enum ChildrenMatcher<T: TreeLike> {
    Ignore,
    Exactly(Vec<Box<dyn Matcher<T>>>),
    AllChildren(Box<dyn Matcher<T>>),
    AnyChild(Box<dyn Matcher<T>>),
}

/// Matches nodes of one operator, and optionally their children.
#[derive(Debug)]
pub struct OperatorMatcher<T: TreeLike> {
    operator: T::Operator,
    key: Option<&'static str>,
    children: ChildrenMatcher<T>,
}

/// Matches nodes whose operator is `operator`, regardless of their children.
pub fn operator<T: TreeLike>(operator: T::Operator) -> OperatorMatcher<T> {
    OperatorMatcher {
        operator,
        key: None,
        children: ChildrenMatcher::Ignore,
    }
}

impl<T: TreeLike> OperatorMatcher<T> {
    /// Binds the matched node under `key`.
    pub fn bound(mut self, key: &'static str) -> Self {
        self.key = Some(key);
        self
    }

    /// Requires exactly one child per element of `children`, each matching the
    /// corresponding matcher.
    pub fn exactly(mut self, children: Vec<Box<dyn Matcher<T>>>) -> Self {
        self.children = ChildrenMatcher::Exactly(children);
        self
    }

    /// Requires every child to match `child`.
    pub fn all_children(mut self, child: impl Matcher<T> + 'static) -> Self {
        self.children = ChildrenMatcher::AllChildren(Box::new(child));
        self
    }

    /// Requires some child to match `child`. Produces one match per matching child.
    pub fn any_child(mut self, child: impl Matcher<T> + 'static) -> Self {
        self.children = ChildrenMatcher::AnyChild(Box::new(child));
        self
    }
}

/// Matches every child in turn against its matcher, producing the cross product
/// of their matches.
fn bind_in_sequence<'m, T: TreeLike>(
    outer: Bindings<T>,
    pairs: impl Iterator<Item = (&'m Box<dyn Matcher<T>>, &'m Rc<T>)>,
) -> Vec<Bindings<T>> {
    let mut matches = vec![outer];
    for (matcher, child) in pairs {
        matches = matches
            .iter()
            .flat_map(|bindings| matcher.bind_matches(bindings, child))
            .collect();
        if matches.is_empty() {
            break;
        }
    }
    matches
}

impl<T: TreeLike> Matcher<T> for OperatorMatcher<T> {
    fn bind_matches(&self, outer: &Bindings<T>, node: &Rc<T>) -> Vec<Bindings<T>> {
        if node.operator() != self.operator {
            return vec![];
        }
        let outer = match self.key {
            Some(key) => outer.bind(key, node),
            None => outer.clone(),
        };
        let children = node.children();
        match &self.children {
            ChildrenMatcher::Ignore => vec![outer],
            ChildrenMatcher::Exactly(matchers) => {
                if matchers.len() != children.len() {
                    return vec![];
                }
                bind_in_sequence(outer, matchers.iter().zip(children))
            }
            ChildrenMatcher::AllChildren(matcher) => {
                bind_in_sequence(outer, children.iter().map(|child| (matcher, child)))
            }
            ChildrenMatcher::AnyChild(matcher) => children
                .iter()
                .flat_map(|child| matcher.bind_matches(&outer, child))
                .collect(),
        }
    }
}

/// Matches nodes that satisfy a predicate.
pub struct FilterMatcher<T> {
    description: &'static str,
    predicate: fn(&T) -> bool,
    key: Option<&'static str>,
}

/// Matches nodes for which `predicate` holds. `description` names the predicate
/// in debug output.
pub fn filter<T: TreeLike>(
    description: &'static str,
    predicate: fn(&T) -> bool,
) -> FilterMatcher<T> {
    FilterMatcher {
        description,
        predicate,
        key: None,
    }
}

impl<T> FilterMatcher<T> {
    /// Binds the matched node under `key`.
    pub fn bound(mut self, key: &'static str) -> Self {
        self.key = Some(key);
        self
    }
}

impl<T> fmt::Debug for FilterMatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterMatcher")
            .field("description", &self.description)
            .field("key", &self.key)
            .finish()
    }
}

impl<T: TreeLike> Matcher<T> for FilterMatcher<T> {
    fn bind_matches(&self, outer: &Bindings<T>, node: &Rc<T>) -> Vec<Bindings<T>> {
        if !(self.predicate)(node) {
            return vec![];
        }
        match self.key {
            Some(key) => vec![outer.bind(key, node)],
            None => vec![outer.clone()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Node {
        label: char,
        children: Vec<Rc<Node>>,
    }

    impl TreeLike for Node {
        type Operator = char;

        fn operator(&self) -> char {
            self.label
        }

        fn children(&self) -> &[Rc<Node>] {
            &self.children
        }

        fn with_children(&self, children: Vec<Rc<Node>>) -> Rc<Node> {
            Rc::new(Node {
                label: self.label,
                children,
            })
        }
    }

    fn node(label: char, children: Vec<Rc<Node>>) -> Rc<Node> {
        Rc::new(Node { label, children })
    }

    fn labels(bindings: &Bindings<Node>, key: &'static str) -> String {
        bindings.get_all(key).iter().map(|n| n.label).collect()
    }

    #[test]
    fn operator_must_match() {
        let matcher = operator::<Node>('f').bound("f");
        assert_eq!(matcher.bind_matches(&Bindings::new(), &node('g', vec![])).len(), 0);
        let matches = matcher.bind_matches(&Bindings::new(), &node('f', vec![]));
        assert_eq!(matches.len(), 1);
        assert_eq!(labels(&matches[0], "f"), "f");
    }

    #[test]
    fn exactly_is_positional() {
        let tree = node('f', vec![node('g', vec![]), node('x', vec![])]);
        let matcher = operator::<Node>('f').exactly(vec![
            Box::new(operator::<Node>('g').bound("g")),
            Box::new(any_bound("rest")),
        ]);
        let matches = matcher.bind_matches(&Bindings::new(), &tree);
        assert_eq!(matches.len(), 1);
        assert_eq!(labels(&matches[0], "g"), "g");
        assert_eq!(labels(&matches[0], "rest"), "x");

        let swapped = node('f', vec![node('x', vec![]), node('g', vec![])]);
        assert!(matcher.bind_matches(&Bindings::new(), &swapped).is_empty());
        let short = node('f', vec![node('g', vec![])]);
        assert!(matcher.bind_matches(&Bindings::new(), &short).is_empty());
    }

    #[test]
    fn any_child_yields_one_match_per_child() {
        let tree = node('f', vec![node('a', vec![]), node('b', vec![]), node('a', vec![])]);
        let matcher =
            operator::<Node>('f').any_child(filter("is a", |n: &Node| n.label == 'a').bound("a"));
        let matches = matcher.bind_matches(&Bindings::new(), &tree);
        assert_eq!(matches.len(), 2);
        assert!(Rc::ptr_eq(matches[0].get("a").unwrap(), &tree.children()[0]));
        assert!(Rc::ptr_eq(matches[1].get("a").unwrap(), &tree.children()[2]));
    }

    #[test]
    fn all_children_accumulates_bindings() {
        let tree = node('f', vec![node('a', vec![]), node('b', vec![])]);
        let matcher = operator::<Node>('f').all_children(any_bound("child"));
        let matches = matcher.bind_matches(&Bindings::new(), &tree);
        assert_eq!(matches.len(), 1);
        assert_eq!(labels(&matches[0], "child"), "ab");

        let strict = operator::<Node>('f').all_children(operator::<Node>('a'));
        assert!(strict.bind_matches(&Bindings::new(), &tree).is_empty());
    }
}
