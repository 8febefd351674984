// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Trees of reference-counted nodes.

use std::fmt;
use std::rc::Rc;

use crate::RewriteError;

/// A node of an immutable tree that can be rewritten.
///
/// Children are ordered. Nodes are never mutated; a rewrite builds a new node
/// with [`TreeLike::with_children`] and leaves the old one in place.
pub trait TreeLike: fmt::Debug + Sized + 'static {
    /// A cheap discriminant of the node kind, used to filter candidate rules.
    type Operator: Copy + Eq + Ord + fmt::Debug;

    /// The kind of this node.
    fn operator(&self) -> Self::Operator;

    /// The ordered children of this node.
    fn children(&self) -> &[Rc<Self>];

    /// Builds a new node of the same kind as `self` over `children`.
    ///
    /// `children` has as many elements as [`TreeLike::children`].
    fn with_children(&self, children: Vec<Rc<Self>>) -> Rc<Self>;
}

/// Returns the nodes of the tree rooted at `root` in post-order.
///
/// A node shared by several parents is visited once per parent.
pub fn post_order<T: TreeLike>(root: &Rc<T>) -> Vec<Rc<T>> {
    let mut result = Vec::new();
    let mut stack = vec![(Rc::clone(root), false)];
    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            result.push(node);
        } else {
            stack.push((Rc::clone(&node), true));
            for child in node.children().iter().rev() {
                stack.push((Rc::clone(child), false));
            }
        }
    }
    result
}

/// Maps the tree rooted at `root` bottom-up.
///
/// `f` is called once per node, after it has been called on all of the node's
/// children, and receives the results of those calls in child order.
pub fn try_map_post_order<T, R, E, F>(root: &Rc<T>, mut f: F) -> Result<R, E>
where
    T: TreeLike,
    E: From<RewriteError>,
    F: FnMut(&Rc<T>, Vec<R>) -> Result<R, E>,
{
    let mut stack = vec![(Rc::clone(root), false)];
    let mut mapped: Vec<R> = Vec::new();
    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            let arity = node.children().len();
            if mapped.len() < arity {
                return Err(RewriteError::UnmappedTree.into());
            }
            let children = mapped.split_off(mapped.len() - arity);
            mapped.push(f(&node, children)?);
        } else {
            stack.push((Rc::clone(&node), true));
            for child in node.children().iter().rev() {
                stack.push((Rc::clone(child), false));
            }
        }
    }
    match (mapped.pop(), mapped.is_empty()) {
        (Some(result), true) => Ok(result),
        _ => Err(RewriteError::UnmappedTree.into()),
    }
}

/// Returns `current` if every element of `mapped_children` is the very same node as
/// the corresponding child of `current`, and a copy of `current` over
/// `mapped_children` otherwise.
pub fn compute_current<T: TreeLike>(
    current: &Rc<T>,
    mapped_children: &[Rc<T>],
) -> Result<Rc<T>, RewriteError> {
    let children = current.children();
    if children.len() != mapped_children.len() {
        return Err(RewriteError::UnmappedTree);
    }
    let is_same = children
        .iter()
        .zip(mapped_children)
        .all(|(child, mapped)| Rc::ptr_eq(child, mapped));
    if is_same {
        Ok(Rc::clone(current))
    } else {
        Ok(current.with_children(mapped_children.to_vec()))
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

    fn sample() -> Rc<Node> {
        // a(b(c, d), e)
        node(
            'a',
            vec![
                node('b', vec![node('c', vec![]), node('d', vec![])]),
                node('e', vec![]),
            ],
        )
    }

    #[test]
    fn post_order_visits_children_first() {
        let labels: String = post_order(&sample()).iter().map(|n| n.label).collect();
        assert_eq!(labels, "cdbea");
    }

    #[test]
    fn map_receives_child_results_in_order() {
        let rendered = try_map_post_order::<_, _, RewriteError, _>(&sample(), |n, children| {
            if children.is_empty() {
                Ok(n.label.to_string())
            } else {
                Ok(format!("{}({})", n.label, children.join(",")))
            }
        })
        .unwrap();
        assert_eq!(rendered, "a(b(c,d),e)");
    }

    #[test]
    fn compute_current_reuses_unchanged_node() {
        let root = sample();
        let same = compute_current(&root, root.children()).unwrap();
        assert!(Rc::ptr_eq(&same, &root));

        let mut children = root.children().to_vec();
        children[1] = node('f', vec![]);
        let changed = compute_current(&root, &children).unwrap();
        assert!(!Rc::ptr_eq(&changed, &root));
        assert!(Rc::ptr_eq(&changed.children()[0], &root.children()[0]));
        assert_eq!(changed.children()[1].label, 'f');
    }

    #[test]
    fn compute_current_rejects_arity_mismatch() {
        let root = sample();
        assert_eq!(
            compute_current(&root, &root.children()[..1]).unwrap_err(),
            RewriteError::UnmappedTree
        );
    }
}
