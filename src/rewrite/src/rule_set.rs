// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Ordered collections of rules.

use std::fmt;
use std::marker::PhantomData;

use rq_ore::graph::{any_topological_order, PartialOrder};

use crate::rule::{ComputationRule, PlannerRule, SimplificationRule};
use crate::tree::TreeLike;
use crate::RewriteError;

/// An ordered collection of rules over nodes of type `T`.
///
/// The order matters: when rewriting to a fixpoint, the first rule that changes a
/// node wins, and the scan restarts from the first rule.
pub struct RuleSet<T: TreeLike, R: ?Sized> {
    rules: Vec<Box<R>>,
    phantom: PhantomData<fn() -> T>,
}

/// A rule set of [`SimplificationRule`]s.
pub type SimplificationRuleSet<T> = RuleSet<T, dyn SimplificationRule<T>>;

/// A rule set of [`ComputationRule`]s.
pub type ComputationRuleSet<T, A, R> = RuleSet<T, dyn ComputationRule<T, A, R>>;

impl<T: TreeLike, R: ?Sized + PlannerRule<T>> RuleSet<T, R> {
    /// Starts building a rule set.
    pub fn builder() -> RuleSetBuilder<T, R> {
        RuleSetBuilder {
            rules: Vec::new(),
            phantom: PhantomData,
        }
    }

    /// The rules that may apply to a node of kind `operator`, in order.
    pub fn rules(&self, operator: T::Operator) -> impl Iterator<Item = &R> + '_ {
        self.rules
            .iter()
            .map(|rule| &**rule)
            .filter(move |rule| rule.root_operator().map_or(true, |root| root == operator))
    }

    /// All rules, in order.
    pub fn all_rules(&self) -> impl Iterator<Item = &R> + '_ {
        self.rules.iter().map(|rule| &**rule)
    }

    /// The number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the rule set is empty.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<T: TreeLike, R: ?Sized + PlannerRule<T>> fmt::Debug for RuleSet<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|rule| rule.name()))
            .finish()
    }
}

/// Builds a [`RuleSet`].
pub struct RuleSetBuilder<T: TreeLike, R: ?Sized> {
    rules: Vec<(Box<R>, Vec<&'static str>)>,
    phantom: PhantomData<fn() -> T>,
}

impl<T: TreeLike, R: ?Sized + PlannerRule<T>> RuleSetBuilder<T, R> {
    /// Appends `rule`.
    pub fn add(self, rule: Box<R>) -> Self {
        self.add_after(rule, &[])
    }

    /// Appends `rule`, which must run after every rule named in `dependencies`.
    pub fn add_after(mut self, rule: Box<R>, dependencies: &[&'static str]) -> Self {
        self.rules.push((rule, dependencies.to_vec()));
        self
    }

    /// Orders the rules so that every rule comes after its dependencies, and in
    /// insertion order otherwise.
    pub fn build(self) -> Result<RuleSet<T, R>, RewriteError> {
        let mut order = PartialOrder::new();
        for (position, (rule, dependencies)) in self.rules.iter().enumerate() {
            order.add_element(position);
            for dependency in dependencies {
                let dependency_position = self
                    .rules
                    .iter()
                    .position(|(other, _)| other.name() == *dependency)
                    .ok_or(RewriteError::UnknownRuleDependency {
                        rule: rule.name(),
                        dependency: *dependency,
                    })?;
                order.add_dependency(position, dependency_position);
            }
        }
        let order = any_topological_order(&order).ok_or(RewriteError::CyclicRuleDependencies)?;

        let mut slots: Vec<Option<Box<R>>> =
            self.rules.into_iter().map(|(rule, _)| Some(rule)).collect();
        let mut rules = Vec::with_capacity(slots.len());
        for position in order {
            let rule = slots[position]
                .take()
                .ok_or_else(|| RewriteError::Internal("rule ordered twice".into()))?;
            rules.push(rule);
        }
        Ok(RuleSet {
            rules,
            phantom: PhantomData,
        })
    }
}

impl<T: TreeLike, R: ?Sized + PlannerRule<T>> fmt::Debug for RuleSetBuilder<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.rules.iter().map(|(rule, dependencies)| (rule.name(), dependencies)))
            .finish()
    }
}
