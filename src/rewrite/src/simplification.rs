// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The rewrite driver.
//!
//! There are four entry points:
//!
//! * [`simplify`] rewrites a tree bottom-up. Every node, once its children are done,
//!   is rewritten to a fixpoint: the rules of the rule set are tried in order, and
//!   whenever one of them replaces the node, the scan starts over from the first
//!   rule on the replacement.
//! * [`simplify_current`] applies each rule of the rule set once to a single node
//!   and returns every distinct replacement instead of picking one.
//! * [`compute`] works like [`simplify`] with rules that also attach a result to
//!   the nodes they produce, and returns the result attached to the final root.
//! * [`optimize`] works like [`simplify`], but lets rules ask for the node they
//!   produced to be explored again, children included.
//!
//! All entry points return the rewritten tree together with the conjunction of
//! the constraints rules attached to the nodes of that tree. Nodes are compared by
//! identity throughout: a subtree no rule touched is returned as is.

use std::rc::Rc;

use rq_ore::stack::{CheckedRecursion, RecursionGuard};
use tracing::{debug, trace};

use crate::call::{ComputationRuleCall, Environment, SimplificationRuleCall};
use crate::config::RewriteConfig;
use crate::constraint::{Constrained, QueryPlanConstraint};
use crate::correlation::{AliasMap, CorrelationSet};
use crate::eval::EvaluationContext;
use crate::identity::IdentityMap;
use crate::matcher::Bindings;
use crate::rule::{ComputationRule, PlannerRule, SimplificationRule};
use crate::rule_set::{ComputationRuleSet, RuleSet, SimplificationRuleSet};
use crate::tree::{compute_current, post_order, try_map_post_order, TreeLike};
use crate::RewriteError;

/// Rewrites `root` bottom-up, each node to a fixpoint.
///
/// Returns `root` itself, unconstrained, if no rule applies anywhere. Fails if a
/// rule requests re-exploration; use [`optimize`] for rule sets that do.
#[rq_ore::instrument(target = "optimizer", level = "debug")]
pub fn simplify<T: TreeLike>(
    root: &Rc<T>,
    evaluation_context: &EvaluationContext,
    alias_map: &AliasMap,
    constant_aliases: &CorrelationSet,
    rule_set: &SimplificationRuleSet<T>,
) -> Result<Constrained<Rc<T>>, RewriteError> {
    let mut calls = SimplificationCalls::new(Environment {
        evaluation_context,
        alias_map,
        constant_aliases,
    });
    let simplified = try_map_post_order(root, |current, mapped_children| {
        let is_root = Rc::ptr_eq(current, root);
        let current = compute_current(current, &mapped_children)?;
        let call_root = if is_root { Rc::clone(&current) } else { Rc::clone(root) };
        let result = execute_rule_set_iteratively(&call_root, current, rule_set, &mut calls)?;
        result.without_re_exploration()
    })?;
    let constraint = collect_and_compose_constraints(&simplified, &calls.constraints);
    Ok(Constrained::new(simplified, constraint))
}

/// Applies every rule of `rule_set` once to `current`, assuming its children have
/// already been simplified.
///
/// Returns one alternative per rule application that replaced `current`, in rule
/// order, each with the constraints attached to it.
#[rq_ore::instrument(target = "optimizer", level = "debug")]
pub fn simplify_current<T: TreeLike>(
    current: &Rc<T>,
    evaluation_context: &EvaluationContext,
    alias_map: &AliasMap,
    constant_aliases: &CorrelationSet,
    rule_set: &SimplificationRuleSet<T>,
) -> Result<Vec<Constrained<Rc<T>>>, RewriteError> {
    let environment = Environment {
        evaluation_context,
        alias_map,
        constant_aliases,
    };
    let results = execute_rule_set(current, rule_set, || SimplificationCalls::new(environment))?;
    debug!(alternatives = results.len(), "simplified current node");
    Ok(results)
}

/// Rewrites `root` like [`simplify`], with rules that attach a result of type `R`
/// to the nodes they produce.
///
/// Returns the rewritten root together with the result attached to it, or `None`
/// if no rule produced the final root.
#[rq_ore::instrument(target = "optimizer", level = "debug")]
pub fn compute<T: TreeLike, A, R>(
    root: &Rc<T>,
    evaluation_context: &EvaluationContext,
    argument: &A,
    alias_map: &AliasMap,
    constant_aliases: &CorrelationSet,
    rule_set: &ComputationRuleSet<T, A, R>,
) -> Result<Option<(Constrained<Rc<T>>, R)>, RewriteError> {
    let mut calls = ComputationCalls {
        environment: Environment {
            evaluation_context,
            alias_map,
            constant_aliases,
        },
        argument,
        constraints: IdentityMap::new(),
        results: IdentityMap::new(),
    };
    let new_root = try_map_post_order(root, |current, mapped_children| {
        let is_root = Rc::ptr_eq(current, root);
        let current = compute_current(current, &mapped_children)?;
        let call_root = if is_root { Rc::clone(&current) } else { Rc::clone(root) };
        let result = execute_rule_set_iteratively(&call_root, current, rule_set, &mut calls)?;
        result.without_re_exploration()
    })?;
    let Some(result) = calls.results.remove(&new_root) else {
        return Ok(None);
    };
    let constraint = collect_and_compose_constraints(&new_root, &calls.constraints);
    Ok(Some((Constrained::new(new_root, constraint), result)))
}

/// Rewrites `root` like [`simplify`], honoring requests to explore a rewritten node
/// again. Uses the default [`RewriteConfig`].
pub fn optimize<T: TreeLike>(
    root: &Rc<T>,
    evaluation_context: &EvaluationContext,
    alias_map: &AliasMap,
    constant_aliases: &CorrelationSet,
    rule_set: &SimplificationRuleSet<T>,
) -> Result<Constrained<Rc<T>>, RewriteError> {
    optimize_with_config(
        root,
        evaluation_context,
        alias_map,
        constant_aliases,
        rule_set,
        &RewriteConfig::default(),
    )
}

/// Rewrites `root` like [`simplify`], honoring requests to explore a rewritten node
/// again.
///
/// When a rule that asked for re-exploration replaces a node, the children of the
/// replacement are rewritten and the replacement is driven to a fixpoint once more.
/// Fails if that happens more than `config.max_re_explorations` times for one node,
/// or if the traversal recurses deeper than `config.recursion_limit`.
#[rq_ore::instrument(target = "optimizer", level = "debug")]
pub fn optimize_with_config<T: TreeLike>(
    root: &Rc<T>,
    evaluation_context: &EvaluationContext,
    alias_map: &AliasMap,
    constant_aliases: &CorrelationSet,
    rule_set: &SimplificationRuleSet<T>,
    config: &RewriteConfig,
) -> Result<Constrained<Rc<T>>, RewriteError> {
    let mut exploration = ReExploration {
        rule_set,
        calls: SimplificationCalls::new(Environment {
            evaluation_context,
            alias_map,
            constant_aliases,
        }),
        recursion_guard: RecursionGuard::with_limit(config.recursion_limit),
        max_re_explorations: config.max_re_explorations,
    };
    let optimized = exploration.simplify_with_re_exploration(root, Rc::clone(root))?;
    if Rc::ptr_eq(&optimized, root) {
        return Ok(Constrained::unconstrained(optimized));
    }
    let constraint = collect_and_compose_constraints(&optimized, &exploration.calls.constraints);
    Ok(Constrained::new(optimized, constraint))
}

/// The outcome of driving one node through a rule set.
#[derive(Debug)]
struct ExecutionResult<T> {
    node: Rc<T>,
    /// The rule that produced `node` and asked for it to be explored again.
    re_explored_by: Option<&'static str>,
}

impl<T> ExecutionResult<T> {
    fn without_re_exploration(self) -> Result<Rc<T>, RewriteError> {
        match self.re_explored_by {
            Some(rule) => Err(RewriteError::UnexpectedReExploration { rule }),
            None => Ok(self.node),
        }
    }
}

/// A node accepted from a rule call.
struct Yielded<T> {
    node: Rc<T>,
    re_explore: bool,
}

/// Creates, runs and reconciles the rule calls of one kind of rewrite.
trait RuleCallCreator<T: TreeLike> {
    type Rule: ?Sized + PlannerRule<T>;

    /// Runs `rule` on one match of `current`. If it yields a node, records the
    /// bookkeeping for that node and returns it.
    fn run(
        &mut self,
        rule: &Self::Rule,
        root: &Rc<T>,
        current: &Rc<T>,
        bindings: Bindings<T>,
    ) -> Result<Option<Yielded<T>>, RewriteError>;

    /// Attaches the constraint of `original` to `rebuilt`, a copy of it over new children.
    fn carry_constraint(&mut self, original: &Rc<T>, rebuilt: &Rc<T>);

    /// The constraints recorded so far, by node.
    fn constraints(&self) -> &IdentityMap<T, QueryPlanConstraint>;
}

/// Returns the only element of `results`, if any. A rule yielding more than one
/// result in a single call is a bug in that rule.
fn reconcile<Y>(rule: &'static str, mut results: Vec<Y>) -> Result<Option<Y>, RewriteError> {
    if results.len() > 1 {
        return Err(RewriteError::AmbiguousYield {
            rule,
            count: results.len(),
        });
    }
    Ok(results.pop())
}

struct SimplificationCalls<'a, T> {
    environment: Environment<'a>,
    constraints: IdentityMap<T, QueryPlanConstraint>,
}

impl<'a, T: TreeLike> SimplificationCalls<'a, T> {
    fn new(environment: Environment<'a>) -> Self {
        SimplificationCalls {
            environment,
            constraints: IdentityMap::new(),
        }
    }
}

impl<'a, T: TreeLike> RuleCallCreator<T> for SimplificationCalls<'a, T> {
    type Rule = dyn SimplificationRule<T>;

    fn run(
        &mut self,
        rule: &Self::Rule,
        root: &Rc<T>,
        current: &Rc<T>,
        bindings: Bindings<T>,
    ) -> Result<Option<Yielded<T>>, RewriteError> {
        let mut call: SimplificationRuleCall<'_, T> = SimplificationRuleCall::new(
            rule.name(),
            Rc::clone(root),
            Rc::clone(current),
            bindings,
            self.environment,
            &self.constraints,
            (),
        );
        rule.on_match(&mut call)?;
        let (results, constraint, re_explore) = call.into_parts();
        let Some(node) = reconcile(rule.name(), results)? else {
            return Ok(None);
        };
        attach_constraint(&mut self.constraints, current, &node, constraint);
        Ok(Some(Yielded { node, re_explore }))
    }

    fn carry_constraint(&mut self, original: &Rc<T>, rebuilt: &Rc<T>) {
        if let Some(constraint) = self.constraints.get(original).cloned() {
            self.constraints.insert(Rc::clone(rebuilt), constraint);
        }
    }

    fn constraints(&self) -> &IdentityMap<T, QueryPlanConstraint> {
        &self.constraints
    }
}

struct ComputationCalls<'a, T, A, R> {
    environment: Environment<'a>,
    argument: &'a A,
    constraints: IdentityMap<T, QueryPlanConstraint>,
    results: IdentityMap<T, R>,
}

impl<'a, T: TreeLike, A, R> RuleCallCreator<T> for ComputationCalls<'a, T, A, R> {
    type Rule = dyn ComputationRule<T, A, R>;

    fn run(
        &mut self,
        rule: &Self::Rule,
        root: &Rc<T>,
        current: &Rc<T>,
        bindings: Bindings<T>,
    ) -> Result<Option<Yielded<T>>, RewriteError> {
        let mut call: ComputationRuleCall<'_, T, A, R> = ComputationRuleCall::new_computation(
            rule.name(),
            Rc::clone(root),
            Rc::clone(current),
            bindings,
            self.environment,
            &self.constraints,
            self.argument,
            &self.results,
        );
        rule.on_match(&mut call)?;
        let (results, constraint, re_explore) = call.into_parts();
        let Some((node, result)) = reconcile(rule.name(), results)? else {
            return Ok(None);
        };
        attach_constraint(&mut self.constraints, current, &node, constraint);
        self.results.insert(Rc::clone(&node), result);
        Ok(Some(Yielded { node, re_explore }))
    }

    fn carry_constraint(&mut self, original: &Rc<T>, rebuilt: &Rc<T>) {
        if let Some(constraint) = self.constraints.get(original).cloned() {
            self.constraints.insert(Rc::clone(rebuilt), constraint);
        }
    }

    fn constraints(&self) -> &IdentityMap<T, QueryPlanConstraint> {
        &self.constraints
    }
}

/// Records the constraint of `node`, which replaces `current`: whatever the rule
/// attached, together with the constraints `current` and `node` were already
/// produced under.
fn attach_constraint<T>(
    constraints: &mut IdentityMap<T, QueryPlanConstraint>,
    current: &Rc<T>,
    node: &Rc<T>,
    constraint: QueryPlanConstraint,
) {
    let mut constraint = constraint;
    for previous in [current, node] {
        if let Some(previous) = constraints.get(previous) {
            constraint = previous.compose(&constraint);
        }
    }
    constraints.insert(Rc::clone(node), constraint);
}

/// Drives `current` to a fixpoint of `rule_set`.
///
/// Rules are tried in order against every match. As soon as a rule replaces the
/// node, scanning restarts from the first rule on the replacement, unless the rule
/// asked for re-exploration, in which case the replacement is returned right away.
fn execute_rule_set_iteratively<T, C>(
    root: &Rc<T>,
    current: Rc<T>,
    rule_set: &RuleSet<T, C::Rule>,
    calls: &mut C,
) -> Result<ExecutionResult<T>, RewriteError>
where
    T: TreeLike,
    C: RuleCallCreator<T>,
{
    let is_root = Rc::ptr_eq(root, &current);
    let mut current = current;
    'restart: loop {
        let call_root = if is_root { Rc::clone(&current) } else { Rc::clone(root) };
        for rule in rule_set.rules(current.operator()) {
            for bindings in rule.matcher().bind_matches(&Bindings::new(), &current) {
                let Some(yielded) = calls.run(rule, &call_root, &current, bindings)? else {
                    continue;
                };
                if Rc::ptr_eq(&yielded.node, &current) {
                    continue;
                }
                trace!(
                    rule = rule.name(),
                    re_explore = yielded.re_explore,
                    "rule applied"
                );
                current = yielded.node;
                if yielded.re_explore {
                    return Ok(ExecutionResult {
                        node: current,
                        re_explored_by: Some(rule.name()),
                    });
                }
                continue 'restart;
            }
        }
        return Ok(ExecutionResult {
            node: current,
            re_explored_by: None,
        });
    }
}

/// Applies every rule of `rule_set` once to every match of `current`, returning the
/// replacements that differ from `current`.
///
/// Every rule call gets its own bookkeeping from `new_calls`, so an alternative
/// carries only the constraint it was derived under.
fn execute_rule_set<T, C>(
    current: &Rc<T>,
    rule_set: &RuleSet<T, C::Rule>,
    mut new_calls: impl FnMut() -> C,
) -> Result<Vec<Constrained<Rc<T>>>, RewriteError>
where
    T: TreeLike,
    C: RuleCallCreator<T>,
{
    let mut results = Vec::new();
    for rule in rule_set.rules(current.operator()) {
        for bindings in rule.matcher().bind_matches(&Bindings::new(), current) {
            let mut calls = new_calls();
            let Some(yielded) = calls.run(rule, current, current, bindings)? else {
                continue;
            };
            if Rc::ptr_eq(&yielded.node, current) {
                continue;
            }
            trace!(
                rule = rule.name(),
                re_explore = yielded.re_explore,
                "rule produced an alternative"
            );
            let constraint = collect_and_compose_constraints(&yielded.node, calls.constraints());
            results.push(Constrained::new(yielded.node, constraint));
        }
    }
    Ok(results)
}

/// The state of one [`optimize_with_config`] call.
struct ReExploration<'r, T: TreeLike, C: RuleCallCreator<T>> {
    rule_set: &'r RuleSet<T, C::Rule>,
    calls: C,
    recursion_guard: RecursionGuard,
    max_re_explorations: usize,
}

impl<'r, T: TreeLike, C: RuleCallCreator<T>> CheckedRecursion for ReExploration<'r, T, C> {
    fn recursion_guard(&self) -> &RecursionGuard {
        &self.recursion_guard
    }
}

impl<'r, T: TreeLike, C: RuleCallCreator<T>> ReExploration<'r, T, C> {
    /// Rewrites the children of `current`, then `current` itself, and starts over
    /// for as long as the rewrite of `current` asks for re-exploration.
    fn simplify_with_re_exploration(
        &mut self,
        root: &Rc<T>,
        current: Rc<T>,
    ) -> Result<Rc<T>, RewriteError> {
        self.checked_recur_mut(move |this| {
            let is_root = Rc::ptr_eq(root, &current);
            let mut current = current;
            let mut re_explorations = 0;
            loop {
                let child_root = if is_root { Rc::clone(&current) } else { Rc::clone(root) };
                let mut simplified_children = Vec::with_capacity(current.children().len());
                for child in current.children() {
                    simplified_children
                        .push(this.simplify_with_re_exploration(&child_root, Rc::clone(child))?);
                }
                let rebuilt = compute_current(&current, &simplified_children)?;
                if !Rc::ptr_eq(&rebuilt, &current) {
                    this.calls.carry_constraint(&current, &rebuilt);
                }
                current = rebuilt;

                let call_root = if is_root { Rc::clone(&current) } else { Rc::clone(root) };
                let result = execute_rule_set_iteratively(
                    &call_root,
                    Rc::clone(&current),
                    this.rule_set,
                    &mut this.calls,
                )?;
                let Some(rule) = result.re_explored_by else {
                    return Ok(result.node);
                };
                debug_assert!(
                    !Rc::ptr_eq(&result.node, &current),
                    "only replacements of the current node are re-explored"
                );
                re_explorations += 1;
                if re_explorations > this.max_re_explorations {
                    return Err(RewriteError::ReExplorationLimit {
                        limit: this.max_re_explorations,
                    });
                }
                debug!(rule, re_explorations, "exploring rewritten node again");
                current = result.node;
            }
        })
    }
}

/// Composes the constraints attached to the nodes of the tree rooted at `root`.
fn collect_and_compose_constraints<T: TreeLike>(
    root: &Rc<T>,
    constraints: &IdentityMap<T, QueryPlanConstraint>,
) -> QueryPlanConstraint {
    post_order(root)
        .iter()
        .filter_map(|node| constraints.get(node))
        .filter(|constraint| constraint.is_constrained())
        .fold(QueryPlanConstraint::no_constraint(), |composed, constraint| {
            composed.compose(constraint)
        })
}
