// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The context handed to a rule when it fires.

use std::fmt;
use std::rc::Rc;

use crate::constraint::QueryPlanConstraint;
use crate::correlation::{AliasMap, CorrelationSet};
use crate::eval::EvaluationContext;
use crate::identity::IdentityMap;
use crate::matcher::Bindings;
use crate::tree::TreeLike;
use crate::RewriteError;

/// The environment a rewrite runs in. The driver forwards it to every rule call
/// without looking at it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Environment<'a> {
    pub evaluation_context: &'a EvaluationContext,
    pub alias_map: &'a AliasMap,
    pub constant_aliases: &'a CorrelationSet,
}

/// One invocation of a rule on one match.
///
/// `Y` is the type of the results the rule yields and `X` holds whatever else a
/// particular kind of call carries. The call owns the results until the driver
/// collects them after the rule returns.
pub struct RuleCall<'a, T: TreeLike, Y, X = ()> {
    rule: &'static str,
    root: Rc<T>,
    current: Rc<T>,
    bindings: Bindings<T>,
    environment: Environment<'a>,
    constraints: &'a IdentityMap<T, QueryPlanConstraint>,
    extra: X,
    results: Vec<Y>,
    result_constraint: QueryPlanConstraint,
    re_explore: bool,
}

/// A call of a [`SimplificationRule`](crate::rule::SimplificationRule).
pub type SimplificationRuleCall<'a, T> = RuleCall<'a, T, Rc<T>>;

/// A call of a [`ComputationRule`](crate::rule::ComputationRule).
pub type ComputationRuleCall<'a, T, A, R> =
    RuleCall<'a, T, (Rc<T>, R), ComputationExtra<'a, T, A, R>>;

/// What a computation call carries in addition to a simplification call.
pub struct ComputationExtra<'a, T, A, R> {
    argument: &'a A,
    results: &'a IdentityMap<T, R>,
}

impl<'a, T, A, R> fmt::Debug for ComputationExtra<'a, T, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputationExtra")
            .field("results", &self.results.len())
            .finish_non_exhaustive()
    }
}

impl<'a, T: TreeLike, Y, X> RuleCall<'a, T, Y, X> {
    pub(crate) fn new(
        rule: &'static str,
        root: Rc<T>,
        current: Rc<T>,
        bindings: Bindings<T>,
        environment: Environment<'a>,
        constraints: &'a IdentityMap<T, QueryPlanConstraint>,
        extra: X,
    ) -> Self {
        RuleCall {
            rule,
            root,
            current,
            bindings,
            environment,
            constraints,
            extra,
            results: Vec::new(),
            result_constraint: QueryPlanConstraint::no_constraint(),
            re_explore: false,
        }
    }

    /// The name of the rule being called.
    pub fn rule(&self) -> &'static str {
        self.rule
    }

    /// The outermost node of the current rewrite.
    pub fn root(&self) -> &Rc<T> {
        &self.root
    }

    /// The node being rewritten.
    pub fn current(&self) -> &Rc<T> {
        &self.current
    }

    /// Whether the node being rewritten is the outermost node.
    pub fn is_root(&self) -> bool {
        Rc::ptr_eq(&self.root, &self.current)
    }

    /// The bindings of the match this call is for.
    pub fn bindings(&self) -> &Bindings<T> {
        &self.bindings
    }

    /// The node bound under `key`.
    ///
    /// Fails if the rule's matcher does not bind `key`.
    pub fn get(&self, key: &'static str) -> Result<&Rc<T>, RewriteError> {
        self.bindings
            .get(key)
            .ok_or(RewriteError::MissingBinding {
                rule: self.rule,
                key,
            })
    }

    /// The evaluation context of the rewrite.
    pub fn evaluation_context(&self) -> &'a EvaluationContext {
        self.environment.evaluation_context
    }

    /// The alias equalities of the rewrite.
    pub fn alias_map(&self) -> &'a AliasMap {
        self.environment.alias_map
    }

    /// The aliases that are constant for the duration of one execution.
    pub fn constant_aliases(&self) -> &'a CorrelationSet {
        self.environment.constant_aliases
    }

    /// The constraint attached to `node` when an earlier rule produced it.
    pub fn constraint(&self, node: &Rc<T>) -> Option<&'a QueryPlanConstraint> {
        self.constraints.get(node)
    }

    /// Adds `constraint` to the constraint of whatever this call yields.
    pub fn compose_additional_constraint(&mut self, constraint: &QueryPlanConstraint) {
        self.result_constraint = self.result_constraint.compose(constraint);
    }

    /// The results yielded so far.
    pub fn results(&self) -> &[Y] {
        &self.results
    }

    /// The constraint under which the yielded results are valid.
    pub fn result_constraint(&self) -> &QueryPlanConstraint {
        &self.result_constraint
    }

    /// Whether a yield asked for its result to be explored again.
    pub fn should_re_explore(&self) -> bool {
        self.re_explore
    }

    /// Builds an error reporting that this rule failed.
    pub fn error(&self, message: impl Into<String>) -> RewriteError {
        RewriteError::Rule {
            rule: self.rule,
            message: message.into(),
        }
    }

    pub(crate) fn request_re_exploration(&mut self) {
        self.re_explore = true;
    }

    pub(crate) fn into_parts(self) -> (Vec<Y>, QueryPlanConstraint, bool) {
        (self.results, self.result_constraint, self.re_explore)
    }
}

impl<'a, T: TreeLike> RuleCall<'a, T, Rc<T>> {
    /// Yields `node` as the replacement of the current node.
    pub fn yield_result(&mut self, node: Rc<T>) {
        self.results.push(node);
    }

    /// Yields `node`, valid only under `constraint`.
    pub fn yield_result_with_constraint(&mut self, node: Rc<T>, constraint: &QueryPlanConstraint) {
        self.compose_additional_constraint(constraint);
        self.results.push(node);
    }

    /// Yields `node` and asks for it to be explored again, children included.
    ///
    /// Only [`optimize`](crate::simplification::optimize) honors the request.
    /// [`simplify`](crate::simplification::simplify) and
    /// [`compute`](crate::simplification::compute) fail when a rule makes it.
    pub fn yield_and_re_explore(&mut self, node: Rc<T>) {
        self.re_explore = true;
        self.results.push(node);
    }
}

impl<'a, T: TreeLike, A, R> RuleCall<'a, T, (Rc<T>, R), ComputationExtra<'a, T, A, R>> {
    pub(crate) fn new_computation(
        rule: &'static str,
        root: Rc<T>,
        current: Rc<T>,
        bindings: Bindings<T>,
        environment: Environment<'a>,
        constraints: &'a IdentityMap<T, QueryPlanConstraint>,
        argument: &'a A,
        results: &'a IdentityMap<T, R>,
    ) -> Self {
        Self::new(
            rule,
            root,
            current,
            bindings,
            environment,
            constraints,
            ComputationExtra { argument, results },
        )
    }

    /// The argument supplied by the caller of [`compute`](crate::simplification::compute).
    pub fn argument(&self) -> &'a A {
        self.extra.argument
    }

    /// The result attached to `node` when an earlier rule produced it.
    pub fn result(&self, node: &Rc<T>) -> Option<&'a R> {
        self.extra.results.get(node)
    }

    /// Yields `node` as the replacement of the current node, with `result` attached.
    pub fn yield_result(&mut self, node: Rc<T>, result: R) {
        self.results.push((node, result));
    }

    /// Yields `node` with `result` attached, valid only under `constraint`.
    pub fn yield_result_with_constraint(
        &mut self,
        node: Rc<T>,
        result: R,
        constraint: &QueryPlanConstraint,
    ) {
        self.compose_additional_constraint(constraint);
        self.results.push((node, result));
    }

    /// A simplification call for the same match, environment and constraints.
    pub fn to_simplification_call(&self) -> SimplificationRuleCall<'a, T> {
        RuleCall::new(
            self.rule,
            Rc::clone(&self.root),
            Rc::clone(&self.current),
            self.bindings.clone(),
            self.environment,
            self.constraints,
            (),
        )
    }
}

impl<'a, T: TreeLike, Y, X> fmt::Debug for RuleCall<'a, T, Y, X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleCall")
            .field("rule", &self.rule)
            .field("current", &self.current)
            .field("bindings", &self.bindings)
            .field("results", &self.results.len())
            .field("result_constraint", &self.result_constraint)
            .field("re_explore", &self.re_explore)
            .finish()
    }
}
