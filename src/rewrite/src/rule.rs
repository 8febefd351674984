// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Rewrite rules.
//!
//! A rule pairs a [`Matcher`] with an action. The driver calls the action once per
//! match, handing it a rule call through which the rule inspects the match and
//! yields replacements. Rules never modify the nodes they observe.

use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::call::{ComputationRuleCall, SimplificationRuleCall};
use crate::matcher::Matcher;
use crate::tree::TreeLike;
use crate::RewriteError;

/// The parts of a rule the driver needs to decide whether and where it applies.
pub trait PlannerRule<T: TreeLike>: fmt::Debug {
    /// A name identifying the rule within its rule set.
    fn name(&self) -> &'static str;

    /// The pattern the rule applies to.
    fn matcher(&self) -> &dyn Matcher<T>;

    /// The operator every node matched by [`PlannerRule::matcher`] has, if there is one.
    ///
    /// Rule sets skip the rule for nodes of other operators without running the matcher.
    fn root_operator(&self) -> Option<T::Operator> {
        None
    }
}

/// A rule that replaces a node with an equivalent one.
pub trait SimplificationRule<T: TreeLike>: PlannerRule<T> {
    /// Runs the rule for one match.
    ///
    /// The rule yields at most one replacement through `call`. Yielding nothing, or
    /// yielding the current node itself, means the rule did not apply.
    fn on_match(&self, call: &mut SimplificationRuleCall<'_, T>) -> Result<(), RewriteError>;
}

/// A rule that replaces a node with an equivalent one and attaches a result of type
/// `R` to the replacement, given a caller supplied argument of type `A`.
pub trait ComputationRule<T: TreeLike, A, R>: PlannerRule<T> {
    /// Runs the rule for one match.
    fn on_match(&self, call: &mut ComputationRuleCall<'_, T, A, R>) -> Result<(), RewriteError>;
}

/// A computation rule that runs a simplification rule and computes its result with
/// a function. See [`from_simplification_rule`].
pub struct FromSimplificationRule<T, S, F> {
    rule: S,
    compute: F,
    phantom: PhantomData<fn() -> T>,
}

/// Adapts `rule` into a computation rule.
///
/// Every node `rule` yields is yielded again, paired with
/// `compute(argument, node, children_results)`, where `children_results` holds the
/// results previously attached to each child of the current node.
pub fn from_simplification_rule<T, A, R, S, F>(rule: S, compute: F) -> FromSimplificationRule<T, S, F>
where
    T: TreeLike,
    S: SimplificationRule<T>,
    F: Fn(&A, &Rc<T>, &[Option<&R>]) -> R,
{
    FromSimplificationRule {
        rule,
        compute,
        phantom: PhantomData,
    }
}

impl<T, S: fmt::Debug, F> fmt::Debug for FromSimplificationRule<T, S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FromSimplificationRule")
            .field("rule", &self.rule)
            .finish()
    }
}

impl<T, S, F> PlannerRule<T> for FromSimplificationRule<T, S, F>
where
    T: TreeLike,
    S: SimplificationRule<T>,
{
    fn name(&self) -> &'static str {
        self.rule.name()
    }

    fn matcher(&self) -> &dyn Matcher<T> {
        self.rule.matcher()
    }

    fn root_operator(&self) -> Option<T::Operator> {
        self.rule.root_operator()
    }
}

impl<T, A, R, S, F> ComputationRule<T, A, R> for FromSimplificationRule<T, S, F>
where
    T: TreeLike,
    S: SimplificationRule<T>,
    F: Fn(&A, &Rc<T>, &[Option<&R>]) -> R,
{
    fn on_match(&self, call: &mut ComputationRuleCall<'_, T, A, R>) -> Result<(), RewriteError> {
        let children_results: Vec<Option<&R>> = call
            .current()
            .children()
            .iter()
            .map(|child| call.result(child))
            .collect();
        let mut simplification_call = call.to_simplification_call();
        self.rule.on_match(&mut simplification_call)?;
        let (nodes, constraint, re_explore) = simplification_call.into_parts();
        for node in nodes {
            let result = (self.compute)(call.argument(), &node, &children_results);
            call.yield_result(node, result);
        }
        call.compose_additional_constraint(&constraint);
        if re_explore {
            call.request_re_exploration();
        }
        Ok(())
    }
}
