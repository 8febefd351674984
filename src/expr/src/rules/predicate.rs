// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Rules over [`Predicate`].

use std::rc::Rc;

use rq_rewrite::matcher::{any_bound, filter, operator, FilterMatcher, OperatorMatcher};
use rq_rewrite::{
    simplify, Condition, Matcher, PlannerRule, QueryPlanConstraint, RewriteError,
    SimplificationRule, SimplificationRuleCall, SimplificationRuleSet, TreeLike,
};

use crate::predicate::{Predicate, PredicateOperator, Truth};
use crate::rules::carry_constraints;
use crate::scalar::ScalarExpr;

/// Decides a null test over a parameter that is constant for the execution, under
/// the constraint that the parameter keeps its nullness.
#[derive(Debug)]
pub struct ConstantParameterNullTest {
    matcher: OperatorMatcher<Predicate>,
}

impl ConstantParameterNullTest {
    /// Creates the rule.
    pub fn new() -> Self {
        ConstantParameterNullTest {
            matcher: operator::<Predicate>(PredicateOperator::IsNull),
        }
    }
}

impl Default for ConstantParameterNullTest {
    fn default() -> Self {
        Self::new()
    }
}

impl PlannerRule<Predicate> for ConstantParameterNullTest {
    fn name(&self) -> &'static str {
        "ConstantParameterNullTest"
    }

    fn matcher(&self) -> &dyn Matcher<Predicate> {
        &self.matcher
    }

    fn root_operator(&self) -> Option<PredicateOperator> {
        Some(PredicateOperator::IsNull)
    }
}

impl SimplificationRule<Predicate> for ConstantParameterNullTest {
    fn on_match(&self, call: &mut SimplificationRuleCall<'_, Predicate>) -> Result<(), RewriteError> {
        let current = Rc::clone(call.current());
        let Predicate::IsNull(operand) = &*current else {
            return Ok(());
        };
        let ScalarExpr::Parameter(parameter) = &**operand else {
            return Ok(());
        };
        if !call.constant_aliases().contains(parameter) {
            return Ok(());
        }
        let Some(value) = call.evaluation_context().parameter(parameter) else {
            return Ok(());
        };
        let (truth, condition) = if value.is_null() {
            (Truth::True, Condition::IsNull(parameter.clone()))
        } else {
            (Truth::False, Condition::IsNotNull(parameter.clone()))
        };
        call.yield_result_with_constraint(
            Predicate::constant(truth),
            &QueryPlanConstraint::of(condition),
        );
        Ok(())
    }
}

/// Simplifies the scalar operands of a comparison or null test.
#[derive(Debug)]
pub struct SimplifyOperands {
    scalar_rules: SimplificationRuleSet<ScalarExpr>,
    matcher: FilterMatcher<Predicate>,
}

impl SimplifyOperands {
    /// The name the rule reports.
    pub const NAME: &'static str = "SimplifyOperands";

    /// Simplifies operands with `scalar_rules`.
    pub fn new(scalar_rules: SimplificationRuleSet<ScalarExpr>) -> Self {
        SimplifyOperands {
            scalar_rules,
            matcher: filter("comparison or null test", |predicate: &Predicate| {
                !predicate.scalars().is_empty()
            }),
        }
    }
}

impl PlannerRule<Predicate> for SimplifyOperands {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn matcher(&self) -> &dyn Matcher<Predicate> {
        &self.matcher
    }
}

impl SimplificationRule<Predicate> for SimplifyOperands {
    fn on_match(&self, call: &mut SimplificationRuleCall<'_, Predicate>) -> Result<(), RewriteError> {
        let current = Rc::clone(call.current());
        let mut changed = false;
        let mut constraint = QueryPlanConstraint::no_constraint();
        let mut simplified = Vec::new();
        for scalar in current.scalars() {
            let (scalar_simplified, scalar_constraint) = simplify(
                scalar,
                call.evaluation_context(),
                call.alias_map(),
                call.constant_aliases(),
                &self.scalar_rules,
            )?
            .into_parts();
            changed |= !Rc::ptr_eq(&scalar_simplified, scalar);
            constraint = constraint.compose(&scalar_constraint);
            simplified.push(scalar_simplified);
        }
        if changed {
            call.yield_result_with_constraint(current.with_scalars(simplified), &constraint);
        }
        Ok(())
    }
}

/// Decides a comparison of two constants.
#[derive(Debug)]
pub struct FoldConstantComparison {
    matcher: OperatorMatcher<Predicate>,
}

impl FoldConstantComparison {
    /// Creates the rule.
    pub fn new() -> Self {
        FoldConstantComparison {
            matcher: operator::<Predicate>(PredicateOperator::Compare),
        }
    }
}

impl Default for FoldConstantComparison {
    fn default() -> Self {
        Self::new()
    }
}

impl PlannerRule<Predicate> for FoldConstantComparison {
    fn name(&self) -> &'static str {
        "FoldConstantComparison"
    }

    fn matcher(&self) -> &dyn Matcher<Predicate> {
        &self.matcher
    }

    fn root_operator(&self) -> Option<PredicateOperator> {
        Some(PredicateOperator::Compare)
    }
}

impl SimplificationRule<Predicate> for FoldConstantComparison {
    fn on_match(&self, call: &mut SimplificationRuleCall<'_, Predicate>) -> Result<(), RewriteError> {
        let current = Rc::clone(call.current());
        let Predicate::Compare { op, left, right } = &*current else {
            return Ok(());
        };
        let (Some(left), Some(right)) = (left.as_literal(), right.as_literal()) else {
            return Ok(());
        };
        let Some(truth) = op.eval(left, right) else {
            return Ok(());
        };
        call.yield_result(Predicate::constant(truth));
        Ok(())
    }
}

/// Decides a null test of a constant.
#[derive(Debug)]
pub struct FoldConstantNullTest {
    matcher: OperatorMatcher<Predicate>,
}

impl FoldConstantNullTest {
    /// Creates the rule.
    pub fn new() -> Self {
        FoldConstantNullTest {
            matcher: operator::<Predicate>(PredicateOperator::IsNull),
        }
    }
}

impl Default for FoldConstantNullTest {
    fn default() -> Self {
        Self::new()
    }
}

impl PlannerRule<Predicate> for FoldConstantNullTest {
    fn name(&self) -> &'static str {
        "FoldConstantNullTest"
    }

    fn matcher(&self) -> &dyn Matcher<Predicate> {
        &self.matcher
    }

    fn root_operator(&self) -> Option<PredicateOperator> {
        Some(PredicateOperator::IsNull)
    }
}

impl SimplificationRule<Predicate> for FoldConstantNullTest {
    fn on_match(&self, call: &mut SimplificationRuleCall<'_, Predicate>) -> Result<(), RewriteError> {
        let current = Rc::clone(call.current());
        let Predicate::IsNull(operand) = &*current else {
            return Ok(());
        };
        let Some(value) = operand.as_literal() else {
            return Ok(());
        };
        let truth = Truth::of(value.is_null());
        call.yield_result(Predicate::constant(truth));
        Ok(())
    }
}

/// `(not c)` => `c'` for a constant `c`
#[derive(Debug)]
pub struct NotOverConstant {
    matcher: OperatorMatcher<Predicate>,
}

impl NotOverConstant {
    /// Creates the rule.
    pub fn new() -> Self {
        NotOverConstant {
            matcher: operator::<Predicate>(PredicateOperator::Not).exactly(vec![Box::new(
                operator::<Predicate>(PredicateOperator::Constant).bound("constant"),
            )]),
        }
    }
}

impl Default for NotOverConstant {
    fn default() -> Self {
        Self::new()
    }
}

impl PlannerRule<Predicate> for NotOverConstant {
    fn name(&self) -> &'static str {
        "NotOverConstant"
    }

    fn matcher(&self) -> &dyn Matcher<Predicate> {
        &self.matcher
    }

    fn root_operator(&self) -> Option<PredicateOperator> {
        Some(PredicateOperator::Not)
    }
}

impl SimplificationRule<Predicate> for NotOverConstant {
    fn on_match(&self, call: &mut SimplificationRuleCall<'_, Predicate>) -> Result<(), RewriteError> {
        let constant = Rc::clone(call.get("constant")?);
        let Some(truth) = constant.as_constant() else {
            return Ok(());
        };
        carry_constraints(call, &[&constant]);
        call.yield_result(Predicate::constant(truth.not()));
        Ok(())
    }
}

/// `(not (not p))` => `p`
#[derive(Debug)]
pub struct DoubleNegation {
    matcher: OperatorMatcher<Predicate>,
}

impl DoubleNegation {
    /// Creates the rule.
    pub fn new() -> Self {
        DoubleNegation {
            matcher: operator::<Predicate>(PredicateOperator::Not).exactly(vec![Box::new(
                operator::<Predicate>(PredicateOperator::Not)
                    .bound("inner")
                    .exactly(vec![Box::new(any_bound("operand"))]),
            )]),
        }
    }
}

impl Default for DoubleNegation {
    fn default() -> Self {
        Self::new()
    }
}

impl PlannerRule<Predicate> for DoubleNegation {
    fn name(&self) -> &'static str {
        "DoubleNegation"
    }

    fn matcher(&self) -> &dyn Matcher<Predicate> {
        &self.matcher
    }

    fn root_operator(&self) -> Option<PredicateOperator> {
        Some(PredicateOperator::Not)
    }
}

impl SimplificationRule<Predicate> for DoubleNegation {
    fn on_match(&self, call: &mut SimplificationRuleCall<'_, Predicate>) -> Result<(), RewriteError> {
        let inner = Rc::clone(call.get("inner")?);
        let operand = Rc::clone(call.get("operand")?);
        carry_constraints(call, &[&inner]);
        call.yield_result(operand);
        Ok(())
    }
}

/// `(not (op a b))` => `(op' a b)` where `op'` is the negation of `op`. Holds under
/// three-valued logic: both sides are unknown when an operand is null.
#[derive(Debug)]
pub struct NotOverComparison {
    matcher: OperatorMatcher<Predicate>,
}

impl NotOverComparison {
    /// Creates the rule.
    pub fn new() -> Self {
        NotOverComparison {
            matcher: operator::<Predicate>(PredicateOperator::Not).exactly(vec![Box::new(
                operator::<Predicate>(PredicateOperator::Compare).bound("comparison"),
            )]),
        }
    }
}

impl Default for NotOverComparison {
    fn default() -> Self {
        Self::new()
    }
}

impl PlannerRule<Predicate> for NotOverComparison {
    fn name(&self) -> &'static str {
        "NotOverComparison"
    }

    fn matcher(&self) -> &dyn Matcher<Predicate> {
        &self.matcher
    }

    fn root_operator(&self) -> Option<PredicateOperator> {
        Some(PredicateOperator::Not)
    }
}

impl SimplificationRule<Predicate> for NotOverComparison {
    fn on_match(&self, call: &mut SimplificationRuleCall<'_, Predicate>) -> Result<(), RewriteError> {
        let comparison = Rc::clone(call.get("comparison")?);
        let Predicate::Compare { op, left, right } = &*comparison else {
            return Ok(());
        };
        let negated = Predicate::compare(op.negate(), Rc::clone(left), Rc::clone(right));
        carry_constraints(call, &[&comparison]);
        call.yield_result(negated);
        Ok(())
    }
}

/// Pulls the operands of a nested conjunction into the enclosing conjunction, and
/// likewise for disjunctions.
#[derive(Debug)]
pub struct Flatten {
    name: &'static str,
    connective: PredicateOperator,
    matcher: FilterMatcher<Predicate>,
}

impl Flatten {
    /// `(and a (and b c))` => `(and a b c)`
    pub fn conjunction() -> Self {
        Flatten {
            name: "FlattenConjunction",
            connective: PredicateOperator::And,
            matcher: filter("conjunction of a conjunction", |predicate: &Predicate| {
                is_nested(predicate, PredicateOperator::And)
            }),
        }
    }

    /// `(or a (or b c))` => `(or a b c)`
    pub fn disjunction() -> Self {
        Flatten {
            name: "FlattenDisjunction",
            connective: PredicateOperator::Or,
            matcher: filter("disjunction of a disjunction", |predicate: &Predicate| {
                is_nested(predicate, PredicateOperator::Or)
            }),
        }
    }
}

impl PlannerRule<Predicate> for Flatten {
    fn name(&self) -> &'static str {
        self.name
    }

    fn matcher(&self) -> &dyn Matcher<Predicate> {
        &self.matcher
    }

    fn root_operator(&self) -> Option<PredicateOperator> {
        Some(self.connective)
    }
}

impl SimplificationRule<Predicate> for Flatten {
    fn on_match(&self, call: &mut SimplificationRuleCall<'_, Predicate>) -> Result<(), RewriteError> {
        let current = Rc::clone(call.current());
        let mut operands = Vec::new();
        for child in current.children() {
            if child.operator() == self.connective {
                carry_constraints(call, &[child]);
                operands.extend(child.children().iter().map(Rc::clone));
            } else {
                operands.push(Rc::clone(child));
            }
        }
        call.yield_result(connective(self.connective, operands));
        Ok(())
    }
}

/// Removes the identity constant of a conjunction or disjunction, and replaces it
/// with its absorbing constant if that is one of its operands. A connective with a
/// single operand is replaced by that operand, one without any by its identity.
#[derive(Debug)]
pub struct AbsorbConstants {
    matcher: FilterMatcher<Predicate>,
}

impl AbsorbConstants {
    /// Creates the rule.
    pub fn new() -> Self {
        AbsorbConstants {
            matcher: filter("conjunction or disjunction", |predicate: &Predicate| {
                matches!(predicate, Predicate::And(_) | Predicate::Or(_))
            }),
        }
    }
}

impl Default for AbsorbConstants {
    fn default() -> Self {
        Self::new()
    }
}

impl PlannerRule<Predicate> for AbsorbConstants {
    fn name(&self) -> &'static str {
        "AbsorbConstants"
    }

    fn matcher(&self) -> &dyn Matcher<Predicate> {
        &self.matcher
    }
}

impl SimplificationRule<Predicate> for AbsorbConstants {
    fn on_match(&self, call: &mut SimplificationRuleCall<'_, Predicate>) -> Result<(), RewriteError> {
        let current = Rc::clone(call.current());
        let (identity, absorbing) = match current.operator() {
            PredicateOperator::And => (Truth::True, Truth::False),
            PredicateOperator::Or => (Truth::False, Truth::True),
            _ => return Ok(()),
        };
        let children = current.children();

        if let Some(absorber) = children
            .iter()
            .find(|child| child.as_constant() == Some(absorbing))
        {
            carry_constraints(call, &[absorber]);
            call.yield_result(Rc::clone(absorber));
            return Ok(());
        }

        let (dropped, mut kept): (Vec<_>, Vec<_>) = children
            .iter()
            .partition(|child| child.as_constant() == Some(identity));
        if dropped.is_empty() && kept.len() > 1 {
            return Ok(());
        }
        carry_constraints(call, &dropped);
        let simplified = match kept.len() {
            0 => Predicate::constant(identity),
            1 => Rc::clone(kept.remove(0)),
            _ => connective(
                current.operator(),
                kept.into_iter().map(Rc::clone).collect(),
            ),
        };
        call.yield_result(simplified);
        Ok(())
    }
}

/// `(not (and a b))` => `(or (not a) (not b))`, and likewise for disjunctions.
///
/// The new negations may simplify further, so the rule asks for its result to be
/// explored again.
#[derive(Debug)]
pub struct DeMorgan {
    matcher: OperatorMatcher<Predicate>,
}

impl DeMorgan {
    /// Creates the rule.
    pub fn new() -> Self {
        DeMorgan {
            matcher: operator::<Predicate>(PredicateOperator::Not).exactly(vec![Box::new(
                filter("conjunction or disjunction", |predicate: &Predicate| {
                    matches!(predicate, Predicate::And(_) | Predicate::Or(_))
                })
                .bound("connective"),
            )]),
        }
    }
}

impl Default for DeMorgan {
    fn default() -> Self {
        Self::new()
    }
}

impl PlannerRule<Predicate> for DeMorgan {
    fn name(&self) -> &'static str {
        "DeMorgan"
    }

    fn matcher(&self) -> &dyn Matcher<Predicate> {
        &self.matcher
    }

    fn root_operator(&self) -> Option<PredicateOperator> {
        Some(PredicateOperator::Not)
    }
}

impl SimplificationRule<Predicate> for DeMorgan {
    fn on_match(&self, call: &mut SimplificationRuleCall<'_, Predicate>) -> Result<(), RewriteError> {
        let inner = Rc::clone(call.get("connective")?);
        let dual = match inner.operator() {
            PredicateOperator::And => PredicateOperator::Or,
            PredicateOperator::Or => PredicateOperator::And,
            _ => return Ok(()),
        };
        let negated = inner
            .children()
            .iter()
            .map(|child| Predicate::not(Rc::clone(child)))
            .collect();
        carry_constraints(call, &[&inner]);
        call.yield_and_re_explore(connective(dual, negated));
        Ok(())
    }
}

fn is_nested(predicate: &Predicate, connective: PredicateOperator) -> bool {
    predicate.operator() == connective
        && predicate
            .children()
            .iter()
            .any(|child| child.operator() == connective)
}

fn connective(operator: PredicateOperator, operands: Vec<Rc<Predicate>>) -> Rc<Predicate> {
    match operator {
        PredicateOperator::Or => Predicate::or(operands),
        _ => Predicate::and(operands),
    }
}
