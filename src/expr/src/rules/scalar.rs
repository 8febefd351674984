// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Rules over [`ScalarExpr`].

use std::rc::Rc;

use rq_rewrite::matcher::{filter, operator, FilterMatcher, OperatorMatcher};
use rq_rewrite::{
    Condition, Matcher, PlannerRule, QueryPlanConstraint, RewriteError, SimplificationRule,
    SimplificationRuleCall, TreeLike,
};

use crate::rules::carry_constraints;
use crate::scalar::{ScalarExpr, ScalarFunc, ScalarOperator};

/// Replaces a parameter that is constant for the execution with its value, under
/// the constraint that the parameter keeps that value.
#[derive(Debug)]
pub struct InlineConstantParameter {
    matcher: OperatorMatcher<ScalarExpr>,
}

impl InlineConstantParameter {
    /// Creates the rule.
    pub fn new() -> Self {
        InlineConstantParameter {
            matcher: operator::<ScalarExpr>(ScalarOperator::Parameter),
        }
    }
}

impl Default for InlineConstantParameter {
    fn default() -> Self {
        Self::new()
    }
}

impl PlannerRule<ScalarExpr> for InlineConstantParameter {
    fn name(&self) -> &'static str {
        "InlineConstantParameter"
    }

    fn matcher(&self) -> &dyn Matcher<ScalarExpr> {
        &self.matcher
    }

    fn root_operator(&self) -> Option<ScalarOperator> {
        Some(ScalarOperator::Parameter)
    }
}

impl SimplificationRule<ScalarExpr> for InlineConstantParameter {
    fn on_match(
        &self,
        call: &mut SimplificationRuleCall<'_, ScalarExpr>,
    ) -> Result<(), RewriteError> {
        let current = Rc::clone(call.current());
        let ScalarExpr::Parameter(parameter) = &*current else {
            return Ok(());
        };
        if !call.constant_aliases().contains(parameter) {
            return Ok(());
        }
        let Some(value) = call.evaluation_context().parameter(parameter) else {
            return Ok(());
        };
        let condition = if value.is_null() {
            Condition::IsNull(parameter.clone())
        } else {
            Condition::Equals(parameter.clone(), value.clone())
        };
        let literal = ScalarExpr::literal(value.clone());
        call.yield_result_with_constraint(literal, &QueryPlanConstraint::of(condition));
        Ok(())
    }
}

/// `(field i (record a0 .. an))` => `ai`
#[derive(Debug)]
pub struct ComposeFieldOverRecord {
    matcher: OperatorMatcher<ScalarExpr>,
}

impl ComposeFieldOverRecord {
    /// Creates the rule.
    pub fn new() -> Self {
        ComposeFieldOverRecord {
            matcher: operator::<ScalarExpr>(ScalarOperator::Field).exactly(vec![Box::new(
                operator::<ScalarExpr>(ScalarOperator::Record).bound("record"),
            )]),
        }
    }
}

impl Default for ComposeFieldOverRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl PlannerRule<ScalarExpr> for ComposeFieldOverRecord {
    fn name(&self) -> &'static str {
        "ComposeFieldOverRecord"
    }

    fn matcher(&self) -> &dyn Matcher<ScalarExpr> {
        &self.matcher
    }

    fn root_operator(&self) -> Option<ScalarOperator> {
        Some(ScalarOperator::Field)
    }
}

impl SimplificationRule<ScalarExpr> for ComposeFieldOverRecord {
    fn on_match(
        &self,
        call: &mut SimplificationRuleCall<'_, ScalarExpr>,
    ) -> Result<(), RewriteError> {
        let ScalarExpr::Call {
            func: ScalarFunc::Field(position),
            ..
        } = &**call.current()
        else {
            return Ok(());
        };
        let position = *position;
        let record = Rc::clone(call.get("record")?);
        let Some(field) = record.children().get(position).map(Rc::clone) else {
            return Ok(());
        };
        carry_constraints(call, &[&record]);
        call.yield_result(field);
        Ok(())
    }
}

/// Evaluates a unary function over a constant.
#[derive(Debug)]
pub struct FoldUnaryLiteral {
    matcher: FilterMatcher<ScalarExpr>,
}

impl FoldUnaryLiteral {
    /// Creates the rule.
    pub fn new() -> Self {
        FoldUnaryLiteral {
            matcher: filter("unary function over a constant", |expr: &ScalarExpr| {
                matches!(
                    expr,
                    ScalarExpr::Call { func: ScalarFunc::Neg | ScalarFunc::Abs, args }
                        if args.len() == 1 && args[0].is_literal()
                )
            }),
        }
    }
}

impl Default for FoldUnaryLiteral {
    fn default() -> Self {
        Self::new()
    }
}

impl PlannerRule<ScalarExpr> for FoldUnaryLiteral {
    fn name(&self) -> &'static str {
        "FoldUnaryLiteral"
    }

    fn matcher(&self) -> &dyn Matcher<ScalarExpr> {
        &self.matcher
    }
}

impl SimplificationRule<ScalarExpr> for FoldUnaryLiteral {
    fn on_match(
        &self,
        call: &mut SimplificationRuleCall<'_, ScalarExpr>,
    ) -> Result<(), RewriteError> {
        let current = Rc::clone(call.current());
        let ScalarExpr::Call { func, args } = &*current else {
            return Ok(());
        };
        let [input] = &args[..] else {
            return Ok(());
        };
        let Some(value) = input.as_literal().and_then(|value| func.eval_unary(value)) else {
            return Ok(());
        };
        carry_constraints(call, &[input]);
        call.yield_result(ScalarExpr::literal(value));
        Ok(())
    }
}

/// Evaluates a binary function over two constants.
#[derive(Debug)]
pub struct FoldBinaryLiterals {
    matcher: FilterMatcher<ScalarExpr>,
}

impl FoldBinaryLiterals {
    /// The name the rule reports.
    pub const NAME: &'static str = "FoldBinaryLiterals";

    /// Creates the rule.
    pub fn new() -> Self {
        FoldBinaryLiterals {
            matcher: filter("arithmetic over constants", |expr: &ScalarExpr| {
                is_arithmetic(expr) && expr.children().iter().all(|arg| arg.is_literal())
            }),
        }
    }
}

impl Default for FoldBinaryLiterals {
    fn default() -> Self {
        Self::new()
    }
}

impl PlannerRule<ScalarExpr> for FoldBinaryLiterals {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn matcher(&self) -> &dyn Matcher<ScalarExpr> {
        &self.matcher
    }
}

impl SimplificationRule<ScalarExpr> for FoldBinaryLiterals {
    fn on_match(
        &self,
        call: &mut SimplificationRuleCall<'_, ScalarExpr>,
    ) -> Result<(), RewriteError> {
        let current = Rc::clone(call.current());
        let ScalarExpr::Call { func, args } = &*current else {
            return Ok(());
        };
        let [left, right] = &args[..] else {
            return Ok(());
        };
        let (Some(l), Some(r)) = (left.as_literal(), right.as_literal()) else {
            return Ok(());
        };
        let Some(value) = func.eval_binary(l, r) else {
            return Ok(());
        };
        carry_constraints(call, &[left, right]);
        call.yield_result(ScalarExpr::literal(value));
        Ok(())
    }
}

/// `(+ x 0)`, `(+ 0 x)`, `(- x 0)`, `(* x 1)` and `(* 1 x)` => `x`
#[derive(Debug)]
pub struct EliminateArithmeticIdentity {
    matcher: FilterMatcher<ScalarExpr>,
}

impl EliminateArithmeticIdentity {
    /// Creates the rule.
    pub fn new() -> Self {
        EliminateArithmeticIdentity {
            matcher: filter("arithmetic", is_arithmetic),
        }
    }
}

impl Default for EliminateArithmeticIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl PlannerRule<ScalarExpr> for EliminateArithmeticIdentity {
    fn name(&self) -> &'static str {
        "EliminateArithmeticIdentity"
    }

    fn matcher(&self) -> &dyn Matcher<ScalarExpr> {
        &self.matcher
    }
}

impl SimplificationRule<ScalarExpr> for EliminateArithmeticIdentity {
    fn on_match(
        &self,
        call: &mut SimplificationRuleCall<'_, ScalarExpr>,
    ) -> Result<(), RewriteError> {
        let current = Rc::clone(call.current());
        let ScalarExpr::Call { func, args } = &*current else {
            return Ok(());
        };
        let (kept, dropped) = match (func, &args[..]) {
            (ScalarFunc::Add, [left, right]) if right.is_int(0) => (left, right),
            (ScalarFunc::Add, [left, right]) if left.is_int(0) => (right, left),
            (ScalarFunc::Sub, [left, right]) if right.is_int(0) => (left, right),
            (ScalarFunc::Mul, [left, right]) if right.is_int(1) => (left, right),
            (ScalarFunc::Mul, [left, right]) if left.is_int(1) => (right, left),
            _ => return Ok(()),
        };
        carry_constraints(call, &[dropped]);
        call.yield_result(Rc::clone(kept));
        Ok(())
    }
}

fn is_arithmetic(expr: &ScalarExpr) -> bool {
    matches!(
        expr,
        ScalarExpr::Call {
            func: ScalarFunc::Add | ScalarFunc::Sub | ScalarFunc::Mul,
            args,
        } if args.len() == 2
    )
}
