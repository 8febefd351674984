// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The default rule sets.
//!
//! Rules that replace a node by something built from its descendants compose the
//! constraints those descendants were produced under, so that inlining a constant
//! parameter deep in a tree stays visible after the constant has been folded away.

use std::rc::Rc;

use rq_rewrite::{RewriteError, SimplificationRuleCall, SimplificationRuleSet, TreeLike};

use crate::predicate::Predicate;
use crate::scalar::ScalarExpr;

pub mod predicate;
pub mod scalar;

/// Simplifications of scalar expressions.
pub fn default_scalar_rules() -> Result<SimplificationRuleSet<ScalarExpr>, RewriteError> {
    SimplificationRuleSet::<ScalarExpr>::builder()
        .add(Box::new(scalar::InlineConstantParameter::new()))
        .add(Box::new(scalar::ComposeFieldOverRecord::new()))
        .add(Box::new(scalar::FoldUnaryLiteral::new()))
        .add(Box::new(scalar::FoldBinaryLiterals::new()))
        .add_after(
            Box::new(scalar::EliminateArithmeticIdentity::new()),
            &[scalar::FoldBinaryLiterals::NAME],
        )
        .build()
}

/// Simplifications of predicates. The operands of comparisons and null tests are
/// simplified with [`default_scalar_rules`].
pub fn default_predicate_rules() -> Result<SimplificationRuleSet<Predicate>, RewriteError> {
    predicate_rules(false)
}

/// [`default_predicate_rules`] plus rules that push negations down through
/// conjunctions and disjunctions. Some of them ask for re-exploration, so the
/// rule set must be run with [`optimize`](rq_rewrite::optimize).
pub fn normalization_predicate_rules() -> Result<SimplificationRuleSet<Predicate>, RewriteError> {
    predicate_rules(true)
}

fn predicate_rules(normalize: bool) -> Result<SimplificationRuleSet<Predicate>, RewriteError> {
    let mut builder = SimplificationRuleSet::<Predicate>::builder()
        .add(Box::new(predicate::ConstantParameterNullTest::new()))
        .add(Box::new(predicate::SimplifyOperands::new(
            default_scalar_rules()?,
        )))
        .add_after(
            Box::new(predicate::FoldConstantComparison::new()),
            &[predicate::SimplifyOperands::NAME],
        )
        .add(Box::new(predicate::FoldConstantNullTest::new()))
        .add(Box::new(predicate::NotOverConstant::new()))
        .add(Box::new(predicate::DoubleNegation::new()))
        .add(Box::new(predicate::NotOverComparison::new()))
        .add(Box::new(predicate::Flatten::conjunction()))
        .add(Box::new(predicate::Flatten::disjunction()))
        .add(Box::new(predicate::AbsorbConstants::new()));
    if normalize {
        builder = builder.add(Box::new(predicate::DeMorgan::new()));
    }
    builder.build()
}

/// Composes the constraints `nodes` were produced under into whatever `call` yields.
fn carry_constraints<T: TreeLike>(call: &mut SimplificationRuleCall<'_, T>, nodes: &[&Rc<T>]) {
    for node in nodes {
        if let Some(constraint) = call.constraint(node) {
            call.compose_additional_constraint(constraint);
        }
    }
}

#[cfg(test)]
mod tests {
    use rq_rewrite::{simplify, AliasMap, CorrelationSet, EvaluationContext, PlannerRule};

    use super::*;
    use crate::parse::parse_scalar;

    #[rq_ore::test]
    fn default_rules_are_the_constructed_rules() {
        let names = [
            (
                scalar::FoldUnaryLiteral::default().name(),
                scalar::FoldUnaryLiteral::new().name(),
            ),
            (
                predicate::DeMorgan::default().name(),
                predicate::DeMorgan::new().name(),
            ),
            (
                predicate::AbsorbConstants::default().name(),
                predicate::AbsorbConstants::new().name(),
            ),
        ];
        for (default, new) in names {
            assert_eq!(default, new);
        }

        let rules = SimplificationRuleSet::<ScalarExpr>::builder()
            .add(Box::<scalar::FoldBinaryLiterals>::default())
            .add(Box::<scalar::EliminateArithmeticIdentity>::default())
            .build()
            .unwrap();
        let expr = parse_scalar("(+ (* 2 3) 0)").unwrap();
        let simplified = simplify(
            &expr,
            &EvaluationContext::empty(),
            &AliasMap::empty(),
            &CorrelationSet::new(),
            &rules,
        )
        .unwrap();
        assert_eq!(simplified.value().to_string(), "6");
    }
}
