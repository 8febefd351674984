// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Scalar expressions.

use std::fmt;
use std::rc::Rc;

use rq_rewrite::tree::{compute_current, try_map_post_order};
use rq_rewrite::{
    Correlated, CorrelationIdentifier, CorrelationSet, Literal, RewriteError, TranslationMap,
    TreeLike,
};

/// An expression computing one value per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarExpr {
    /// A constant.
    Literal(Literal),
    /// A column of the current row of a quantifier.
    Column {
        /// The alias of the quantifier.
        quantifier: CorrelationIdentifier,
        /// The name of the column.
        column: String,
    },
    /// A parameter whose value is bound at execution time.
    Parameter(CorrelationIdentifier),
    /// A function applied to arguments.
    Call {
        /// The function.
        func: ScalarFunc,
        /// The arguments, in order.
        args: Vec<Rc<ScalarExpr>>,
    },
}

/// The functions a [`ScalarExpr::Call`] can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ScalarFunc {
    /// Integer negation.
    Neg,
    /// Integer absolute value.
    Abs,
    /// Integer addition.
    Add,
    /// Integer subtraction.
    Sub,
    /// Integer multiplication.
    Mul,
    /// Builds a record out of its arguments.
    Record,
    /// Extracts the field at the given position of a record.
    Field(usize),
}

impl ScalarFunc {
    /// The name of the function in the textual syntax.
    pub fn name(&self) -> &'static str {
        match self {
            ScalarFunc::Neg => "neg",
            ScalarFunc::Abs => "abs",
            ScalarFunc::Add => "+",
            ScalarFunc::Sub => "-",
            ScalarFunc::Mul => "*",
            ScalarFunc::Record => "record",
            ScalarFunc::Field(_) => "field",
        }
    }

    /// The number of arguments the function takes, or `None` if it takes any number.
    pub fn arity(&self) -> Option<usize> {
        match self {
            ScalarFunc::Neg | ScalarFunc::Abs | ScalarFunc::Field(_) => Some(1),
            ScalarFunc::Add | ScalarFunc::Sub | ScalarFunc::Mul => Some(2),
            ScalarFunc::Record => None,
        }
    }

    /// Applies a unary function to a literal. Returns `None` if the result is
    /// not representable, or the function does not apply to `input`.
    pub fn eval_unary(&self, input: &Literal) -> Option<Literal> {
        match (self, input) {
            (ScalarFunc::Neg | ScalarFunc::Abs, Literal::Null) => Some(Literal::Null),
            (ScalarFunc::Neg, Literal::Int(i)) => i.checked_neg().map(Literal::Int),
            (ScalarFunc::Abs, Literal::Int(i)) => i.checked_abs().map(Literal::Int),
            _ => None,
        }
    }

    /// Applies a binary function to two literals. Nulls propagate. Returns `None`
    /// on overflow or if the function does not apply to the inputs.
    pub fn eval_binary(&self, left: &Literal, right: &Literal) -> Option<Literal> {
        if !matches!(self, ScalarFunc::Add | ScalarFunc::Sub | ScalarFunc::Mul) {
            return None;
        }
        match (left, right) {
            (Literal::Null, Literal::Null | Literal::Int(_))
            | (Literal::Int(_), Literal::Null) => Some(Literal::Null),
            (Literal::Int(l), Literal::Int(r)) => match self {
                ScalarFunc::Add => l.checked_add(*r),
                ScalarFunc::Sub => l.checked_sub(*r),
                ScalarFunc::Mul => l.checked_mul(*r),
                _ => None,
            }
            .map(Literal::Int),
            _ => None,
        }
    }
}

/// The kind of a [`ScalarExpr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum ScalarOperator {
    Literal,
    Column,
    Parameter,
    Neg,
    Abs,
    Add,
    Sub,
    Mul,
    Record,
    Field,
}

impl ScalarExpr {
    /// A constant.
    pub fn literal(literal: Literal) -> Rc<ScalarExpr> {
        Rc::new(ScalarExpr::Literal(literal))
    }

    /// An integer constant.
    pub fn int(value: i64) -> Rc<ScalarExpr> {
        ScalarExpr::literal(Literal::Int(value))
    }

    /// The null constant.
    pub fn null() -> Rc<ScalarExpr> {
        ScalarExpr::literal(Literal::Null)
    }

    /// Column `column` of quantifier `quantifier`.
    pub fn column(
        quantifier: impl Into<CorrelationIdentifier>,
        column: impl Into<String>,
    ) -> Rc<ScalarExpr> {
        Rc::new(ScalarExpr::Column {
            quantifier: quantifier.into(),
            column: column.into(),
        })
    }

    /// Parameter `parameter`.
    pub fn parameter(parameter: impl Into<CorrelationIdentifier>) -> Rc<ScalarExpr> {
        Rc::new(ScalarExpr::Parameter(parameter.into()))
    }

    /// `func` applied to `args`.
    pub fn call(func: ScalarFunc, args: Vec<Rc<ScalarExpr>>) -> Rc<ScalarExpr> {
        Rc::new(ScalarExpr::Call { func, args })
    }

    /// The constant, if this is one.
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            ScalarExpr::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    /// Whether this is a constant.
    pub fn is_literal(&self) -> bool {
        self.as_literal().is_some()
    }

    /// Whether this is the integer constant `value`.
    pub fn is_int(&self, value: i64) -> bool {
        self.as_literal() == Some(&Literal::Int(value))
    }

    /// Renames the quantifiers and parameters `expr` refers to.
    ///
    /// Returns `expr` itself if it refers to none of the sources of `translation_map`.
    pub fn translate_correlations(
        expr: &Rc<ScalarExpr>,
        translation_map: &TranslationMap,
    ) -> Result<Rc<ScalarExpr>, RewriteError> {
        try_map_post_order(expr, |node, children: Vec<Rc<ScalarExpr>>| match &**node {
            ScalarExpr::Column { quantifier, column }
                if translation_map.contains_source_alias(quantifier) =>
            {
                Ok(Rc::new(ScalarExpr::Column {
                    quantifier: translation_map.translate(quantifier),
                    column: column.clone(),
                }))
            }
            ScalarExpr::Parameter(parameter) if translation_map.contains_source_alias(parameter) => {
                Ok(ScalarExpr::parameter(translation_map.translate(parameter)))
            }
            _ => compute_current(node, &children),
        })
    }
}

impl TreeLike for ScalarExpr {
    type Operator = ScalarOperator;

    fn operator(&self) -> ScalarOperator {
        match self {
            ScalarExpr::Literal(_) => ScalarOperator::Literal,
            ScalarExpr::Column { .. } => ScalarOperator::Column,
            ScalarExpr::Parameter(_) => ScalarOperator::Parameter,
            ScalarExpr::Call { func, .. } => match func {
                ScalarFunc::Neg => ScalarOperator::Neg,
                ScalarFunc::Abs => ScalarOperator::Abs,
                ScalarFunc::Add => ScalarOperator::Add,
                ScalarFunc::Sub => ScalarOperator::Sub,
                ScalarFunc::Mul => ScalarOperator::Mul,
                ScalarFunc::Record => ScalarOperator::Record,
                ScalarFunc::Field(_) => ScalarOperator::Field,
            },
        }
    }

    fn children(&self) -> &[Rc<ScalarExpr>] {
        match self {
            ScalarExpr::Call { args, .. } => args,
            _ => &[],
        }
    }

    fn with_children(&self, children: Vec<Rc<ScalarExpr>>) -> Rc<ScalarExpr> {
        match self {
            ScalarExpr::Call { func, .. } => ScalarExpr::call(*func, children),
            _ => Rc::new(self.clone()),
        }
    }
}

impl Correlated for ScalarExpr {
    fn correlated_to(&self) -> CorrelationSet {
        let mut correlated = CorrelationSet::new();
        let mut stack = vec![self];
        while let Some(expr) = stack.pop() {
            match expr {
                ScalarExpr::Literal(_) => {}
                ScalarExpr::Column { quantifier, .. } => {
                    correlated.insert(quantifier.clone());
                }
                ScalarExpr::Parameter(parameter) => {
                    correlated.insert(parameter.clone());
                }
                ScalarExpr::Call { args, .. } => stack.extend(args.iter().map(|arg| &**arg)),
            }
        }
        correlated
    }
}

impl fmt::Display for ScalarExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarExpr::Literal(literal) => write!(f, "{}", literal),
            ScalarExpr::Column { quantifier, column } => write!(f, "(col {} {})", quantifier, column),
            ScalarExpr::Parameter(parameter) => write!(f, "(param {})", parameter),
            ScalarExpr::Call { func, args } => {
                write!(f, "({}", func.name())?;
                if let ScalarFunc::Field(position) = func {
                    write!(f, " {}", position)?;
                }
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rq_ore::test]
    fn prints_the_textual_syntax() {
        let expr = ScalarExpr::call(
            ScalarFunc::Field(1),
            vec![ScalarExpr::call(
                ScalarFunc::Record,
                vec![
                    ScalarExpr::column("q", "a"),
                    ScalarExpr::call(
                        ScalarFunc::Add,
                        vec![ScalarExpr::parameter("p"), ScalarExpr::null()],
                    ),
                ],
            )],
        );
        assert_eq!(
            expr.to_string(),
            "(field 1 (record (col q a) (+ (param p) null)))"
        );
        let correlated: Vec<_> = expr.correlated_to().into_iter().collect();
        assert_eq!(
            correlated,
            vec![CorrelationIdentifier::from("p"), CorrelationIdentifier::from("q")]
        );
    }

    #[rq_ore::test]
    fn arithmetic_propagates_nulls_and_refuses_overflow() {
        assert_eq!(
            ScalarFunc::Add.eval_binary(&Literal::Int(2), &Literal::Int(3)),
            Some(Literal::Int(5))
        );
        assert_eq!(
            ScalarFunc::Mul.eval_binary(&Literal::Null, &Literal::Int(3)),
            Some(Literal::Null)
        );
        assert_eq!(
            ScalarFunc::Add.eval_binary(&Literal::Int(i64::MAX), &Literal::Int(1)),
            None
        );
        assert_eq!(
            ScalarFunc::Sub.eval_binary(&Literal::Bool(true), &Literal::Int(1)),
            None
        );
        assert_eq!(ScalarFunc::Neg.eval_unary(&Literal::Int(i64::MIN)), None);
        assert_eq!(ScalarFunc::Abs.eval_unary(&Literal::Int(-4)), Some(Literal::Int(4)));
    }

    #[rq_ore::test]
    fn translation_keeps_untouched_subtrees() {
        let untouched = ScalarExpr::column("r", "b");
        let expr = ScalarExpr::call(
            ScalarFunc::Add,
            vec![ScalarExpr::column("q", "a"), Rc::clone(&untouched)],
        );
        let map = TranslationMap::builder().when("q".into(), "z".into()).build();
        let translated = ScalarExpr::translate_correlations(&expr, &map).unwrap();
        assert_eq!(translated.to_string(), "(+ (col z a) (col r b))");
        assert!(Rc::ptr_eq(&translated.children()[1], &untouched));

        let map = TranslationMap::builder().when("x".into(), "z".into()).build();
        let translated = ScalarExpr::translate_correlations(&expr, &map).unwrap();
        assert!(Rc::ptr_eq(&translated, &expr));
    }
}
