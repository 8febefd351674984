// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Predicates under three-valued logic.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;
use std::slice;

use rq_rewrite::tree::{compute_current, try_map_post_order};
use rq_rewrite::{Correlated, CorrelationSet, Literal, RewriteError, TranslationMap, TreeLike};

use crate::scalar::ScalarExpr;

/// A truth value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Truth {
    /// The row qualifies.
    True,
    /// The row does not qualify.
    False,
    /// The result of comparing with null.
    Unknown,
}

impl Truth {
    /// Logical negation. The negation of unknown is unknown.
    pub fn not(self) -> Truth {
        match self {
            Truth::True => Truth::False,
            Truth::False => Truth::True,
            Truth::Unknown => Truth::Unknown,
        }
    }

    /// The truth value of a boolean.
    pub fn of(value: bool) -> Truth {
        if value {
            Truth::True
        } else {
            Truth::False
        }
    }
}

impl fmt::Display for Truth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Truth::True => "true",
            Truth::False => "false",
            Truth::Unknown => "unknown",
        })
    }
}

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Comparison {
    /// `=`
    Eq,
    /// `<>`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
}

impl Comparison {
    /// All comparison operators.
    pub const ALL: [Comparison; 6] = [
        Comparison::Eq,
        Comparison::NotEq,
        Comparison::Lt,
        Comparison::Lte,
        Comparison::Gt,
        Comparison::Gte,
    ];

    /// The symbol of the operator in the textual syntax.
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::NotEq => "<>",
            Comparison::Lt => "<",
            Comparison::Lte => "<=",
            Comparison::Gt => ">",
            Comparison::Gte => ">=",
        }
    }

    /// The operator that holds exactly when this one does not, on non-null operands.
    pub fn negate(&self) -> Comparison {
        match self {
            Comparison::Eq => Comparison::NotEq,
            Comparison::NotEq => Comparison::Eq,
            Comparison::Lt => Comparison::Gte,
            Comparison::Lte => Comparison::Gt,
            Comparison::Gt => Comparison::Lte,
            Comparison::Gte => Comparison::Lt,
        }
    }

    /// Whether the operator holds for operands ordered as `ordering`.
    pub fn holds(&self, ordering: Ordering) -> bool {
        match self {
            Comparison::Eq => ordering == Ordering::Equal,
            Comparison::NotEq => ordering != Ordering::Equal,
            Comparison::Lt => ordering == Ordering::Less,
            Comparison::Lte => ordering != Ordering::Greater,
            Comparison::Gt => ordering == Ordering::Greater,
            Comparison::Gte => ordering != Ordering::Less,
        }
    }

    /// Compares two constants. Returns `None` if they are not of the same type.
    pub fn eval(&self, left: &Literal, right: &Literal) -> Option<Truth> {
        let ordering = match (left, right) {
            (Literal::Null, _) | (_, Literal::Null) => return Some(Truth::Unknown),
            (Literal::Bool(l), Literal::Bool(r)) => l.cmp(r),
            (Literal::Int(l), Literal::Int(r)) => l.cmp(r),
            (Literal::String(l), Literal::String(r)) => l.cmp(r),
            _ => return None,
        };
        Some(Truth::of(self.holds(ordering)))
    }
}

/// A predicate over rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// A constant truth value.
    Constant(Truth),
    /// Holds if every conjunct holds.
    And(Vec<Rc<Predicate>>),
    /// Holds if any disjunct holds.
    Or(Vec<Rc<Predicate>>),
    /// Holds if the operand does not hold.
    Not(Rc<Predicate>),
    /// Compares two scalars.
    Compare {
        /// The comparison applied.
        op: Comparison,
        /// The left operand.
        left: Rc<ScalarExpr>,
        /// The right operand.
        right: Rc<ScalarExpr>,
    },
    /// Holds if the scalar is null.
    IsNull(Rc<ScalarExpr>),
}

/// The kind of a [`Predicate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum PredicateOperator {
    Constant,
    And,
    Or,
    Not,
    Compare,
    IsNull,
}

impl Predicate {
    /// A constant predicate.
    pub fn constant(truth: Truth) -> Rc<Predicate> {
        Rc::new(Predicate::Constant(truth))
    }

    /// A conjunction.
    pub fn and(conjuncts: Vec<Rc<Predicate>>) -> Rc<Predicate> {
        Rc::new(Predicate::And(conjuncts))
    }

    /// A disjunction.
    pub fn or(disjuncts: Vec<Rc<Predicate>>) -> Rc<Predicate> {
        Rc::new(Predicate::Or(disjuncts))
    }

    /// A negation.
    pub fn not(operand: Rc<Predicate>) -> Rc<Predicate> {
        Rc::new(Predicate::Not(operand))
    }

    /// A comparison.
    pub fn compare(op: Comparison, left: Rc<ScalarExpr>, right: Rc<ScalarExpr>) -> Rc<Predicate> {
        Rc::new(Predicate::Compare { op, left, right })
    }

    /// A null test.
    pub fn is_null(operand: Rc<ScalarExpr>) -> Rc<Predicate> {
        Rc::new(Predicate::IsNull(operand))
    }

    /// The truth value, if this is a constant.
    pub fn as_constant(&self) -> Option<Truth> {
        match self {
            Predicate::Constant(truth) => Some(*truth),
            _ => None,
        }
    }

    /// The same leaf over new scalar operands, in the order of
    /// [`Predicate::scalars`].
    pub fn with_scalars(&self, scalars: Vec<Rc<ScalarExpr>>) -> Rc<Predicate> {
        let mut scalars = scalars.into_iter();
        match (self, scalars.next(), scalars.next()) {
            (Predicate::Compare { op, .. }, Some(left), Some(right)) => {
                Predicate::compare(*op, left, right)
            }
            (Predicate::IsNull(_), Some(operand), None) => Predicate::is_null(operand),
            _ => Rc::new(self.clone()),
        }
    }

    /// The scalars this predicate compares or tests. Empty for everything but
    /// comparisons and null tests.
    pub fn scalars(&self) -> Vec<&Rc<ScalarExpr>> {
        match self {
            Predicate::Compare { left, right, .. } => vec![left, right],
            Predicate::IsNull(operand) => vec![operand],
            _ => vec![],
        }
    }

    /// Renames the quantifiers and parameters the scalars of `predicate` refer to.
    ///
    /// Returns `predicate` itself if it refers to none of the sources of
    /// `translation_map`.
    pub fn translate_correlations(
        predicate: &Rc<Predicate>,
        translation_map: &TranslationMap,
    ) -> Result<Rc<Predicate>, RewriteError> {
        try_map_post_order(predicate, |node, children: Vec<Rc<Predicate>>| {
            let scalars = node.scalars();
            if scalars.is_empty() {
                return compute_current(node, &children);
            }
            let mut changed = false;
            let mut translated = Vec::with_capacity(scalars.len());
            for scalar in scalars {
                let scalar_translated = ScalarExpr::translate_correlations(scalar, translation_map)?;
                changed |= !Rc::ptr_eq(&scalar_translated, scalar);
                translated.push(scalar_translated);
            }
            if changed {
                Ok(node.with_scalars(translated))
            } else {
                Ok(Rc::clone(node))
            }
        })
    }
}

impl TreeLike for Predicate {
    type Operator = PredicateOperator;

    fn operator(&self) -> PredicateOperator {
        match self {
            Predicate::Constant(_) => PredicateOperator::Constant,
            Predicate::And(_) => PredicateOperator::And,
            Predicate::Or(_) => PredicateOperator::Or,
            Predicate::Not(_) => PredicateOperator::Not,
            Predicate::Compare { .. } => PredicateOperator::Compare,
            Predicate::IsNull(_) => PredicateOperator::IsNull,
        }
    }

    fn children(&self) -> &[Rc<Predicate>] {
        match self {
            Predicate::And(children) | Predicate::Or(children) => children,
            Predicate::Not(operand) => slice::from_ref(operand),
            _ => &[],
        }
    }

    fn with_children(&self, children: Vec<Rc<Predicate>>) -> Rc<Predicate> {
        match self {
            Predicate::And(_) => Predicate::and(children),
            Predicate::Or(_) => Predicate::or(children),
            Predicate::Not(operand) => {
                let operand = children.into_iter().next().unwrap_or_else(|| Rc::clone(operand));
                Predicate::not(operand)
            }
            _ => Rc::new(self.clone()),
        }
    }
}

impl Correlated for Predicate {
    fn correlated_to(&self) -> CorrelationSet {
        let mut correlated = CorrelationSet::new();
        let mut stack = vec![self];
        while let Some(predicate) = stack.pop() {
            for scalar in predicate.scalars() {
                correlated.extend(scalar.correlated_to());
            }
            stack.extend(predicate.children().iter().map(|child| &**child));
        }
        correlated
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Constant(truth) => write!(f, "{}", truth),
            Predicate::And(children) | Predicate::Or(children) => {
                let name = if matches!(self, Predicate::And(_)) { "and" } else { "or" };
                write!(f, "({}", name)?;
                for child in children {
                    write!(f, " {}", child)?;
                }
                write!(f, ")")
            }
            Predicate::Not(operand) => write!(f, "(not {})", operand),
            Predicate::Compare { op, left, right } => {
                write!(f, "({} {} {})", op.symbol(), left, right)
            }
            Predicate::IsNull(operand) => write!(f, "(is-null {})", operand),
        }
    }
}

#[cfg(test)]
mod tests {
    use rq_rewrite::CorrelationIdentifier;

    use super::*;

    #[rq_ore::test]
    fn comparisons_follow_three_valued_logic() {
        assert_eq!(
            Comparison::Lt.eval(&Literal::Int(1), &Literal::Int(2)),
            Some(Truth::True)
        );
        assert_eq!(
            Comparison::Gte.eval(&Literal::Int(1), &Literal::Int(2)),
            Some(Truth::False)
        );
        assert_eq!(
            Comparison::Eq.eval(&Literal::Null, &Literal::Int(2)),
            Some(Truth::Unknown)
        );
        assert_eq!(
            Comparison::Eq.eval(&Literal::Bool(true), &Literal::Int(1)),
            None
        );
        for op in Comparison::ALL {
            assert_eq!(op.negate().negate(), op);
            for ordering in [Ordering::Less, Ordering::Equal, Ordering::Greater] {
                assert_ne!(op.holds(ordering), op.negate().holds(ordering));
            }
        }
    }

    #[rq_ore::test]
    fn translation_reaches_nested_scalars() {
        let untouched = Predicate::is_null(ScalarExpr::column("r", "b"));
        let predicate = Predicate::and(vec![
            Predicate::not(Predicate::compare(
                Comparison::Lt,
                ScalarExpr::column("q", "a"),
                ScalarExpr::int(3),
            )),
            Rc::clone(&untouched),
        ]);
        let map = TranslationMap::builder()
            .when("q".into(), "z".into())
            .build();
        let translated = Predicate::translate_correlations(&predicate, &map).unwrap();
        assert_eq!(
            translated.to_string(),
            "(and (not (< (col z a) 3)) (is-null (col r b)))"
        );
        assert!(Rc::ptr_eq(&translated.children()[1], &untouched));
        let correlated: Vec<_> = translated.correlated_to().into_iter().collect();
        assert_eq!(
            correlated,
            vec![CorrelationIdentifier::from("r"), CorrelationIdentifier::from("z")]
        );
    }
}
