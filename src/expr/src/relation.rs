// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Relational expressions, the members of the memo.

use std::fmt;
use std::rc::Rc;

use rq_memo::{MemoError, Quantifier, QuantifierKind, RelationalExpression};
use rq_rewrite::{
    simplify, AliasMap, Correlated, CorrelationSet, EvaluationContext, TranslationMap,
};
use tracing::trace;

use crate::predicate::Predicate;
use crate::rules;
use crate::scalar::ScalarExpr;

/// An expression producing a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationExpr {
    /// All rows of a table.
    Scan {
        /// The name of the table.
        table: String,
    },
    /// Joins its inputs, keeps the rows satisfying every predicate, and computes
    /// the projection for each of them.
    Select {
        /// The inputs.
        quantifiers: Vec<Quantifier>,
        /// The conjuncts of the filter.
        predicates: Vec<Rc<Predicate>>,
        /// The output columns.
        projection: Vec<Rc<ScalarExpr>>,
    },
    /// All rows of all inputs.
    Union {
        /// The inputs.
        quantifiers: Vec<Quantifier>,
    },
}

impl RelationExpr {
    /// Scans `table`.
    pub fn scan(table: impl Into<String>) -> RelationExpr {
        RelationExpr::Scan {
            table: table.into(),
        }
    }

    /// Selects from `quantifiers`.
    pub fn select(
        quantifiers: Vec<Quantifier>,
        predicates: Vec<Rc<Predicate>>,
        projection: Vec<Rc<ScalarExpr>>,
    ) -> RelationExpr {
        RelationExpr::Select {
            quantifiers,
            predicates,
            projection,
        }
    }

    /// Unions `quantifiers`.
    pub fn union(quantifiers: Vec<Quantifier>) -> RelationExpr {
        RelationExpr::Union { quantifiers }
    }
}

impl RelationalExpression for RelationExpr {
    fn quantifiers(&self) -> &[Quantifier] {
        match self {
            RelationExpr::Scan { .. } => &[],
            RelationExpr::Select { quantifiers, .. } | RelationExpr::Union { quantifiers } => {
                quantifiers
            }
        }
    }

    fn correlated_to_without_children(&self) -> CorrelationSet {
        let mut correlated = CorrelationSet::new();
        if let RelationExpr::Select {
            predicates,
            projection,
            ..
        } = self
        {
            for predicate in predicates {
                correlated.extend(predicate.correlated_to());
            }
            for scalar in projection {
                correlated.extend(scalar.correlated_to());
            }
        }
        correlated
    }

    fn translate_correlations(
        &self,
        translation_map: &TranslationMap,
        simplify_values: bool,
        quantifiers: Vec<Quantifier>,
    ) -> Result<Rc<Self>, MemoError> {
        match self {
            RelationExpr::Scan { .. } => Ok(Rc::new(self.clone())),
            RelationExpr::Union { .. } => Ok(Rc::new(RelationExpr::union(quantifiers))),
            RelationExpr::Select {
                predicates,
                projection,
                ..
            } => {
                let mut translated_predicates = predicates
                    .iter()
                    .map(|predicate| Predicate::translate_correlations(predicate, translation_map))
                    .collect::<Result<Vec<_>, _>>()?;
                let mut translated_projection = projection
                    .iter()
                    .map(|scalar| ScalarExpr::translate_correlations(scalar, translation_map))
                    .collect::<Result<Vec<_>, _>>()?;
                if simplify_values {
                    simplify_values_in_place(&mut translated_predicates, &mut translated_projection)?;
                }
                Ok(Rc::new(RelationExpr::select(
                    quantifiers,
                    translated_predicates,
                    translated_projection,
                )))
            }
        }
    }
}

/// Simplifies translated predicates and projections with the default rule sets. No
/// parameter is treated as constant, so the results hold unconstrained.
#[rq_ore::instrument(target = "optimizer", level = "trace")]
fn simplify_values_in_place(
    predicates: &mut [Rc<Predicate>],
    projection: &mut [Rc<ScalarExpr>],
) -> Result<(), MemoError> {
    let evaluation_context = EvaluationContext::empty();
    let alias_map = AliasMap::empty();
    let constant_aliases = CorrelationSet::new();
    let predicate_rules = rules::default_predicate_rules()?;
    for predicate in predicates.iter_mut() {
        *predicate = simplify(
            predicate,
            &evaluation_context,
            &alias_map,
            &constant_aliases,
            &predicate_rules,
        )?
        .into_parts()
        .0;
    }
    let scalar_rules = rules::default_scalar_rules()?;
    for scalar in projection.iter_mut() {
        *scalar = simplify(
            scalar,
            &evaluation_context,
            &alias_map,
            &constant_aliases,
            &scalar_rules,
        )?
        .into_parts()
        .0;
    }
    trace!(
        predicates = predicates.len(),
        projection = projection.len(),
        "simplified translated values"
    );
    Ok(())
}

impl fmt::Display for RelationExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationExpr::Scan { table } => write!(f, "(scan {})", table),
            RelationExpr::Select {
                quantifiers,
                predicates,
                projection,
            } => {
                write!(f, "(select")?;
                write_quantifiers(f, quantifiers)?;
                write!(f, " (where")?;
                for predicate in predicates {
                    write!(f, " {}", predicate)?;
                }
                write!(f, ") (project")?;
                for scalar in projection {
                    write!(f, " {}", scalar)?;
                }
                write!(f, "))")
            }
            RelationExpr::Union { quantifiers } => {
                write!(f, "(union")?;
                write_quantifiers(f, quantifiers)?;
                write!(f, ")")
            }
        }
    }
}

fn write_quantifiers(f: &mut fmt::Formatter<'_>, quantifiers: &[Quantifier]) -> fmt::Result {
    for quantifier in quantifiers {
        let kind = match quantifier.kind() {
            QuantifierKind::ForEach => "each",
            QuantifierKind::Existential => "exists",
            QuantifierKind::Physical => "physical",
        };
        write!(
            f,
            " ({} {} {})",
            kind,
            quantifier.alias(),
            quantifier.ranges_over()
        )?;
    }
    Ok(())
}
