// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The capabilities the memo needs from the expressions it holds.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use rq_rewrite::{CorrelationSet, TranslationMap};

use crate::memo::ReferenceId;
use crate::quantifier::Quantifier;
use crate::MemoError;

/// An expression that can be a member of a [`Reference`](crate::Reference).
pub trait RelationalExpression: fmt::Debug + Sized {
    /// The inputs of this expression, in order.
    fn quantifiers(&self) -> &[Quantifier];

    /// The aliases this expression refers to itself, ignoring whatever the
    /// references it ranges over are correlated to.
    fn correlated_to_without_children(&self) -> CorrelationSet;

    /// Rewrites this expression under `translation_map`, ranging over
    /// `quantifiers` instead of its current inputs.
    ///
    /// `quantifiers` lines up with [`RelationalExpression::quantifiers`]. When
    /// `simplify_values` is set, the expression may simplify the values it
    /// computes after translating them.
    fn translate_correlations(
        &self,
        translation_map: &TranslationMap,
        simplify_values: bool,
        quantifiers: Vec<Quantifier>,
    ) -> Result<Rc<Self>, MemoError>;
}

/// The aliases `expression` is correlated to, given the correlations of the
/// references it ranges over.
///
/// Aliases bound by the expression's own quantifiers are not part of the result.
pub(crate) fn correlated_to<E: RelationalExpression>(
    expression: &E,
    children: &BTreeMap<ReferenceId, CorrelationSet>,
) -> Result<CorrelationSet, MemoError> {
    let mut correlated = expression.correlated_to_without_children();
    for quantifier in expression.quantifiers() {
        let child = quantifier.ranges_over();
        let child_correlations = children
            .get(&child)
            .ok_or(MemoError::MissingTranslation { reference: child })?;
        correlated.extend(child_correlations.iter().cloned());
    }
    for quantifier in expression.quantifiers() {
        correlated.remove(quantifier.alias());
    }
    Ok(correlated)
}
