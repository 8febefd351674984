// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Edges from expressions to the references they consume.

use rq_rewrite::CorrelationIdentifier;

use crate::memo::ReferenceId;

/// How an expression consumes the rows of the reference a quantifier ranges over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum QuantifierKind {
    /// Every row of the input is consumed.
    ForEach,
    /// Only the existence of a row matters.
    Existential,
    /// The input is a physical plan.
    Physical,
}

/// A named input of an expression.
///
/// The alias is the name under which the rest of the expression, and any
/// expression correlated to it, refers to the current row of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quantifier {
    kind: QuantifierKind,
    alias: CorrelationIdentifier,
    ranges_over: ReferenceId,
}

impl Quantifier {
    /// Creates a quantifier of `kind` named `alias` over `ranges_over`.
    pub fn new(
        kind: QuantifierKind,
        alias: CorrelationIdentifier,
        ranges_over: ReferenceId,
    ) -> Quantifier {
        Quantifier {
            kind,
            alias,
            ranges_over,
        }
    }

    /// Creates a for-each quantifier.
    pub fn for_each(alias: impl Into<CorrelationIdentifier>, ranges_over: ReferenceId) -> Quantifier {
        Quantifier::new(QuantifierKind::ForEach, alias.into(), ranges_over)
    }

    /// Creates an existential quantifier.
    pub fn existential(
        alias: impl Into<CorrelationIdentifier>,
        ranges_over: ReferenceId,
    ) -> Quantifier {
        Quantifier::new(QuantifierKind::Existential, alias.into(), ranges_over)
    }

    /// The kind of this quantifier.
    pub fn kind(&self) -> QuantifierKind {
        self.kind
    }

    /// The alias this quantifier binds.
    pub fn alias(&self) -> &CorrelationIdentifier {
        &self.alias
    }

    /// The reference this quantifier ranges over.
    pub fn ranges_over(&self) -> ReferenceId {
        self.ranges_over
    }

    /// The same quantifier, ranging over `reference` instead.
    pub fn over_new_reference(&self, reference: ReferenceId) -> Quantifier {
        Quantifier {
            kind: self.kind,
            alias: self.alias.clone(),
            ranges_over: reference,
        }
    }
}
