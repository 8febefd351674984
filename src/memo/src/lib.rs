// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The memo of equivalent relational expressions.
//!
//! A [`Memo`] is an arena of [`Reference`]s. Each reference groups the
//! alternative expressions that compute the same logical result. Expressions do
//! not own their inputs: a [`Quantifier`] names the reference it ranges over by
//! [`ReferenceId`], so references can be shared by any number of parents.
//!
//! [`translate_correlations`] rewrites a set of references under a
//! [`TranslationMap`](rq_rewrite::TranslationMap), reusing every reference the
//! translation does not touch.

#![warn(missing_docs)]
#![deny(missing_debug_implementations)]

use rq_rewrite::RewriteError;

pub mod debugger;
pub mod dependencies;
pub mod expression;
pub mod memo;
pub mod quantifier;
pub mod translate;

pub use debugger::{set_debugger, Debugger, Event};
pub use dependencies::references_and_dependencies;
pub use expression::RelationalExpression;
pub use memo::{Memo, PlannerStage, Reference, ReferenceId};
pub use quantifier::{Quantifier, QuantifierKind};
pub use translate::translate_correlations;

/// Errors that can occur while working with a [`Memo`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoError {
    /// References range over each other in a cycle.
    #[error("graph has cycles")]
    CyclicGraph,
    /// A reference was not found in the memo.
    #[error("unknown reference {reference}")]
    UnknownReference {
        /// The missing reference.
        reference: ReferenceId,
    },
    /// A reference was visited before the references it ranges over.
    #[error("no translation for reference {reference}")]
    MissingTranslation {
        /// The reference without a translation.
        reference: ReferenceId,
    },
    /// Rewriting the values of an expression failed.
    #[error(transparent)]
    Rewrite(#[from] RewriteError),
}
