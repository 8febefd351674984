// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Expressions the optimizer rewrites.
//!
//! [`ScalarExpr`] computes a value per row, [`Predicate`] filters rows under
//! three-valued logic, and [`RelationExpr`] is the member type of a
//! [`Memo`](rq_memo::Memo). The [`rules`] module holds the default rule sets for
//! scalars and predicates, and [`parse`] reads the s-expression syntax every
//! expression prints itself in.

#![warn(missing_docs, missing_debug_implementations)]

pub mod parse;
pub mod predicate;
pub mod relation;
pub mod rules;
pub mod scalar;

pub use parse::{parse_literal, parse_predicate, parse_scalar, ParseError};
pub use predicate::{Comparison, Predicate, PredicateOperator, Truth};
pub use relation::RelationExpr;
pub use scalar::{ScalarExpr, ScalarFunc, ScalarOperator};
