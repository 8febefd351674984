// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Values bound at evaluation time.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::correlation::CorrelationIdentifier;

/// A constant value.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Literal {
    /// The SQL null.
    Null,
    /// A boolean.
    Bool(bool),
    /// A 64-bit signed integer.
    Int(i64),
    /// A string.
    String(String),
}

impl Literal {
    /// Whether this is [`Literal::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("null"),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::String(s) => write!(f, "{:?}", s),
        }
    }
}

/// The parameter bindings of one execution of a query.
///
/// Rules may read bindings to specialize a plan, but must then attach a
/// constraint stating the assumption they made.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationContext {
    parameters: BTreeMap<CorrelationIdentifier, Literal>,
}

impl EvaluationContext {
    /// A context that binds nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Binds `parameter` to `value`.
    pub fn with_parameter(mut self, parameter: CorrelationIdentifier, value: Literal) -> Self {
        self.parameters.insert(parameter, value);
        self
    }

    /// The value bound to `parameter`.
    pub fn parameter(&self, parameter: &CorrelationIdentifier) -> Option<&Literal> {
        self.parameters.get(parameter)
    }
}
