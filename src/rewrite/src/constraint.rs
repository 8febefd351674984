// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Conditions under which a plan remains valid.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::correlation::CorrelationIdentifier;
use crate::eval::Literal;

/// An assumption about the evaluation context.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Condition {
    /// The parameter is bound to null.
    IsNull(CorrelationIdentifier),
    /// The parameter is bound to a value other than null.
    IsNotNull(CorrelationIdentifier),
    /// The parameter is bound to exactly this value.
    Equals(CorrelationIdentifier, Literal),
    /// An assumption described in free form.
    Custom(String),
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::IsNull(alias) => write!(f, "{} IS NULL", alias),
            Condition::IsNotNull(alias) => write!(f, "{} IS NOT NULL", alias),
            Condition::Equals(alias, literal) => write!(f, "{} = {}", alias, literal),
            Condition::Custom(text) => f.write_str(text),
        }
    }
}

/// A conjunction of [`Condition`]s.
///
/// The empty conjunction places no constraint on the plan.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryPlanConstraint {
    conjuncts: BTreeSet<Condition>,
}

impl QueryPlanConstraint {
    /// The constraint that always holds.
    pub fn no_constraint() -> Self {
        Self::default()
    }

    /// The constraint consisting of `condition` alone.
    pub fn of(condition: Condition) -> Self {
        QueryPlanConstraint {
            conjuncts: BTreeSet::from([condition]),
        }
    }

    /// Whether this constraint could ever fail to hold.
    pub fn is_constrained(&self) -> bool {
        !self.conjuncts.is_empty()
    }

    /// The conjunction of `self` and `other`.
    pub fn compose(&self, other: &QueryPlanConstraint) -> QueryPlanConstraint {
        if !other.is_constrained() {
            return self.clone();
        }
        if !self.is_constrained() {
            return other.clone();
        }
        QueryPlanConstraint {
            conjuncts: self.conjuncts.union(&other.conjuncts).cloned().collect(),
        }
    }

    /// The conditions making up this constraint.
    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.conjuncts.iter()
    }
}

impl fmt::Display for QueryPlanConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_constrained() {
            write!(f, "{}", itertools::join(&self.conjuncts, " AND "))
        } else {
            f.write_str("TRUE")
        }
    }
}

/// A value together with the constraint under which it is valid.
#[derive(Clone, Debug)]
pub struct Constrained<T> {
    value: T,
    constraint: QueryPlanConstraint,
}

impl<T> Constrained<T> {
    /// Pairs `value` with `constraint`.
    pub fn new(value: T, constraint: QueryPlanConstraint) -> Self {
        Constrained { value, constraint }
    }

    /// Pairs `value` with [`QueryPlanConstraint::no_constraint`].
    pub fn unconstrained(value: T) -> Self {
        Self::new(value, QueryPlanConstraint::no_constraint())
    }

    /// The value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// The constraint.
    pub fn constraint(&self) -> &QueryPlanConstraint {
        &self.constraint
    }

    /// Splits into value and constraint.
    pub fn into_parts(self) -> (T, QueryPlanConstraint) {
        (self.value, self.constraint)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn condition() -> impl Strategy<Value = Condition> {
        let alias = proptest::sample::select(vec!["p", "q", "r"]).prop_map(CorrelationIdentifier::from);
        prop_oneof![
            alias.clone().prop_map(Condition::IsNull),
            alias.clone().prop_map(Condition::IsNotNull),
            (alias, -3i64..3).prop_map(|(a, i)| Condition::Equals(a, Literal::Int(i))),
        ]
    }

    fn constraint() -> impl Strategy<Value = QueryPlanConstraint> {
        proptest::collection::vec(condition(), 0..4).prop_map(|conditions| {
            conditions
                .into_iter()
                .fold(QueryPlanConstraint::no_constraint(), |c, condition| {
                    c.compose(&QueryPlanConstraint::of(condition))
                })
        })
    }

    #[test]
    fn display() {
        let p = CorrelationIdentifier::from("p");
        assert_eq!(QueryPlanConstraint::no_constraint().to_string(), "TRUE");
        let c = QueryPlanConstraint::of(Condition::Equals(p.clone(), Literal::Int(5)))
            .compose(&QueryPlanConstraint::of(Condition::IsNotNull(p)));
        assert_eq!(c.to_string(), "p IS NOT NULL AND p = 5");
    }

    proptest! {
        #[test]
        fn compose_with_identity_is_noop(c in constraint()) {
            prop_assert_eq!(c.compose(&QueryPlanConstraint::no_constraint()), c.clone());
            prop_assert_eq!(QueryPlanConstraint::no_constraint().compose(&c), c);
        }

        #[test]
        fn compose_is_commutative(a in constraint(), b in constraint()) {
            prop_assert_eq!(a.compose(&b), b.compose(&a));
        }

        #[test]
        fn compose_is_associative(a in constraint(), b in constraint(), c in constraint()) {
            prop_assert_eq!(a.compose(&b).compose(&c), a.compose(&b.compose(&c)));
        }

        #[test]
        fn only_identity_is_unconstrained(c in constraint()) {
            prop_assert_eq!(c.is_constrained(), c != QueryPlanConstraint::no_constraint());
        }
    }
}
