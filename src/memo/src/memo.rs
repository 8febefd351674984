// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The arena of references.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use rq_ore::graph::any_topological_order;
use rq_ore::id_gen::Gen;
use rq_rewrite::CorrelationSet;

use crate::dependencies::references_and_dependencies;
use crate::expression::{correlated_to, RelationalExpression};
use crate::MemoError;

/// Identifies a [`Reference`] within a [`Memo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReferenceId(u64);

impl From<u64> for ReferenceId {
    fn from(id: u64) -> Self {
        ReferenceId(id)
    }
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// How far planning has progressed for the members of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PlannerStage {
    /// Members as they came out of the query translation.
    Initial,
    /// Members have been rewritten into a canonical form.
    Canonical,
    /// Members are physical plans.
    Planned,
}

/// A group of alternative expressions computing the same result.
///
/// Exploratory members are candidates that are still being searched; final
/// members have been committed to. An expression may be both.
#[derive(Debug)]
pub struct Reference<E> {
    id: ReferenceId,
    stage: PlannerStage,
    exploratory: Vec<Rc<E>>,
    finals: Vec<Rc<E>>,
}

impl<E> Reference<E> {
    /// The identifier of this reference.
    pub fn id(&self) -> ReferenceId {
        self.id
    }

    /// The planner stage of this reference.
    pub fn planner_stage(&self) -> PlannerStage {
        self.stage
    }

    /// The exploratory members.
    pub fn exploratory_members(&self) -> &[Rc<E>] {
        &self.exploratory
    }

    /// The final members.
    pub fn final_members(&self) -> &[Rc<E>] {
        &self.finals
    }

    /// Whether `expression` is an exploratory member. Compares by identity.
    pub fn is_exploratory(&self, expression: &Rc<E>) -> bool {
        self.exploratory
            .iter()
            .any(|member| Rc::ptr_eq(member, expression))
    }

    /// Whether `expression` is a final member. Compares by identity.
    pub fn is_final(&self, expression: &Rc<E>) -> bool {
        self.finals.iter().any(|member| Rc::ptr_eq(member, expression))
    }

    /// Every member, exploratory members first, each listed once.
    pub fn all_member_expressions(&self) -> Vec<&Rc<E>> {
        let mut members: Vec<&Rc<E>> = Vec::with_capacity(self.exploratory.len());
        for member in self.exploratory.iter().chain(self.finals.iter()) {
            if !members.iter().any(|seen| Rc::ptr_eq(seen, member)) {
                members.push(member);
            }
        }
        members
    }
}

/// An arena of [`Reference`]s addressed by [`ReferenceId`].
///
/// References are never removed. A translation that changes a reference inserts
/// a new one and leaves the old one in place for the parents that still use it.
#[derive(Debug)]
pub struct Memo<E> {
    references: BTreeMap<ReferenceId, Reference<E>>,
    id_gen: Gen<ReferenceId>,
}

impl<E> Default for Memo<E> {
    fn default() -> Self {
        Memo {
            references: BTreeMap::new(),
            id_gen: Gen::default(),
        }
    }
}

impl<E: RelationalExpression> Memo<E> {
    /// Creates an empty memo.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new reference with the given members and returns its identifier.
    pub fn insert(
        &mut self,
        stage: PlannerStage,
        exploratory: Vec<Rc<E>>,
        finals: Vec<Rc<E>>,
    ) -> ReferenceId {
        let id = self.id_gen.allocate_id();
        self.references.insert(
            id,
            Reference {
                id,
                stage,
                exploratory,
                finals,
            },
        );
        id
    }

    /// Adds a new reference in the initial stage with a single exploratory member.
    pub fn insert_expression(&mut self, expression: E) -> ReferenceId {
        self.insert(PlannerStage::Initial, vec![Rc::new(expression)], Vec::new())
    }

    /// Adds `expression` to the exploratory members of `id` unless it is already one.
    pub fn add_exploratory_member(
        &mut self,
        id: ReferenceId,
        expression: Rc<E>,
    ) -> Result<(), MemoError> {
        let reference = self.get_mut(id)?;
        if !reference.is_exploratory(&expression) {
            reference.exploratory.push(expression);
        }
        Ok(())
    }

    /// Adds `expression` to the final members of `id` unless it is already one.
    pub fn add_final_member(&mut self, id: ReferenceId, expression: Rc<E>) -> Result<(), MemoError> {
        let reference = self.get_mut(id)?;
        if !reference.is_final(&expression) {
            reference.finals.push(expression);
        }
        Ok(())
    }

    /// Moves `id` to `stage`.
    pub fn set_planner_stage(
        &mut self,
        id: ReferenceId,
        stage: PlannerStage,
    ) -> Result<(), MemoError> {
        self.get_mut(id)?.stage = stage;
        Ok(())
    }

    /// The reference identified by `id`, if any.
    pub fn reference(&self, id: ReferenceId) -> Option<&Reference<E>> {
        self.references.get(&id)
    }

    /// The aliases the members of `id` are correlated to, excluding the aliases
    /// they bind themselves.
    pub fn correlated_to(&self, id: ReferenceId) -> Result<CorrelationSet, MemoError> {
        let order = references_and_dependencies(self, &[id])?;
        let order = any_topological_order(&order).ok_or(MemoError::CyclicGraph)?;
        let mut correlations = self.correlations_in_order(&order)?;
        correlations
            .remove(&id)
            .ok_or(MemoError::UnknownReference { reference: id })
    }

    /// The number of references.
    pub fn len(&self) -> usize {
        self.references.len()
    }

    /// Whether the memo holds no references.
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    /// All references in the order they were inserted.
    pub fn references(&self) -> impl Iterator<Item = &Reference<E>> {
        self.references.values()
    }

    pub(crate) fn get(&self, id: ReferenceId) -> Result<&Reference<E>, MemoError> {
        self.references
            .get(&id)
            .ok_or(MemoError::UnknownReference { reference: id })
    }

    fn get_mut(&mut self, id: ReferenceId) -> Result<&mut Reference<E>, MemoError> {
        self.references
            .get_mut(&id)
            .ok_or(MemoError::UnknownReference { reference: id })
    }

    /// Computes the correlations of every reference in `order`, which must list
    /// the references a reference ranges over before the reference itself.
    pub(crate) fn correlations_in_order(
        &self,
        order: &[ReferenceId],
    ) -> Result<BTreeMap<ReferenceId, CorrelationSet>, MemoError> {
        let mut correlations = BTreeMap::new();
        for id in order {
            let mut correlated = CorrelationSet::new();
            for member in self.get(*id)?.all_member_expressions() {
                correlated.extend(correlated_to(&**member, &correlations)?);
            }
            correlations.insert(*id, correlated);
        }
        Ok(correlations)
    }
}

#[cfg(test)]
mod tests {
    use rq_rewrite::{CorrelationSet, TranslationMap};

    use super::*;
    use crate::quantifier::Quantifier;

    #[derive(Debug)]
    struct Leaf;

    impl RelationalExpression for Leaf {
        fn quantifiers(&self) -> &[Quantifier] {
            &[]
        }

        fn correlated_to_without_children(&self) -> CorrelationSet {
            CorrelationSet::new()
        }

        fn translate_correlations(
            &self,
            _: &TranslationMap,
            _: bool,
            _: Vec<Quantifier>,
        ) -> Result<Rc<Self>, MemoError> {
            Ok(Rc::new(Leaf))
        }
    }

    #[rq_ore::test]
    fn members_are_listed_once() {
        let mut memo = Memo::new();
        let shared = Rc::new(Leaf);
        let id = memo.insert(
            PlannerStage::Initial,
            vec![Rc::clone(&shared)],
            vec![Rc::clone(&shared), Rc::new(Leaf)],
        );
        memo.add_exploratory_member(id, Rc::clone(&shared)).unwrap();
        memo.set_planner_stage(id, PlannerStage::Planned).unwrap();

        let reference = memo.reference(id).unwrap();
        assert_eq!(reference.planner_stage(), PlannerStage::Planned);
        assert_eq!(reference.exploratory_members().len(), 1);
        assert_eq!(reference.all_member_expressions().len(), 2);
        assert!(reference.is_exploratory(&shared));
        assert!(reference.is_final(&shared));
        assert!(!reference.is_exploratory(&Rc::new(Leaf)));
    }

    #[rq_ore::test]
    fn unknown_references_are_reported() {
        let mut memo = Memo::<Leaf>::new();
        let missing = ReferenceId::from(7);
        assert_eq!(
            memo.add_final_member(missing, Rc::new(Leaf)),
            Err(MemoError::UnknownReference { reference: missing })
        );
        assert_eq!(missing.to_string(), "r7");
    }
}
