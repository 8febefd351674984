// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Translating the correlations of a graph of references.

use std::collections::BTreeMap;
use std::rc::Rc;

use rq_ore::graph::any_topological_order;
use rq_rewrite::TranslationMap;
use tracing::debug;

use crate::debugger::{with_debugger, Event};
use crate::dependencies::references_and_dependencies;
use crate::expression::RelationalExpression;
use crate::memo::{Memo, ReferenceId};
use crate::MemoError;

/// Rewrites `references`, and everything they range over, so that they refer to
/// the targets of `translation_map` instead of its sources.
///
/// Returns one reference per input reference, in the same order. A reference
/// that is not correlated to any source alias, and whose inputs are unchanged,
/// is returned as is. Every other reference is replaced by a new reference in
/// `memo` whose members have been translated; the original stays untouched.
///
/// References are visited after everything they range over, so a member is
/// rebuilt only once its inputs have been translated. Fails with
/// [`MemoError::CyclicGraph`] if the references range over each other in a
/// cycle.
#[rq_ore::instrument(target = "optimizer", level = "debug")]
pub fn translate_correlations<E: RelationalExpression>(
    memo: &mut Memo<E>,
    references: &[ReferenceId],
    translation_map: &TranslationMap,
    simplify_values: bool,
) -> Result<Vec<ReferenceId>, MemoError> {
    if references.is_empty() {
        return Ok(Vec::new());
    }

    let order = references_and_dependencies(memo, references)?;
    let order = any_topological_order(&order).ok_or(MemoError::CyclicGraph)?;
    let correlations = memo.correlations_in_order(&order)?;

    let mut translations = BTreeMap::new();
    for reference in order {
        let correlated_to = correlations
            .get(&reference)
            .ok_or(MemoError::MissingTranslation { reference })?;
        let translated = if translation_map.contains_any_source_alias(correlated_to) {
            translate_reference(
                memo,
                reference,
                &translations,
                translation_map,
                simplify_values,
            )?
        } else {
            reference
        };
        translations.insert(reference, translated);
    }

    references
        .iter()
        .map(|reference| {
            translations
                .get(reference)
                .copied()
                .ok_or(MemoError::MissingTranslation {
                    reference: *reference,
                })
        })
        .collect()
}

/// Translates the members of `reference`. `translations` must hold every
/// reference the members range over.
fn translate_reference<E: RelationalExpression>(
    memo: &mut Memo<E>,
    reference: ReferenceId,
    translations: &BTreeMap<ReferenceId, ReferenceId>,
    translation_map: &TranslationMap,
    simplify_values: bool,
) -> Result<ReferenceId, MemoError> {
    let original = memo.get(reference)?;
    let mut all_members_same = true;
    let mut exploratory = Vec::new();
    let mut finals = Vec::new();

    for member in original.all_member_expressions() {
        let mut all_children_same = true;
        let mut quantifiers = Vec::with_capacity(member.quantifiers().len());
        for quantifier in member.quantifiers() {
            let child = quantifier.ranges_over();
            let translated_child = translations
                .get(&child)
                .copied()
                .ok_or(MemoError::MissingTranslation { reference: child })?;
            if translated_child == child {
                quantifiers.push(quantifier.clone());
            } else {
                quantifiers.push(quantifier.over_new_reference(translated_child));
                all_children_same = false;
            }
        }

        let translated = if all_children_same
            && !translation_map.contains_any_source_alias(&member.correlated_to_without_children())
        {
            Rc::clone(member)
        } else {
            let translated =
                member.translate_correlations(translation_map, simplify_values, quantifiers)?;
            debug!(%reference, "translated correlations of member");
            with_debugger(|debugger| {
                debugger.on_event(&Event::TranslateCorrelations {
                    reference,
                    expression: format!("{:?}", translated),
                })
            });
            all_members_same = false;
            translated
        };

        if original.is_final(member) {
            finals.push(Rc::clone(&translated));
        }
        if original.is_exploratory(member) {
            exploratory.push(translated);
        }
    }

    if all_members_same {
        return Ok(reference);
    }
    let stage = original.planner_stage();
    Ok(memo.insert(stage, exploratory, finals))
}

