// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::cell::RefCell;
use std::rc::Rc;

use rq_memo::{
    set_debugger, translate_correlations, Debugger, Event, Memo, MemoError, PlannerStage,
    Quantifier, ReferenceId, RelationalExpression,
};
use rq_rewrite::{CorrelationIdentifier, CorrelationSet, TranslationMap};

/// An expression that refers to a fixed set of aliases.
#[derive(Debug)]
struct Op {
    name: &'static str,
    correlated: CorrelationSet,
    quantifiers: Vec<Quantifier>,
}

impl Op {
    fn new(name: &'static str, correlated: &[&str], quantifiers: Vec<Quantifier>) -> Op {
        Op {
            name,
            correlated: correlated.iter().map(|alias| (*alias).into()).collect(),
            quantifiers,
        }
    }
}

impl RelationalExpression for Op {
    fn quantifiers(&self) -> &[Quantifier] {
        &self.quantifiers
    }

    fn correlated_to_without_children(&self) -> CorrelationSet {
        self.correlated.clone()
    }

    fn translate_correlations(
        &self,
        translation_map: &TranslationMap,
        _simplify_values: bool,
        quantifiers: Vec<Quantifier>,
    ) -> Result<Rc<Self>, MemoError> {
        Ok(Rc::new(Op {
            name: self.name,
            correlated: self
                .correlated
                .iter()
                .map(|alias| translation_map.translate(alias))
                .collect(),
            quantifiers,
        }))
    }
}

fn alias(name: &str) -> CorrelationIdentifier {
    CorrelationIdentifier::new(name)
}

fn rename(source: &str, target: &str) -> TranslationMap {
    TranslationMap::builder()
        .when(alias(source), alias(target))
        .build()
}

fn only_member(memo: &Memo<Op>, reference: ReferenceId) -> Rc<Op> {
    let members = memo.reference(reference).unwrap().all_member_expressions();
    assert_eq!(members.len(), 1);
    Rc::clone(members[0])
}

#[derive(Debug)]
struct Recorder(Rc<RefCell<Vec<Event>>>);

impl Debugger for Recorder {
    fn on_event(&mut self, event: &Event) {
        self.0.borrow_mut().push(event.clone());
    }
}

/// a ranges over b and d, b ranges over c. Only c refers to `outer`.
fn chain(memo: &mut Memo<Op>) -> [ReferenceId; 4] {
    let c = memo.insert_expression(Op::new("c", &["outer"], vec![]));
    let d = memo.insert_expression(Op::new("d", &[], vec![]));
    let b = memo.insert_expression(Op::new("b", &["qc"], vec![Quantifier::for_each("qc", c)]));
    let a = memo.insert_expression(Op::new(
        "a",
        &["qb"],
        vec![Quantifier::for_each("qb", b), Quantifier::existential("qd", d)],
    ));
    [a, b, c, d]
}

#[rq_ore::test]
fn correlations_exclude_own_aliases() {
    let mut memo = Memo::new();
    let [a, b, c, d] = chain(&mut memo);
    let outer: CorrelationSet = [alias("outer")].into_iter().collect();
    assert_eq!(memo.correlated_to(a).unwrap(), outer);
    assert_eq!(memo.correlated_to(b).unwrap(), outer);
    assert_eq!(memo.correlated_to(c).unwrap(), outer);
    assert!(memo.correlated_to(d).unwrap().is_empty());
}

#[rq_ore::test]
fn dependencies_are_translated_first() {
    let events = Rc::new(RefCell::new(Vec::new()));
    set_debugger(Some(Box::new(Recorder(Rc::clone(&events)))));

    let mut memo = Memo::new();
    let [a, b, c, d] = chain(&mut memo);
    let translated = translate_correlations(&mut memo, &[a], &rename("outer", "inner"), false);
    set_debugger(None);

    let translated = translated.unwrap();
    assert_eq!(translated.len(), 1);
    let new_a = translated[0];
    assert_ne!(new_a, a);
    assert_eq!(memo.len(), 7);

    let new_a_member = only_member(&memo, new_a);
    assert_eq!(new_a_member.name, "a");
    let new_b = new_a_member.quantifiers[0].ranges_over();
    assert_ne!(new_b, b);
    assert_eq!(new_a_member.quantifiers[0].alias(), &alias("qb"));
    assert_eq!(new_a_member.quantifiers[1].ranges_over(), d);

    let new_b_member = only_member(&memo, new_b);
    let new_c = new_b_member.quantifiers[0].ranges_over();
    assert_ne!(new_c, c);
    let new_c_member = only_member(&memo, new_c);
    assert!(new_c_member.correlated.contains(&alias("inner")));

    let translated_references: Vec<_> = events
        .borrow()
        .iter()
        .map(|event| match event {
            Event::TranslateCorrelations { reference, .. } => *reference,
        })
        .collect();
    assert_eq!(translated_references, vec![c, b, a]);

    // The originals are untouched.
    assert!(only_member(&memo, c).correlated.contains(&alias("outer")));
    assert_eq!(only_member(&memo, a).quantifiers[0].ranges_over(), b);
}

#[rq_ore::test]
fn unaffected_references_are_reused() {
    let mut memo = Memo::new();
    let [a, b, c, d] = chain(&mut memo);
    let inputs = [d, a, c, b, a];
    let translated =
        translate_correlations(&mut memo, &inputs, &rename("elsewhere", "inner"), true).unwrap();
    assert_eq!(translated, inputs);
    assert_eq!(memo.len(), 4);

    // Aliases bound inside the graph do not correlate it to anything outside.
    let translated = translate_correlations(&mut memo, &[a], &rename("qb", "z"), false).unwrap();
    assert_eq!(translated, vec![a]);

    assert!(translate_correlations(&mut memo, &[], &rename("outer", "inner"), false)
        .unwrap()
        .is_empty());
}

#[rq_ore::test]
fn untouched_members_are_shared() {
    let mut memo = Memo::new();
    let correlated = Rc::new(Op::new("correlated", &["outer"], vec![]));
    let plain = Rc::new(Op::new("plain", &[], vec![]));
    let reference = memo.insert(
        PlannerStage::Canonical,
        vec![Rc::clone(&correlated)],
        vec![Rc::clone(&correlated), Rc::clone(&plain)],
    );

    let translated =
        translate_correlations(&mut memo, &[reference], &rename("outer", "inner"), false).unwrap();
    let translated = memo.reference(translated[0]).unwrap();
    assert_eq!(translated.planner_stage(), PlannerStage::Canonical);
    assert_eq!(translated.exploratory_members().len(), 1);
    assert_eq!(translated.final_members().len(), 2);
    assert!(Rc::ptr_eq(&translated.exploratory_members()[0], &translated.final_members()[0]));
    assert!(!Rc::ptr_eq(&translated.exploratory_members()[0], &correlated));
    assert!(Rc::ptr_eq(&translated.final_members()[1], &plain));
}

#[rq_ore::test]
fn cycles_are_reported() {
    let mut memo = Memo::new();
    let a = memo.insert_expression(Op::new(
        "a",
        &["outer"],
        vec![Quantifier::for_each("qb", ReferenceId::from(1))],
    ));
    let b = memo.insert_expression(Op::new("b", &[], vec![Quantifier::for_each("qa", a)]));
    assert_eq!(b, ReferenceId::from(1));

    assert_eq!(
        translate_correlations(&mut memo, &[a], &rename("outer", "inner"), false),
        Err(MemoError::CyclicGraph)
    );
    assert_eq!(memo.correlated_to(b), Err(MemoError::CyclicGraph));
    assert_eq!(MemoError::CyclicGraph.to_string(), "graph has cycles");
}
