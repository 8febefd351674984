// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Translating the correlations of relational expressions held in a memo.

use rq_expr::{parse_predicate, parse_scalar, RelationExpr};
use rq_memo::{translate_correlations, Memo, Quantifier, ReferenceId};
use rq_rewrite::{CorrelationIdentifier, TranslationMap};

/// `t` is scanned by `inner`, which refers to the outer quantifier `o` of `top`.
fn memo() -> (Memo<RelationExpr>, ReferenceId, ReferenceId, ReferenceId) {
    let mut memo = Memo::new();
    let t = memo.insert_expression(RelationExpr::scan("t"));
    let inner = memo.insert_expression(RelationExpr::select(
        vec![Quantifier::for_each("q", t)],
        vec![parse_predicate("(and (= (col q a) (col o x)) (< 1 2))").unwrap()],
        vec![parse_scalar("(+ (col o y) 0)").unwrap()],
    ));
    let top = memo.insert_expression(RelationExpr::select(
        vec![Quantifier::for_each("o", t), Quantifier::for_each("s", inner)],
        vec![],
        vec![parse_scalar("(col s a)").unwrap()],
    ));
    (memo, t, inner, top)
}

fn rename_outer() -> TranslationMap {
    TranslationMap::builder()
        .when(
            CorrelationIdentifier::from("o"),
            CorrelationIdentifier::from("n"),
        )
        .build()
}

fn only_member(memo: &Memo<RelationExpr>, reference: ReferenceId) -> String {
    let members = memo.reference(reference).unwrap().all_member_expressions();
    assert_eq!(members.len(), 1);
    members[0].to_string()
}

#[rq_ore::test]
fn correlations_are_bound_by_the_enclosing_select() {
    let (memo, t, inner, top) = memo();
    assert!(memo.correlated_to(t).unwrap().is_empty());
    assert_eq!(
        memo.correlated_to(inner).unwrap().into_iter().collect::<Vec<_>>(),
        vec![CorrelationIdentifier::from("o")]
    );
    assert!(memo.correlated_to(top).unwrap().is_empty());
}

#[rq_ore::test]
fn translation_rewrites_values() {
    let (mut memo, t, inner, top) = memo();
    let translated = translate_correlations(&mut memo, &[top, inner], &rename_outer(), false).unwrap();
    assert_eq!(translated[0], top);
    assert_ne!(translated[1], inner);
    assert_eq!(memo.len(), 4);
    assert_eq!(
        only_member(&memo, translated[1]),
        format!(
            "(select (each q {}) (where (and (= (col q a) (col n x)) (< 1 2))) (project (+ (col n y) 0)))",
            t
        )
    );
    assert_eq!(
        only_member(&memo, inner),
        format!(
            "(select (each q {}) (where (and (= (col q a) (col o x)) (< 1 2))) (project (+ (col o y) 0)))",
            t
        )
    );
}

#[rq_ore::test]
fn translation_can_simplify_values() {
    let (mut memo, t, inner, _) = memo();
    let translated = translate_correlations(&mut memo, &[inner], &rename_outer(), true).unwrap();
    assert_eq!(
        only_member(&memo, translated[0]),
        format!(
            "(select (each q {}) (where (= (col q a) (col n x))) (project (col n y)))",
            t
        )
    );
}
