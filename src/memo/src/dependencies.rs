// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The dependency order between references.

use std::collections::VecDeque;

use rq_ore::graph::PartialOrder;

use crate::expression::RelationalExpression;
use crate::memo::{Memo, ReferenceId};
use crate::MemoError;

/// Collects `references` and every reference reachable from them, ordered so
/// that a reference depends on each reference one of its members ranges over.
///
/// The walk visits each reference once, so a cycle among the references ends up
/// in the returned order rather than looping here.
pub fn references_and_dependencies<E: RelationalExpression>(
    memo: &Memo<E>,
    references: &[ReferenceId],
) -> Result<PartialOrder<ReferenceId>, MemoError> {
    let mut order = PartialOrder::new();
    let mut queue = VecDeque::new();
    for reference in references {
        if order.add_element(*reference) {
            queue.push_back(*reference);
        }
    }

    while let Some(reference) = queue.pop_front() {
        for member in memo.get(reference)?.all_member_expressions() {
            for quantifier in member.quantifiers() {
                let child = quantifier.ranges_over();
                if order.add_element(child) {
                    queue.push_back(child);
                }
                order.add_dependency(reference, child);
            }
        }
    }
    Ok(order)
}
