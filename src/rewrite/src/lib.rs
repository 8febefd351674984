// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Rule-based rewriting of expression trees.
//!
//! This crate contains the machinery shared by every kind of expression the
//! optimizer rewrites: the [`TreeLike`] abstraction over nodes, the correlation
//! and constraint model, binding matchers, rules and rule sets, the rule call
//! handed to a rule when it fires, and the driver in [`simplification`] that
//! walks a tree and applies a rule set to it.
//!
//! Nodes are shared through [`Rc`](std::rc::Rc) and compared by pointer identity
//! while rewriting: a node is unchanged only if it is the very same allocation.
//! A rewrite that does not apply returns its input untouched.

#![warn(missing_docs)]
#![deny(missing_debug_implementations)]

use rq_ore::stack::RecursionLimitError;

pub mod call;
pub mod config;
pub mod constraint;
pub mod correlation;
pub mod eval;
pub mod identity;
pub mod matcher;
pub mod rule;
pub mod rule_set;
pub mod simplification;
pub mod tree;

pub use call::{ComputationRuleCall, RuleCall, SimplificationRuleCall};
pub use config::RewriteConfig;
pub use constraint::{Condition, Constrained, QueryPlanConstraint};
pub use correlation::{
    AliasMap, Correlated, CorrelationIdentifier, CorrelationSet, TranslationMap,
};
pub use eval::{EvaluationContext, Literal};
pub use identity::IdentityMap;
pub use matcher::{Bindings, Matcher};
pub use rule::{ComputationRule, PlannerRule, SimplificationRule};
pub use rule_set::{ComputationRuleSet, RuleSet, SimplificationRuleSet};
pub use simplification::{compute, optimize, optimize_with_config, simplify, simplify_current};
pub use tree::TreeLike;

/// The default bound on the depth of recursive traversals.
pub const RECURSION_LIMIT: usize = 2048;

/// Errors that can occur while rewriting.
///
/// Apart from [`RewriteError::Rule`], every variant reports a broken invariant
/// in a rule or in the driver. None of them are recoverable: the caller is
/// expected to abandon the planning attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RewriteError {
    /// A post-order traversal did not produce a result for every node.
    #[error("expected a mapped tree")]
    UnmappedTree,
    /// A rule yielded more than one result in a single application.
    #[error("rule {rule} yielded {count} results where at most one is allowed")]
    AmbiguousYield {
        /// The offending rule.
        rule: &'static str,
        /// How many results it yielded.
        count: usize,
    },
    /// A rule requested re-exploration outside of [`optimize`].
    #[error("rule {rule} requested re-exploration, which is only supported when optimizing")]
    UnexpectedReExploration {
        /// The offending rule.
        rule: &'static str,
    },
    /// A node requested re-exploration more often than allowed.
    #[error("exceeded re-exploration limit of {limit}")]
    ReExplorationLimit {
        /// The limit that was exceeded.
        limit: usize,
    },
    /// The ordering dependencies between the rules of a rule set form a cycle.
    #[error("rule dependencies have cycles")]
    CyclicRuleDependencies,
    /// A rule was declared to run after a rule that is not part of the rule set.
    #[error("rule {rule} depends on unknown rule {dependency}")]
    UnknownRuleDependency {
        /// The dependent rule.
        rule: &'static str,
        /// The missing dependency.
        dependency: &'static str,
    },
    /// A rule asked for a binding its matcher never produces.
    #[error("rule {rule} has no binding for {key}")]
    MissingBinding {
        /// The rule asking.
        rule: &'static str,
        /// The requested key.
        key: &'static str,
    },
    /// A rule failed.
    #[error("rule {rule} failed: {message}")]
    Rule {
        /// The failing rule.
        rule: &'static str,
        /// What went wrong.
        message: String,
    },
    /// A traversal recursed too deeply.
    #[error(transparent)]
    RecursionLimit(#[from] RecursionLimitError),
    /// An unstructured internal error.
    #[error("internal rewrite error: {0}")]
    Internal(String),
}
