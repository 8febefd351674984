// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Correlation identifiers and maps between them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// A symbolic name an expression can depend on.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CorrelationIdentifier(String);

impl CorrelationIdentifier {
    /// Creates an identifier with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        CorrelationIdentifier(name.into())
    }

    /// The name of this identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CorrelationIdentifier {
    fn from(name: &str) -> Self {
        CorrelationIdentifier::new(name)
    }
}

impl fmt::Display for CorrelationIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A set of correlation identifiers.
pub type CorrelationSet = BTreeSet<CorrelationIdentifier>;

/// Values that depend on correlation identifiers.
pub trait Correlated {
    /// The identifiers this value depends on, transitively.
    fn correlated_to(&self) -> CorrelationSet;
}

/// An equivalence between aliases, established by the enclosing query.
///
/// Rules consult it to treat two differently named aliases as the same.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasMap {
    equalities: BTreeMap<CorrelationIdentifier, BTreeSet<CorrelationIdentifier>>,
}

impl AliasMap {
    /// An alias map without equalities.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Records that `left` and `right` name the same thing.
    ///
    /// Equalities are closed transitively: every alias already equal to `left` becomes
    /// equal to every alias already equal to `right`.
    pub fn with_equality(
        mut self,
        left: CorrelationIdentifier,
        right: CorrelationIdentifier,
    ) -> Self {
        let mut class = self.equalities.remove(&left).unwrap_or_default();
        class.extend(self.equalities.remove(&right).unwrap_or_default());
        class.insert(left);
        class.insert(right);
        for member in &class {
            self.equalities.insert(member.clone(), class.clone());
        }
        self
    }

    /// Whether `left` and `right` name the same thing, directly or through a chain of
    /// recorded equalities.
    pub fn are_equal(&self, left: &CorrelationIdentifier, right: &CorrelationIdentifier) -> bool {
        left == right
            || self
                .equalities
                .get(left)
                .map_or(false, |equal| equal.contains(right))
    }

    /// Whether no equalities have been recorded.
    pub fn is_empty(&self) -> bool {
        self.equalities.is_empty()
    }
}

/// A renaming of correlation identifiers, from source to target.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationMap {
    mapping: BTreeMap<CorrelationIdentifier, CorrelationIdentifier>,
}

impl TranslationMap {
    /// A translation map that renames nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Starts building a translation map.
    pub fn builder() -> TranslationMapBuilder {
        TranslationMapBuilder::default()
    }

    /// Whether `alias` is renamed by this map.
    pub fn contains_source_alias(&self, alias: &CorrelationIdentifier) -> bool {
        self.mapping.contains_key(alias)
    }

    /// Whether any element of `aliases` is renamed by this map.
    pub fn contains_any_source_alias(&self, aliases: &CorrelationSet) -> bool {
        aliases.iter().any(|alias| self.contains_source_alias(alias))
    }

    /// The new name for `alias`, if it is renamed.
    pub fn target(&self, alias: &CorrelationIdentifier) -> Option<&CorrelationIdentifier> {
        self.mapping.get(alias)
    }

    /// The new name for `alias`, or `alias` itself if it is not renamed.
    pub fn translate(&self, alias: &CorrelationIdentifier) -> CorrelationIdentifier {
        self.target(alias).unwrap_or(alias).clone()
    }

    /// The renamed aliases.
    pub fn sources(&self) -> impl Iterator<Item = &CorrelationIdentifier> {
        self.mapping.keys()
    }

    /// Whether the map renames nothing.
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}

/// Builds a [`TranslationMap`].
#[derive(Debug, Default)]
pub struct TranslationMapBuilder {
    mapping: BTreeMap<CorrelationIdentifier, CorrelationIdentifier>,
}

impl TranslationMapBuilder {
    /// Renames `source` to `target`, replacing any earlier renaming of `source`.
    pub fn when(mut self, source: CorrelationIdentifier, target: CorrelationIdentifier) -> Self {
        self.mapping.insert(source, target);
        self
    }

    /// Finishes the map.
    pub fn build(self) -> TranslationMap {
        TranslationMap {
            mapping: self.mapping,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> CorrelationIdentifier {
        CorrelationIdentifier::from(name)
    }

    #[test]
    fn alias_equality_is_symmetric() {
        let map = AliasMap::empty().with_equality(id("q"), id("r"));
        assert!(map.are_equal(&id("q"), &id("r")));
        assert!(map.are_equal(&id("r"), &id("q")));
        assert!(map.are_equal(&id("s"), &id("s")));
        assert!(!map.are_equal(&id("q"), &id("s")));
    }

    #[test]
    fn alias_equality_is_transitive() {
        let map = AliasMap::empty()
            .with_equality(id("a"), id("b"))
            .with_equality(id("c"), id("d"))
            .with_equality(id("b"), id("c"));
        for (left, right) in [("a", "c"), ("c", "a"), ("a", "d"), ("d", "b")] {
            assert!(map.are_equal(&id(left), &id(right)), "{left} = {right}");
        }
        assert!(!map.are_equal(&id("a"), &id("e")));

        let chained = AliasMap::empty()
            .with_equality(id("x"), id("y"))
            .with_equality(id("y"), id("z"));
        assert!(chained.are_equal(&id("x"), &id("z")));
        assert!(chained.are_equal(&id("z"), &id("x")));
    }

    #[test]
    fn translation() {
        let map = TranslationMap::builder().when(id("q"), id("q2")).build();
        assert_eq!(map.translate(&id("q")), id("q2"));
        assert_eq!(map.translate(&id("r")), id("r"));
        assert!(map.contains_any_source_alias(&[id("r"), id("q")].into_iter().collect()));
        assert!(!map.contains_any_source_alias(&[id("r")].into_iter().collect()));
    }
}
