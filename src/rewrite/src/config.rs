// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Knobs for the rewrite driver.

use serde::{Deserialize, Serialize};

use crate::RECURSION_LIMIT;

/// Bounds on the work [`optimize_with_config`](crate::simplification::optimize_with_config) does.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// How deep the re-exploring traversal may recurse.
    pub recursion_limit: usize,
    /// How many times a single node may be explored again after a rule requested it.
    pub max_re_explorations: usize,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        RewriteConfig {
            recursion_limit: RECURSION_LIMIT,
            max_re_explorations: 64,
        }
    }
}
