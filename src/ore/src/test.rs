// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository, or online at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Test utilities.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static LOG_INIT: Once = Once::new();

/// The environment variable that controls which events tests log.
pub const LOG_FILTER_VAR: &str = "RQ_TEST_LOG_FILTER";

/// Initializes a tracing subscriber that writes to the test harness' captured output.
///
/// The filter is read from `RQ_TEST_LOG_FILTER` and defaults to `info`. Calling this
/// function more than once is harmless; only the first call installs the subscriber.
pub fn init_logging() {
    init_logging_default("info");
}

/// Like [`init_logging`], but with a caller-chosen default filter.
pub fn init_logging_default(filter: &str) {
    LOG_INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_env(LOG_FILTER_VAR).unwrap_or_else(|_| EnvFilter::new(filter));
        // Another subscriber may already be installed by the embedding test binary.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_test_writer()
            .try_init();
    });
}
