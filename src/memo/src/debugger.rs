// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! A hook for observing the memo at work.
//!
//! Nothing is reported unless a [`Debugger`] is installed on the current thread.

use std::cell::RefCell;

use crate::memo::ReferenceId;

/// Something that happened while working with the memo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A member of `reference` was rewritten by a correlation translation.
    TranslateCorrelations {
        /// The reference the original member belongs to.
        reference: ReferenceId,
        /// The rewritten member.
        expression: String,
    },
}

/// Receives [`Event`]s.
pub trait Debugger {
    /// Called once per event.
    fn on_event(&mut self, event: &Event);
}

thread_local! {
    static DEBUGGER: RefCell<Option<Box<dyn Debugger>>> = RefCell::new(None);
}

/// Installs `debugger` on the current thread and returns the one it replaces.
/// Passing `None` uninstalls it.
pub fn set_debugger(debugger: Option<Box<dyn Debugger>>) -> Option<Box<dyn Debugger>> {
    DEBUGGER.with(|cell| cell.replace(debugger))
}

/// Calls `f` with the installed debugger, if there is one.
///
/// Events raised by the debugger itself are dropped.
pub(crate) fn with_debugger<F>(f: F)
where
    F: FnOnce(&mut dyn Debugger),
{
    DEBUGGER.with(|cell| {
        if let Ok(mut installed) = cell.try_borrow_mut() {
            if let Some(debugger) = installed.as_mut() {
                f(&mut **debugger);
            }
        }
    })
}
