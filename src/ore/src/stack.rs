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

//! Stack management utilities.

use std::cell::Cell;
use std::error::Error;
use std::fmt;

/// The red zone is the amount of stack space that must be available on the
/// current stack in order for [`maybe_grow`] to call the supplied closure
/// without allocating a new stack.
pub const STACK_RED_ZONE: usize = 32 << 10; // 32KiB

/// The size of any freshly allocated stacks.
pub const STACK_SIZE: usize = 2 << 20; // 2MiB

/// Grows the stack if necessary before invoking `f`.
///
/// This function is intended to be called at manually instrumented points in a
/// program where arbitrarily deep recursion is known to happen. If the amount
/// of remaining stack space is less than [`STACK_RED_ZONE`], a new stack of
/// size [`STACK_SIZE`] is allocated and `f` runs on that stack.
#[inline(always)]
pub fn maybe_grow<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    stacker::maybe_grow(STACK_RED_ZONE, STACK_SIZE, f)
}

/// A trait for types which support bounded recursion to prevent stack overflow.
///
/// The rather odd design of this trait allows checked recursion to be added to
/// existing mutually recursive functions without threading an explicit `depth:
/// &mut usize` parameter through each function. As long as there is an
/// existing context structure, or if the mutually recursive functions are
/// methods on a context structure, the [`RecursionGuard`] can be embedded
/// inside this existing structure.
pub trait CheckedRecursion {
    /// Extracts a reference to the recursion guard embedded within the implementing
    /// type.
    fn recursion_guard(&self) -> &RecursionGuard;

    /// Checks whether it is safe to recur and calls `f` if so.
    ///
    /// If the recursion limit for the recursion guard returned by
    /// [`CheckedRecursion::recursion_guard`] has been reached, returns a
    /// `RecursionLimitError`. Otherwise, it will call `f`, possibly growing the
    /// stack if necessary.
    fn checked_recur<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RecursionLimitError>,
    {
        self.recursion_guard().descend()?;
        let out = maybe_grow(|| f(self));
        self.recursion_guard().ascend();
        out
    }

    /// Like [`CheckedRecursion::checked_recur`], but operates on a mutable
    /// reference to `Self`.
    fn checked_recur_mut<F, T, E>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<RecursionLimitError>,
    {
        self.recursion_guard().descend()?;
        let out = maybe_grow(|| f(self));
        self.recursion_guard().ascend();
        out
    }
}

/// Tracks recursion depth.
///
/// See the [`CheckedRecursion`] trait for usage instructions.
#[derive(Default, Debug, Clone)]
pub struct RecursionGuard {
    depth: Cell<usize>,
    limit: usize,
}

impl RecursionGuard {
    /// Constructs a new recursion guard with the specified recursion
    /// limit.
    pub fn with_limit(limit: usize) -> RecursionGuard {
        RecursionGuard {
            depth: Cell::new(0),
            limit,
        }
    }

    /// The current recursion depth.
    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    fn descend(&self) -> Result<(), RecursionLimitError> {
        let depth = self.depth.get();
        if depth < self.limit {
            self.depth.set(depth + 1);
            Ok(())
        } else {
            Err(RecursionLimitError { limit: self.limit })
        }
    }

    fn ascend(&self) {
        self.depth.set(self.depth.get() - 1);
    }
}

/// A [`RecursionGuard`]'s recursion limit was reached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecursionLimitError {
    limit: usize,
}

impl RecursionLimitError {
    /// The limit that was exceeded.
    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl fmt::Display for RecursionLimitError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "exceeded recursion limit of {}", self.limit)
    }
}

impl Error for RecursionLimitError {}

#[cfg(test)]
mod tests {
    use super::*;

    struct Countdown {
        guard: RecursionGuard,
    }

    impl CheckedRecursion for Countdown {
        fn recursion_guard(&self) -> &RecursionGuard {
            &self.guard
        }
    }

    impl Countdown {
        fn recur(&self, n: usize) -> Result<usize, RecursionLimitError> {
            self.checked_recur(|this| if n == 0 { Ok(0) } else { Ok(1 + this.recur(n - 1)?) })
        }
    }

    #[test]
    fn within_limit() {
        let c = Countdown {
            guard: RecursionGuard::with_limit(16),
        };
        assert_eq!(c.recur(10), Ok(10));
        assert_eq!(c.guard.depth(), 0);
    }

    #[test]
    fn exceeds_limit() {
        let c = Countdown {
            guard: RecursionGuard::with_limit(4),
        };
        let err = c.recur(10).unwrap_err();
        assert_eq!(err.limit(), 4);
        assert_eq!(err.to_string(), "exceeded recursion limit of 4");
    }
}
