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

//! ID generation utilities.

use std::marker::PhantomData;

/// Manages the allocation of unique IDs.
#[derive(Debug, Clone)]
pub struct Gen<Id: From<u64>> {
    id: u64,
    phantom: PhantomData<Id>,
}

impl<Id: From<u64>> Default for Gen<Id> {
    fn default() -> Self {
        Self {
            id: 0,
            phantom: PhantomData,
        }
    }
}

impl<Id: From<u64>> Gen<Id> {
    /// Allocates a new identifier of type `Id` and advances the generator.
    pub fn allocate_id(&mut self) -> Id {
        let id = self.id;
        self.id += 1;
        id.into()
    }

    /// The number of identifiers allocated so far.
    pub fn allocated(&self) -> u64 {
        self.id
    }
}

/// A generator of u64-bit IDs.
pub type IdGen = Gen<u64>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    struct Handle(u64);

    impl From<u64> for Handle {
        fn from(id: u64) -> Self {
            Handle(id)
        }
    }

    #[test]
    fn allocates_dense_ids() {
        let mut gen = Gen::<Handle>::default();
        assert_eq!(gen.allocate_id(), Handle(0));
        assert_eq!(gen.allocate_id(), Handle(1));
        assert_eq!(gen.allocated(), 2);
    }
}
