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

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, ItemFn};

use crate::compile_error;

/// Expands `#[rq_ore::test]` into a regular `#[test]` whose body first initializes
/// logging through `rq_ore::test::init_logging`.
pub fn test_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return compile_error("#[rq_ore::test] does not take arguments").into();
    }
    let item = parse_macro_input!(item as ItemFn);
    expand(item).unwrap_or_else(compile_error).into()
}

fn expand(item: ItemFn) -> Result<TokenStream2, &'static str> {
    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = item;

    if sig.asyncness.is_some() {
        return Err("#[rq_ore::test] does not support async functions");
    }

    Ok(quote! {
        #[::core::prelude::v1::test]
        #(#attrs)*
        #vis #sig {
            ::rq_ore::test::init_logging();
            #block
        }
    })
}
