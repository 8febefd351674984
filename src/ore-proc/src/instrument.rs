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

//! `instrument` macro with a `skip_all` default.
//!
//! This wraps the `tracing::instrument` macro and:
//! - adds `skip_all`
//! - errors on `skip`
//!
//! By enforcing the use of `skip_all`, users must use the `fields` argument of the
//! `tracing::instrument` macro to manually select their desired fields.

use proc_macro::{TokenStream, TokenTree};
use proc_macro2::TokenStream as TokenStream2;

use crate::compile_error;

pub fn instrument_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    // syn is not able to parse the `%` part of things like `#[instrument(fields(rule =
    // %name))]`, so we use the more naive proc_macro crate and look for identifiers.
    let mut args = String::from("skip_all");
    let mut delim = ",";
    for tok in attr {
        if let TokenTree::Ident(ident) = &tok {
            match ident.to_string().as_str() {
                "skip_all" => {
                    return compile_error("skip_all already included; remove it").into();
                }
                "skip" => return compile_error("skip prohibited; use fields").into(),
                _ => {}
            }
        }
        args.push_str(delim);
        delim = "";
        args.push_str(&tok.to_string());
    }
    let res = format!("#[::tracing::instrument({args})]\n{item}");
    match res.parse::<TokenStream2>() {
        Ok(stream) => stream.into(),
        Err(e) => compile_error(&format!("failed to expand instrument: {e}")).into(),
    }
}
