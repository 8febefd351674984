// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Runs the rule sets over expressions written in the textual syntax.
//!
//! Directive arguments of the form `name=value` bind parameter `name` to `value`
//! and mark it as constant for the execution. Set the `REWRITE` environment
//! variable to update the expected output.

use std::collections::HashMap;
use std::fmt::Display;

use rq_expr::rules::{default_predicate_rules, default_scalar_rules, normalization_predicate_rules};
use rq_expr::{parse_literal, parse_predicate, parse_scalar};
use rq_rewrite::{
    optimize, simplify, simplify_current, AliasMap, Constrained, CorrelationIdentifier,
    CorrelationSet, EvaluationContext,
};

#[rq_ore::test]
#[cfg_attr(miri, ignore)]
fn run_tests() {
    datadriven::walk("tests/testdata", |f| {
        f.run(|test_case| -> String {
            let result = match test_case.directive.as_str() {
                "simplify-scalar" => simplify_scalar(&test_case.input, &test_case.args),
                "variants-scalar" => variants_scalar(&test_case.input, &test_case.args),
                "simplify-predicate" => simplify_predicate(&test_case.input, &test_case.args),
                "optimize-predicate" => optimize_predicate(&test_case.input, &test_case.args),
                _ => return format!("unknown directive: {}\n", test_case.directive),
            };
            match result {
                Ok(output) => output,
                Err(e) => format!("error: {}\n", e),
            }
        })
    });
}

type Args = HashMap<String, Vec<String>>;

/// The parameters bound by `args`, all of them constant.
fn environment(args: &Args) -> Result<(EvaluationContext, CorrelationSet), String> {
    let mut context = EvaluationContext::empty();
    let mut constant = CorrelationSet::new();
    for (name, values) in args {
        if name == "normalize" {
            continue;
        }
        let [value] = &values[..] else {
            return Err(format!("expected a single value for {}", name));
        };
        let value = parse_literal(value).map_err(|e| e.to_string())?;
        let parameter = CorrelationIdentifier::new(name.as_str());
        context = context.with_parameter(parameter.clone(), value);
        constant.insert(parameter);
    }
    Ok((context, constant))
}

fn print<T: Display>(constrained: Constrained<T>) -> String {
    let (value, constraint) = constrained.into_parts();
    format!("{}\nconstraint: {}\n", value, constraint)
}

fn simplify_scalar(input: &str, args: &Args) -> Result<String, String> {
    let (context, constant) = environment(args)?;
    let expr = parse_scalar(input.trim()).map_err(|e| e.to_string())?;
    let rules = default_scalar_rules().map_err(|e| e.to_string())?;
    let simplified = simplify(&expr, &context, &AliasMap::empty(), &constant, &rules)
        .map_err(|e| e.to_string())?;
    Ok(print(simplified))
}

fn variants_scalar(input: &str, args: &Args) -> Result<String, String> {
    let (context, constant) = environment(args)?;
    let expr = parse_scalar(input.trim()).map_err(|e| e.to_string())?;
    let rules = default_scalar_rules().map_err(|e| e.to_string())?;
    let variants = simplify_current(&expr, &context, &AliasMap::empty(), &constant, &rules)
        .map_err(|e| e.to_string())?;
    if variants.is_empty() {
        return Ok("no rewrites\n".into());
    }
    Ok(variants.into_iter().map(print).collect())
}

fn simplify_predicate(input: &str, args: &Args) -> Result<String, String> {
    let (context, constant) = environment(args)?;
    let predicate = parse_predicate(input.trim()).map_err(|e| e.to_string())?;
    let rules = if args.contains_key("normalize") {
        normalization_predicate_rules()
    } else {
        default_predicate_rules()
    }
    .map_err(|e| e.to_string())?;
    let simplified = simplify(&predicate, &context, &AliasMap::empty(), &constant, &rules)
        .map_err(|e| e.to_string())?;
    Ok(print(simplified))
}

fn optimize_predicate(input: &str, args: &Args) -> Result<String, String> {
    let (context, constant) = environment(args)?;
    let predicate = parse_predicate(input.trim()).map_err(|e| e.to_string())?;
    let rules = normalization_predicate_rules().map_err(|e| e.to_string())?;
    let optimized = optimize(&predicate, &context, &AliasMap::empty(), &constant, &rules)
        .map_err(|e| e.to_string())?;
    Ok(print(optimized))
}
