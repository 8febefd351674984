// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! A textual syntax for scalar expressions and predicates.
//!
//! Expressions are written as s-expressions, the same way they are displayed:
//!
//! ```text
//! (and (= (param p) 5) (not (< (col q a) (+ 1 (col q b)))))
//! ```
//!
//! Atoms are `null`, `true`, `false`, integers and double-quoted strings. Predicates
//! additionally accept `unknown`.

use std::iter::Peekable;
use std::rc::Rc;
use std::str::CharIndices;

use rq_rewrite::Literal;

use crate::predicate::{Comparison, Predicate, Truth};
use crate::scalar::{ScalarExpr, ScalarFunc};

/// An error in the input, at byte offset `pos`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{msg} at position {pos}")]
pub struct ParseError {
    /// What was wrong.
    pub msg: String,
    /// The byte offset in the input where the problem was found.
    pub pos: usize,
}

/// Parses a single constant.
pub fn parse_literal(input: &str) -> Result<Literal, ParseError> {
    let sexp = parse_sexp(input)?;
    match literal(&sexp) {
        Some(literal) => Ok(literal),
        None => Err(sexp.error("expected a literal")),
    }
}

/// Parses a scalar expression.
pub fn parse_scalar(input: &str) -> Result<Rc<ScalarExpr>, ParseError> {
    scalar(&parse_sexp(input)?)
}

/// Parses a predicate.
pub fn parse_predicate(input: &str) -> Result<Rc<Predicate>, ParseError> {
    predicate(&parse_sexp(input)?)
}

#[derive(Debug)]
enum Sexp {
    Atom { pos: usize, text: String },
    Str { pos: usize, value: String },
    List { pos: usize, items: Vec<Sexp> },
}

impl Sexp {
    fn pos(&self) -> usize {
        match self {
            Sexp::Atom { pos, .. } | Sexp::Str { pos, .. } | Sexp::List { pos, .. } => *pos,
        }
    }

    fn error(&self, msg: impl Into<String>) -> ParseError {
        ParseError {
            msg: msg.into(),
            pos: self.pos(),
        }
    }

    fn atom(&self) -> Option<&str> {
        match self {
            Sexp::Atom { text, .. } => Some(text),
            _ => None,
        }
    }
}

fn parse_sexp(input: &str) -> Result<Sexp, ParseError> {
    let mut reader = Reader {
        chars: input.char_indices().peekable(),
        end: input.len(),
    };
    let sexp = reader.read()?;
    reader.skip_whitespace();
    match reader.chars.peek() {
        None => Ok(sexp),
        Some((pos, _)) => Err(ParseError {
            msg: "unexpected trailing input".into(),
            pos: *pos,
        }),
    }
}

struct Reader<'a> {
    chars: Peekable<CharIndices<'a>>,
    end: usize,
}

impl<'a> Reader<'a> {
    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    fn read(&mut self) -> Result<Sexp, ParseError> {
        self.skip_whitespace();
        let Some((pos, c)) = self.chars.next() else {
            return Err(ParseError {
                msg: "unexpected end of input".into(),
                pos: self.end,
            });
        };
        match c {
            '(' => {
                let mut items = Vec::new();
                loop {
                    self.skip_whitespace();
                    match self.chars.peek() {
                        Some((_, ')')) => {
                            self.chars.next();
                            return Ok(Sexp::List { pos, items });
                        }
                        Some(_) => items.push(self.read()?),
                        None => {
                            return Err(ParseError {
                                msg: "unclosed parenthesis".into(),
                                pos,
                            })
                        }
                    }
                }
            }
            ')' => Err(ParseError {
                msg: "unexpected closing parenthesis".into(),
                pos,
            }),
            '"' => {
                let mut value = String::new();
                loop {
                    match self.chars.next() {
                        Some((_, '"')) => return Ok(Sexp::Str { pos, value }),
                        Some((escape_pos, '\\')) => match self.chars.next() {
                            Some((_, 'n')) => value.push('\n'),
                            Some((_, 't')) => value.push('\t'),
                            Some((_, c @ ('"' | '\\'))) => value.push(c),
                            _ => {
                                return Err(ParseError {
                                    msg: "invalid escape".into(),
                                    pos: escape_pos,
                                })
                            }
                        },
                        Some((_, c)) => value.push(c),
                        None => {
                            return Err(ParseError {
                                msg: "unterminated string".into(),
                                pos,
                            })
                        }
                    }
                }
            }
            c => {
                let mut text = String::from(c);
                while let Some((_, c)) = self
                    .chars
                    .next_if(|(_, c)| !c.is_whitespace() && !matches!(c, '(' | ')' | '"'))
                {
                    text.push(c);
                }
                Ok(Sexp::Atom { pos, text })
            }
        }
    }
}

fn literal(sexp: &Sexp) -> Option<Literal> {
    match sexp {
        Sexp::Str { value, .. } => Some(Literal::String(value.clone())),
        Sexp::Atom { text, .. } => match text.as_str() {
            "null" => Some(Literal::Null),
            "true" => Some(Literal::Bool(true)),
            "false" => Some(Literal::Bool(false)),
            text => text.parse().ok().map(Literal::Int),
        },
        Sexp::List { .. } => None,
    }
}

/// Splits a list into its head atom and its arguments.
fn call<'s>(sexp: &'s Sexp, what: &str) -> Result<(&'s str, &'s [Sexp]), ParseError> {
    let Sexp::List { items, .. } = sexp else {
        return Err(sexp.error(format!("expected {}", what)));
    };
    let Some((head, args)) = items.split_first() else {
        return Err(sexp.error(format!("expected {}, found ()", what)));
    };
    match head.atom() {
        Some(name) => Ok((name, args)),
        None => Err(head.error("expected an operator name")),
    }
}

fn arity<'s, const N: usize>(
    sexp: &Sexp,
    name: &str,
    args: &'s [Sexp],
) -> Result<&'s [Sexp; N], ParseError> {
    args.try_into().map_err(|_| {
        sexp.error(format!(
            "{} takes {} arguments, found {}",
            name,
            N,
            args.len()
        ))
    })
}

fn identifier<'s>(sexp: &'s Sexp) -> Result<&'s str, ParseError> {
    sexp.atom().ok_or_else(|| sexp.error("expected an identifier"))
}

fn scalar(sexp: &Sexp) -> Result<Rc<ScalarExpr>, ParseError> {
    if let Some(literal) = literal(sexp) {
        return Ok(ScalarExpr::literal(literal));
    }
    let (name, args) = call(sexp, "a scalar expression")?;
    let func = match name {
        "col" => {
            let [quantifier, column] = arity(sexp, name, args)?;
            return Ok(ScalarExpr::column(
                identifier(quantifier)?,
                identifier(column)?,
            ));
        }
        "param" => {
            let [parameter] = arity(sexp, name, args)?;
            return Ok(ScalarExpr::parameter(identifier(parameter)?));
        }
        "field" => {
            let [position, record] = arity(sexp, name, args)?;
            let position = identifier(position)?
                .parse()
                .map_err(|_| position.error("expected a field position"))?;
            return Ok(ScalarExpr::call(
                ScalarFunc::Field(position),
                vec![scalar(record)?],
            ));
        }
        "neg" => ScalarFunc::Neg,
        "abs" => ScalarFunc::Abs,
        "+" => ScalarFunc::Add,
        "-" => ScalarFunc::Sub,
        "*" => ScalarFunc::Mul,
        "record" => ScalarFunc::Record,
        name => return Err(sexp.error(format!("unknown function {}", name))),
    };
    if let Some(expected) = func.arity() {
        if args.len() != expected {
            return Err(sexp.error(format!(
                "{} takes {} arguments, found {}",
                name,
                expected,
                args.len()
            )));
        }
    }
    let args = args.iter().map(scalar).collect::<Result<_, _>>()?;
    Ok(ScalarExpr::call(func, args))
}

fn predicate(sexp: &Sexp) -> Result<Rc<Predicate>, ParseError> {
    match sexp.atom() {
        Some("true") => return Ok(Predicate::constant(Truth::True)),
        Some("false") => return Ok(Predicate::constant(Truth::False)),
        Some("unknown") => return Ok(Predicate::constant(Truth::Unknown)),
        _ => {}
    }
    let (name, args) = call(sexp, "a predicate")?;
    match name {
        "and" | "or" => {
            let operands = args.iter().map(predicate).collect::<Result<_, _>>()?;
            Ok(if name == "and" {
                Predicate::and(operands)
            } else {
                Predicate::or(operands)
            })
        }
        "not" => {
            let [operand] = arity(sexp, name, args)?;
            Ok(Predicate::not(predicate(operand)?))
        }
        "is-null" => {
            let [operand] = arity(sexp, name, args)?;
            Ok(Predicate::is_null(scalar(operand)?))
        }
        name => {
            let Some(op) = Comparison::ALL.into_iter().find(|op| op.symbol() == name) else {
                return Err(sexp.error(format!("unknown predicate {}", name)));
            };
            let [left, right] = arity(sexp, name, args)?;
            Ok(Predicate::compare(op, scalar(left)?, scalar(right)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rq_ore::test]
    fn display_round_trips() {
        for input in [
            "(field 1 (record (col q a) (+ (param p) null)))",
            "(abs (neg \"x\"))",
            "(- (* 2 3) -4)",
        ] {
            assert_eq!(parse_scalar(input).unwrap().to_string(), input);
        }
        for input in [
            "(and (= (param p) 5) (not (< (col q a) 3)))",
            "(or true unknown (is-null (col q b)) (<> 1 2))",
            "(and)",
        ] {
            assert_eq!(parse_predicate(input).unwrap().to_string(), input);
        }
    }

    #[rq_ore::test]
    fn literals() {
        assert_eq!(parse_literal(" 42 "), Ok(Literal::Int(42)));
        assert_eq!(parse_literal("null"), Ok(Literal::Null));
        assert_eq!(parse_literal("false"), Ok(Literal::Bool(false)));
        assert_eq!(
            parse_literal(r#""a \"b\"""#),
            Ok(Literal::String("a \"b\"".into()))
        );
        assert_eq!(
            parse_literal("(col q a)").unwrap_err().to_string(),
            "expected a literal at position 0"
        );
    }

    #[rq_ore::test]
    fn errors_point_at_the_input() {
        let error = |input| parse_scalar(input).unwrap_err().to_string();
        assert_eq!(error("(+ 1"), "unclosed parenthesis at position 0");
        assert_eq!(error("(+ 1 2) 3"), "unexpected trailing input at position 8");
        assert_eq!(error("(+ 1 (foo))"), "unknown function foo at position 5");
        assert_eq!(error("(neg 1 2)"), "neg takes 1 arguments, found 2 at position 0");
        assert_eq!(error(""), "unexpected end of input at position 0");
        assert_eq!(
            parse_predicate("(< 1)").unwrap_err().to_string(),
            "< takes 2 arguments, found 1 at position 0"
        );
    }
}
