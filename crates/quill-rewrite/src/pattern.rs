//! Compiled patterns.
//!
//! `Pattern::compile` turns a pattern expression (`f[x_, y__]`,
//! `_Integer?Positive`, ...) into a closed tree the matcher can walk without
//! re-inspecting head symbols.

use std::cell::OnceCell;

use quill_core::Value;

use crate::error::{Result, RewriteError};
use crate::quick::QuickTest;

#[derive(Debug, Clone)]
pub enum Pattern {
    /// `_` or `_h`: exactly one item, optionally with head `h`.
    Blank(Option<Value>),
    /// `__` or `__h`: one or more items.
    BlankSequence(Option<Value>),
    /// `___` or `___h`: zero or more items.
    BlankNullSequence(Option<Value>),
    Named { name: String, inner: Box<Pattern> },
    Optional { inner: Box<Pattern>, default: Option<Value> },
    Alternatives(Vec<Pattern>),
    Except { excluded: Box<Pattern>, fallback: Box<Pattern> },
    Verbatim(Value),
    HoldPattern(Box<Pattern>),
    PatternTest { inner: Box<Pattern>, test: Value, quick: Option<QuickTest> },
    Condition { inner: Box<Pattern>, guard: Value },
    Repeated { inner: Box<Pattern>, min: usize, max: Option<usize> },
    OptionsPattern(OptionsPattern),
    Expression(ExprPattern),
    Literal(Value),
}

#[derive(Debug, Clone)]
pub struct OptionsPattern {
    /// `OptionsPattern[{a -> 1, f}]`: explicit defaults; symbols pull in
    /// their declared options.
    pub defaults: Option<Value>,
    /// Defaults inherited from the enclosing head, fixed on first use.
    pub(crate) inherited: OnceCell<Vec<(String, Value)>>,
}

/// A compound pattern `head[elements...]`.
#[derive(Debug, Clone)]
pub struct ExprPattern {
    pub head: Box<Pattern>,
    pub elements: Vec<Pattern>,
    /// Element visiting order used when the head is Orderless.
    pub(crate) orderless_order: Vec<usize>,
}

pub fn compile_pattern(expr: &Value) -> Result<Pattern> { Pattern::compile(expr) }

fn arity(head: &str, args: &[Value], min: usize, max: usize, expected: &'static str) -> Result<()> {
    if args.len() < min || args.len() > max {
        return Err(RewriteError::PatternArity { head: head.to_string(), got: args.len(), expected });
    }
    Ok(())
}

fn boxed(v: &Value) -> Result<Box<Pattern>> { Pattern::compile(v).map(Box::new) }

impl Pattern {
    pub fn compile(expr: &Value) -> Result<Pattern> {
        let Value::Expr { head, args } = expr else {
            return Ok(Pattern::Literal(expr.clone()));
        };
        let Some(name) = head.as_symbol() else {
            return compile_expression(head, args);
        };
        let pattern = match name {
            "Blank" | "BlankSequence" | "BlankNullSequence" => {
                arity(name, args, 0, 1, "0 or 1 arguments are")?;
                let h = args.first().cloned();
                match name {
                    "Blank" => Pattern::Blank(h),
                    "BlankSequence" => Pattern::BlankSequence(h),
                    _ => Pattern::BlankNullSequence(h),
                }
            }
            "Pattern" => {
                arity(name, args, 2, 2, "2 arguments are")?;
                let var = args[0].as_symbol().ok_or_else(|| RewriteError::InvalidPatternName(expr.clone()))?;
                Pattern::Named { name: var.to_string(), inner: boxed(&args[1])? }
            }
            "Optional" => {
                arity(name, args, 1, 2, "1 or 2 arguments are")?;
                Pattern::Optional { inner: boxed(&args[0])?, default: args.get(1).cloned() }
            }
            "Alternatives" => Pattern::Alternatives(args.iter().map(Pattern::compile).collect::<Result<_>>()?),
            "Except" => {
                arity(name, args, 1, 2, "1 or 2 arguments are")?;
                let fallback = match args.get(1) {
                    Some(p) => boxed(p)?,
                    None => Box::new(Pattern::Blank(None)),
                };
                Pattern::Except { excluded: boxed(&args[0])?, fallback }
            }
            "Verbatim" => {
                arity(name, args, 1, 2, "1 or 2 arguments are")?;
                Pattern::Verbatim(args[0].clone())
            }
            "HoldPattern" => {
                arity(name, args, 1, 1, "1 argument is")?;
                Pattern::HoldPattern(boxed(&args[0])?)
            }
            "PatternTest" => {
                arity(name, args, 2, 2, "2 arguments are")?;
                Pattern::PatternTest { inner: boxed(&args[0])?, test: args[1].clone(), quick: QuickTest::lookup(&args[1]) }
            }
            "Condition" => {
                arity(name, args, 2, 2, "2 arguments are")?;
                Pattern::Condition { inner: boxed(&args[0])?, guard: args[1].clone() }
            }
            "Repeated" | "RepeatedNull" => {
                arity(name, args, 1, 2, "1 or 2 arguments are")?;
                let floor = if name == "Repeated" { 1 } else { 0 };
                let (min, max) = match args.get(1) {
                    None => (floor, None),
                    Some(range) => repeat_range(range, floor).ok_or_else(|| RewriteError::RepeatedRange(expr.clone()))?,
                };
                Pattern::Repeated { inner: boxed(&args[0])?, min, max }
            }
            "OptionsPattern" => {
                arity(name, args, 0, 1, "0 or 1 arguments are")?;
                Pattern::OptionsPattern(OptionsPattern { defaults: args.first().cloned(), inherited: OnceCell::new() })
            }
            _ => return compile_expression(head, args),
        };
        Ok(pattern)
    }

    /// How many sibling items this pattern can absorb, as `(min, max)` with
    /// `None` meaning unbounded.
    pub fn match_count(&self) -> (usize, Option<usize>) {
        match self {
            Pattern::Blank(_) => (1, Some(1)),
            Pattern::BlankSequence(_) => (1, None),
            Pattern::BlankNullSequence(_) | Pattern::OptionsPattern(_) => (0, None),
            Pattern::Optional { .. } => (0, Some(1)),
            Pattern::Repeated { min, max, .. } => (*min, *max),
            Pattern::Named { inner, .. }
            | Pattern::HoldPattern(inner)
            | Pattern::PatternTest { inner, .. }
            | Pattern::Condition { inner, .. } => inner.match_count(),
            Pattern::Alternatives(alts) => {
                let mut counts = alts.iter().map(Pattern::match_count);
                let Some(first) = counts.next() else { return (1, Some(1)) };
                counts.fold(first, |(lo, hi), (l, h)| {
                    (lo.min(l), hi.zip(h).map(|(a, b)| a.max(b)))
                })
            }
            Pattern::Except { .. } | Pattern::Verbatim(_) | Pattern::Expression(_) | Pattern::Literal(_) => (1, Some(1)),
        }
    }

    /// Patterns that may absorb a run of a Flat head's arguments wrapped in
    /// that head.
    pub(crate) fn is_wildcard(&self) -> bool {
        matches!(
            self,
            Pattern::Named { .. }
                | Pattern::PatternTest { .. }
                | Pattern::Condition { .. }
                | Pattern::Optional { .. }
                | Pattern::Blank(_)
                | Pattern::BlankSequence(_)
                | Pattern::BlankNullSequence(_)
                | Pattern::Alternatives(_)
                | Pattern::Repeated { .. }
        )
    }

    pub(crate) fn is_optional(&self) -> bool {
        match self {
            Pattern::Optional { .. } => true,
            Pattern::Named { inner, .. } => inner.is_optional(),
            _ => false,
        }
    }

    /// Cheap filter on a single argument. Never rejects an argument the
    /// full match would accept on its own.
    pub(crate) fn could_match(&self, item: &Value) -> bool {
        match self {
            Pattern::Blank(Some(h)) | Pattern::BlankSequence(Some(h)) | Pattern::BlankNullSequence(Some(h)) => item.head_is(h),
            Pattern::Named { inner, .. }
            | Pattern::HoldPattern(inner)
            | Pattern::PatternTest { inner, .. }
            | Pattern::Condition { inner, .. } => inner.could_match(item),
            Pattern::Verbatim(v) | Pattern::Literal(v) => v == item,
            Pattern::OptionsPattern(_) => item.has_head("Rule") || item.has_head("RuleDelayed") || item.has_head("List"),
            _ => true,
        }
    }

    /// Stable sort key for elements of an Orderless pattern: literal parts
    /// first, then single wildcards, then sequences, then nullable ones.
    fn orderless_rank(&self) -> u8 {
        match self.match_count() {
            (0, _) => 3,
            (_, None) => 2,
            _ if self.is_wildcard() || matches!(self, Pattern::Except { .. }) => 1,
            _ => 0,
        }
    }
}

fn compile_expression(head: &Value, args: &[Value]) -> Result<Pattern> {
    let elements: Vec<Pattern> = args.iter().map(Pattern::compile).collect::<Result<_>>()?;
    let mut orderless_order: Vec<usize> = (0..elements.len()).collect();
    orderless_order.sort_by_key(|&i| elements[i].orderless_rank());
    Ok(Pattern::Expression(ExprPattern { head: boxed(head)?, elements, orderless_order }))
}

/// `n`, `{n}` or `{min, max}`; `Infinity` is accepted as an open maximum.
fn repeat_range(range: &Value, floor: usize) -> Option<(usize, Option<usize>)> {
    let count = |v: &Value| -> Option<usize> { v.as_int().and_then(|n| usize::try_from(n).ok()) };
    if range.has_head("List") {
        return match range.args() {
            [n] => count(n).map(|n| (n, Some(n))),
            [lo, hi] => {
                let lo = count(lo)?;
                if hi.is_symbol("Infinity") {
                    return Some((lo, None));
                }
                let hi = count(hi)?;
                (lo <= hi).then_some((lo, Some(hi)))
            }
            _ => None,
        };
    }
    count(range).map(|n| (floor, Some(n)))
}

impl ExprPattern {
    /// The literal head value, when the head pattern is a plain literal.
    pub fn literal_head(&self) -> Option<&Value> {
        match self.head.as_ref() {
            Pattern::Literal(v) => Some(v),
            _ => None,
        }
    }

    pub fn head_symbol(&self) -> Option<&str> { self.literal_head().and_then(Value::as_symbol) }

    /// Arity check for heads that are not Flat: the candidate's argument
    /// count must fit the elements' combined count range.
    pub(crate) fn admits_arity(&self, n: usize) -> bool {
        let mut min = 0usize;
        let mut max = Some(0usize);
        for e in &self.elements {
            let (lo, hi) = e.match_count();
            min += lo;
            max = max.zip(hi).map(|(a, b)| a + b);
        }
        n >= min && max.map_or(true, |m| n <= m)
    }

    pub(crate) fn visit_order(&self, orderless: bool) -> Vec<usize> {
        if orderless { self.orderless_order.clone() } else { (0..self.elements.len()).collect() }
    }
}
