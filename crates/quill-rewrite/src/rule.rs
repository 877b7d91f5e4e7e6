use std::ops::ControlFlow;

use quill_core::Value;
use serde::{Deserialize, Serialize};

use crate::bindings::{option_name, Bindings};
use crate::error::{Result, RewriteError};
use crate::eval::Evaluate;
use crate::matcher::{Flow, Matcher, Rest, Stop, CONTINUE};
use crate::pattern::Pattern;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Delayed {
    /// `lhs -> rhs`: the right-hand side is used as given.
    No,
    /// `lhs :> rhs`: the right-hand side is evaluated after substitution.
    Yes,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub lhs: Pattern,
    pub lhs_source: Value,
    pub rhs: Value,
    pub delayed: Delayed,
}

impl Rule {
    pub fn new(lhs: Value, rhs: Value, delayed: Delayed) -> Result<Self> {
        let pattern = Pattern::compile(&lhs)?;
        Ok(Self { lhs: pattern, lhs_source: lhs, rhs, delayed })
    }

    pub fn immediate(lhs: Value, rhs: Value) -> Result<Self> { Self::new(lhs, rhs, Delayed::No) }

    pub fn delayed(lhs: Value, rhs: Value) -> Result<Self> { Self::new(lhs, rhs, Delayed::Yes) }

    /// From a `Rule[lhs, rhs]` or `RuleDelayed[lhs, rhs]` expression.
    pub fn from_value(v: &Value) -> Result<Self> {
        let delayed = if v.has_head("Rule") {
            Delayed::No
        } else if v.has_head("RuleDelayed") {
            Delayed::Yes
        } else {
            return Err(RewriteError::InvalidRule(v.clone()));
        };
        match v.args() {
            [lhs, rhs] => Self::new(lhs.clone(), rhs.clone(), delayed),
            args => Err(RewriteError::RuleArity { head: v.head().to_string(), got: args.len() }),
        }
    }

    pub fn to_value(&self) -> Value {
        let head = match self.delayed {
            Delayed::No => "Rule",
            Delayed::Yes => "RuleDelayed",
        };
        Value::call(head, vec![self.lhs_source.clone(), self.rhs.clone()])
    }

    /// First rewrite of `expr` by this rule. With `fully` false a Flat head
    /// may match a subset of its arguments; the rest are kept around the
    /// replacement.
    pub fn apply(&self, ev: &dyn Evaluate, expr: &Value, fully: bool) -> Option<Value> {
        let mut found = None;
        let _ = self.for_each_result(ev, expr, fully, &mut |v| {
            found = Some(v);
            ControlFlow::Break(Stop::Found)
        });
        found
    }

    /// Every rewrite of `expr` as a whole, in enumeration order, up to
    /// `limit` results.
    pub fn apply_list(&self, ev: &dyn Evaluate, expr: &Value, limit: Option<usize>) -> Vec<Value> {
        let mut out = Vec::new();
        if limit == Some(0) {
            return out;
        }
        let _ = self.for_each_result(ev, expr, true, &mut |v| {
            out.push(v);
            if limit.map_or(false, |n| out.len() >= n) { ControlFlow::Break(Stop::Limit) } else { CONTINUE }
        });
        out
    }

    pub(crate) fn for_each_result(
        &self,
        ev: &dyn Evaluate,
        expr: &Value,
        fully: bool,
        f: &mut dyn FnMut(Value) -> Flow,
    ) -> Flow {
        let arity = expr.args().len();
        Matcher::new(ev).match_partial(&self.lhs, expr, fully, &mut |binds, rest| {
            if !rest.is_empty() && rest.len() == arity {
                return CONTINUE;
            }
            let mut out = substitute(&self.rhs, binds);
            if self.delayed == Delayed::Yes {
                out = ev.evaluate(out);
            }
            if !rest.is_empty() {
                out = reattach(expr, rest, out);
            }
            f(out)
        })
    }
}

/// `head[before..., replaced, after...]` for a partial match of `expr`.
fn reattach(expr: &Value, rest: &Rest, replaced: Value) -> Value {
    let args = expr.args();
    let mut out: Vec<Value> = rest.before.iter().map(|&j| args[j].clone()).collect();
    out.extend(replaced.sequence_items().iter().cloned());
    out.extend(rest.after.iter().map(|&j| args[j].clone()));
    Value::expr(expr.head(), out)
}

/// Replaces bound symbols in `template`. A name bound to `Sequence[...]`
/// splices into its parent's arguments, and `OptionValue[name]` reads the
/// values collected by `OptionsPattern`.
pub fn substitute(template: &Value, binds: &Bindings) -> Value {
    if binds.is_empty() {
        return template.clone();
    }
    match template {
        Value::Symbol(s) => binds.get(s).cloned().unwrap_or_else(|| template.clone()),
        Value::Expr { head, args } => {
            if template.has_form("OptionValue", 1) {
                if let Some(v) = option_name(&args[0]).and_then(|n| binds.option(n)) {
                    return v.clone();
                }
            }
            let new_head = substitute(head, binds);
            let mut out = Vec::with_capacity(args.len());
            for a in args {
                if let Some(bound) = a.as_symbol().and_then(|s| binds.get(s)) {
                    if bound.is_sequence() {
                        out.extend(bound.args().iter().cloned());
                        continue;
                    }
                }
                out.push(substitute(a, binds));
            }
            Value::Expr { head: Box::new(new_head), args: out }
        }
        other => other.clone(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleSet(pub Vec<Rule>);

impl RuleSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }
    pub fn push(&mut self, r: Rule) {
        self.0.push(r);
    }
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.0.iter()
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn as_slice(&self) -> &[Rule] {
        &self.0
    }
}
