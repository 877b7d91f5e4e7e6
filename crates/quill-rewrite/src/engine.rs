use std::borrow::Cow;

use log::{debug, warn};
use quill_core::Value;

use crate::config::RewriteConfig;
use crate::dispatch::Dispatch;
use crate::error::{Result, RewriteError, ITERATION_LIMIT};
use crate::eval::Evaluate;
use crate::level::LevelSpec;
use crate::matcher::Matcher;
use crate::pattern::Pattern;
use crate::rule::Rule;

/// Symbol returned when a repeated rewrite is cancelled.
pub const ABORTED: &str = "$Aborted";

/// Whether a driver result is the cancellation marker.
pub fn is_aborted(result: &Value) -> bool { result.is_symbol(ABORTED) }

/// The rules argument of a driver: a rule expression (a rule, a list of
/// rules, a list of rule lists, `Dispatch[...]`) or a compiled dispatch.
#[derive(Debug, Clone, Copy)]
pub enum RuleArg<'a> {
    Expr(&'a Value),
    Dispatch(&'a Dispatch),
}

impl<'a> From<&'a Value> for RuleArg<'a> {
    fn from(v: &'a Value) -> Self { RuleArg::Expr(v) }
}

impl<'a> From<&'a Dispatch> for RuleArg<'a> {
    fn from(d: &'a Dispatch) -> Self { RuleArg::Dispatch(d) }
}

enum Prepared<'a> {
    Rules(Cow<'a, [Rule]>),
    /// `{{rules...}, {rules...}}`: one result per rule list.
    Each(&'a [Value]),
}

fn create_rules(arg: RuleArg<'_>) -> Result<Prepared<'_>> {
    let v = match arg {
        RuleArg::Dispatch(d) => return Ok(Prepared::Rules(Cow::Borrowed(d.rules()))),
        RuleArg::Expr(v) => v,
    };
    if v.has_head("Dispatch") {
        let d = Dispatch::new(v)?;
        return Ok(Prepared::Rules(Cow::Owned(d.rules().to_vec())));
    }
    let items = if v.has_head("List") { v.args() } else { std::slice::from_ref(v) };
    if items.iter().any(|i| i.has_head("List") || i.has_head("Dispatch")) {
        if items.iter().all(|i| i.has_head("List")) {
            return Ok(Prepared::Each(items));
        }
        return Err(RewriteError::RuleMix(v.clone()));
    }
    let rules = items.iter().map(Rule::from_value).collect::<Result<Vec<_>>>()?;
    Ok(Prepared::Rules(Cow::Owned(rules)))
}

struct Walker<'a> {
    ev: &'a dyn Evaluate,
    rules: &'a [Rule],
    driver: &'static str,
}

impl Walker<'_> {
    /// The first rule that rewrites `expr` itself.
    fn rewrite_node(&self, expr: &Value) -> Option<Value> {
        self.rules.iter().find_map(|r| {
            let out = r.apply(self.ev, expr, false)?;
            debug!("{}: {} -> {}", self.driver, r.to_value(), out);
            Some(out)
        })
    }

    /// `ReplaceAll` traversal: the node first, then its head and arguments.
    /// `None` means nothing changed.
    fn shallow(&self, expr: &Value) -> Option<Value> {
        if let Some(v) = self.rewrite_node(expr) {
            return Some(v);
        }
        let Value::Expr { head, args } = expr else { return None };
        let new_head = self.shallow(head);
        let new_args = rewrite_args(args, |a| self.shallow(a));
        rebuild(head, args, new_head, new_args)
    }

    /// `Replace` traversal: deepest levels first, then this node if `spec`
    /// admits it. Heads sit at the level of the arguments.
    fn at_levels(&self, expr: &Value, level: usize, spec: &LevelSpec, heads: bool) -> Option<Value> {
        let descended = match expr {
            Value::Expr { head, args } if spec.descends_past(level) => {
                let new_head = if heads { self.at_levels(head, level + 1, spec, heads) } else { None };
                let new_args = rewrite_args(args, |a| self.at_levels(a, level + 1, spec, heads));
                rebuild(head, args, new_head, new_args)
            }
            _ => None,
        };
        let current = descended.as_ref().unwrap_or(expr);
        if spec.contains(level, current) {
            if let Some(v) = self.rewrite_node(current) {
                return Some(v);
            }
        }
        descended
    }
}

/// Rewrites each argument; rewritten `Sequence[...]` results splice into
/// the argument list.
fn rewrite_args(args: &[Value], mut f: impl FnMut(&Value) -> Option<Value>) -> Option<Vec<Value>> {
    let mut out: Option<Vec<Value>> = None;
    for (i, a) in args.iter().enumerate() {
        match f(a) {
            Some(new) => {
                let out = out.get_or_insert_with(|| args[..i].to_vec());
                if new.is_sequence() {
                    out.extend(new.args().iter().cloned());
                } else {
                    out.push(new);
                }
            }
            None => {
                if let Some(out) = out.as_mut() {
                    out.push(a.clone());
                }
            }
        }
    }
    out
}

fn rebuild(head: &Value, args: &[Value], new_head: Option<Value>, new_args: Option<Vec<Value>>) -> Option<Value> {
    if new_head.is_none() && new_args.is_none() {
        return None;
    }
    Some(Value::expr(
        new_head.unwrap_or_else(|| head.clone()),
        new_args.unwrap_or_else(|| args.to_vec()),
    ))
}

/// `Replace[expr, rules, levelspec, Heads -> heads]`. The level spec
/// defaults to `{0}`.
pub fn replace(ev: &dyn Evaluate, expr: &Value, rules: RuleArg<'_>, levelspec: Option<&Value>, heads: bool) -> Result<Value> {
    let spec = match levelspec {
        Some(v) => LevelSpec::from_value(v)?,
        None => LevelSpec::ROOT,
    };
    replace_at(ev, expr, rules, &spec, heads)
}

pub fn replace_at(ev: &dyn Evaluate, expr: &Value, rules: RuleArg<'_>, spec: &LevelSpec, heads: bool) -> Result<Value> {
    match create_rules(rules)? {
        Prepared::Each(sets) => each(sets, |set| replace_at(ev, expr, RuleArg::Expr(set), spec, heads)),
        Prepared::Rules(rules) => {
            let walker = Walker { ev, rules: &rules, driver: "Replace" };
            Ok(match walker.at_levels(expr, 0, spec, heads) {
                Some(v) => ev.evaluate(v),
                None => expr.clone(),
            })
        }
    }
}

/// `expr /. rules`.
pub fn replace_all(ev: &dyn Evaluate, expr: &Value, rules: RuleArg<'_>) -> Result<Value> {
    match create_rules(rules)? {
        Prepared::Each(sets) => each(sets, |set| replace_all(ev, expr, RuleArg::Expr(set))),
        Prepared::Rules(rules) => {
            let walker = Walker { ev, rules: &rules, driver: "ReplaceAll" };
            Ok(match walker.shallow(expr) {
                Some(v) => ev.evaluate(v),
                None => expr.clone(),
            })
        }
    }
}

/// `expr //. rules` with `MaxIterations -> max_iterations` (`None` for no
/// cap). Returns `$Aborted` if the evaluator asks to stop.
pub fn replace_repeated(ev: &dyn Evaluate, expr: &Value, rules: RuleArg<'_>, max_iterations: Option<usize>) -> Result<Value> {
    let rules = match create_rules(rules)? {
        Prepared::Each(sets) => {
            return each(sets, |set| replace_repeated(ev, expr, RuleArg::Expr(set), max_iterations));
        }
        Prepared::Rules(rules) => rules,
    };
    let walker = Walker { ev, rules: &rules, driver: "ReplaceRepeated" };
    let mut current = expr.clone();
    let mut remaining = max_iterations;
    loop {
        if ev.abort_requested() {
            warn!("ReplaceRepeated: aborted");
            return Ok(Value::symbol(ABORTED));
        }
        if remaining == Some(0) {
            let (symbol, tag) = ITERATION_LIMIT;
            warn!("{symbol}::{tag}: exiting after {} scanned {} times", expr, max_iterations.unwrap_or(0));
            break;
        }
        if let Some(n) = remaining.as_mut() {
            *n -= 1;
        }
        match walker.shallow(&current) {
            Some(next) => {
                let next = ev.evaluate(next);
                if next == current {
                    break;
                }
                current = next;
            }
            None => break,
        }
    }
    Ok(current)
}

/// `ReplaceList[expr, rules, max_count]`: every way the rules rewrite
/// `expr` as a whole, first rule first, truncated at `max_count`.
pub fn replace_list(ev: &dyn Evaluate, expr: &Value, rules: RuleArg<'_>, max_count: Option<usize>) -> Result<Value> {
    let rules = match create_rules(rules)? {
        Prepared::Each(sets) => return each(sets, |set| replace_list(ev, expr, RuleArg::Expr(set), max_count)),
        Prepared::Rules(rules) => rules,
    };
    let mut out = Vec::new();
    for rule in rules.iter() {
        let budget = max_count.map(|n| n - out.len());
        if budget == Some(0) {
            break;
        }
        out.extend(rule.apply_list(ev, expr, budget).into_iter().map(|v| ev.evaluate(v)));
    }
    Ok(Value::list(out))
}

/// `MatchQ[expr, pattern]`.
pub fn match_q(ev: &dyn Evaluate, expr: &Value, pattern: &Value) -> Result<bool> {
    let pattern = Pattern::compile(pattern)?;
    Ok(Matcher::new(ev).matches(&pattern, expr))
}

fn each(sets: &[Value], f: impl Fn(&Value) -> Result<Value>) -> Result<Value> {
    sets.iter().map(f).collect::<Result<Vec<_>>>().map(Value::list)
}

/// Drivers bound to one evaluator, with options taken from a
/// `RewriteConfig`.
pub struct Rewriter<'a> {
    ev: &'a dyn Evaluate,
    config: RewriteConfig,
}

impl<'a> Rewriter<'a> {
    pub fn new(ev: &'a dyn Evaluate) -> Self { Self { ev, config: RewriteConfig::default() } }

    pub fn with_config(ev: &'a dyn Evaluate, config: RewriteConfig) -> Self { Self { ev, config } }

    pub fn config(&self) -> &RewriteConfig { &self.config }

    pub fn replace<'r>(&self, expr: &Value, rules: impl Into<RuleArg<'r>>, levelspec: Option<&Value>) -> Result<Value> {
        replace(self.ev, expr, rules.into(), levelspec, self.config.heads)
    }

    pub fn replace_all<'r>(&self, expr: &Value, rules: impl Into<RuleArg<'r>>) -> Result<Value> {
        replace_all(self.ev, expr, rules.into())
    }

    pub fn replace_repeated<'r>(&self, expr: &Value, rules: impl Into<RuleArg<'r>>) -> Result<Value> {
        replace_repeated(self.ev, expr, rules.into(), self.config.max_iterations)
    }

    pub fn replace_list<'r>(&self, expr: &Value, rules: impl Into<RuleArg<'r>>) -> Result<Value> {
        replace_list(self.ev, expr, rules.into(), self.config.max_results)
    }

    pub fn match_q(&self, expr: &Value, pattern: &Value) -> Result<bool> { match_q(self.ev, expr, pattern) }
}
