//! Backtracking pattern matcher.
//!
//! A match attempt never returns bindings directly. It calls a continuation
//! once for every way the pattern fits the candidate, and the continuation's
//! `ControlFlow` decides whether the search goes on. Returning
//! `Continue(())` asks for the next alternative; `Break(stop)` unwinds the
//! whole search through `?` up to whoever consumes that `Stop`.

use std::ops::ControlFlow;

use log::warn;
use quill_core::{Attributes, Value};

use crate::bindings::{option_name, Bindings};
use crate::error::MISSING_DEFAULT;
use crate::eval::Evaluate;
use crate::pattern::{ExprPattern, OptionsPattern, Pattern};
use crate::quick::QuickTest;
use crate::rule::substitute;

/// Why a search was cut short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    /// The caller only wanted the first success.
    Found,
    /// An `Except` probe matched; consumed by that `Except`.
    Excluded,
    /// A result budget ran out.
    Limit,
}

pub type Flow = ControlFlow<Stop>;

/// Keep searching.
pub const CONTINUE: Flow = ControlFlow::Continue(());

/// Argument positions of the candidate a partial match left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rest {
    pub before: Vec<usize>,
    pub after: Vec<usize>,
}

impl Rest {
    pub fn is_empty(&self) -> bool { self.before.is_empty() && self.after.is_empty() }
    pub fn len(&self) -> usize { self.before.len() + self.after.len() }
}

type Yield<'k> = &'k mut dyn FnMut(&Bindings, &Rest) -> Flow;

/// Where the candidate sits: the enclosing head plus the 1-based position
/// and count of element patterns, used for `Default` and `Options` lookups.
#[derive(Clone, Copy)]
struct Slot<'a> {
    head: Option<&'a Value>,
    position: Option<usize>,
    count: Option<usize>,
    fully: bool,
}

impl<'a> Slot<'a> {
    fn root(fully: bool) -> Self { Slot { head: None, position: None, count: None, fully } }

    fn element(head: &'a Value, position: usize, count: usize) -> Self {
        Slot { head: Some(head), position: Some(position), count: Some(count), fully: true }
    }

    fn whole(self) -> Self { Slot { fully: true, ..self } }
}

/// State shared by every element pattern of one expression pattern.
struct Scope<'a> {
    pattern: &'a ExprPattern,
    order: Vec<usize>,
    head: &'a Value,
    args: &'a [Value],
    attrs: Attributes,
    fully: bool,
}

pub struct Matcher<'e> {
    ev: &'e dyn Evaluate,
}

impl<'e> Matcher<'e> {
    pub fn new(ev: &'e dyn Evaluate) -> Self { Matcher { ev } }

    /// Calls `on_success` once per complete match of `pattern` against
    /// `expr`, starting from `bindings`.
    pub fn match_with(
        &self,
        pattern: &Pattern,
        expr: &Value,
        bindings: &Bindings,
        on_success: &mut dyn FnMut(&Bindings) -> Flow,
    ) -> Flow {
        self.attempt(pattern, expr, bindings, Slot::root(true), &mut |b, _| on_success(b))
    }

    /// Treats `items` as a run of siblings, the way an element pattern sees
    /// them.
    pub fn match_sequence(&self, pattern: &Pattern, items: &[Value], on_success: &mut dyn FnMut(&Bindings) -> Flow) -> Flow {
        let seq = Value::sequence(items.to_vec());
        self.match_with(pattern, &seq, &Bindings::new(), on_success)
    }

    /// Like `match_with`, but a Flat head may leave arguments unmatched when
    /// `fully` is false. Those are reported through `Rest`.
    pub(crate) fn match_partial(&self, pattern: &Pattern, expr: &Value, fully: bool, k: Yield<'_>) -> Flow {
        self.attempt(pattern, expr, &Bindings::new(), Slot::root(fully), k)
    }

    pub fn first_match(&self, pattern: &Pattern, expr: &Value) -> Option<Bindings> {
        let mut found = None;
        let _ = self.match_with(pattern, expr, &Bindings::new(), &mut |b| {
            found = Some(b.clone());
            ControlFlow::Break(Stop::Found)
        });
        found
    }

    pub fn all_matches(&self, pattern: &Pattern, expr: &Value) -> Vec<Bindings> {
        let mut out = Vec::new();
        let _ = self.match_with(pattern, expr, &Bindings::new(), &mut |b| {
            out.push(b.clone());
            CONTINUE
        });
        out
    }

    pub fn matches(&self, pattern: &Pattern, expr: &Value) -> bool { self.first_match(pattern, expr).is_some() }

    fn attempt(&self, pattern: &Pattern, expr: &Value, b: &Bindings, slot: Slot<'_>, k: Yield<'_>) -> Flow {
        match pattern {
            Pattern::Blank(h) => {
                if expr.is_sequence() || !head_ok(h.as_ref(), expr) {
                    return CONTINUE;
                }
                k(b, &Rest::default())
            }
            Pattern::BlankSequence(h) | Pattern::BlankNullSequence(h) => {
                let items = expr.sequence_items();
                if items.is_empty() && matches!(pattern, Pattern::BlankSequence(_)) {
                    return CONTINUE;
                }
                if !items.iter().all(|item| head_ok(h.as_ref(), item)) {
                    return CONTINUE;
                }
                k(b, &Rest::default())
            }
            Pattern::Named { name, inner } => {
                let value = if expr.is_empty_sequence() && inner.is_optional() {
                    match self.optional_default(inner, slot) {
                        Some(d) => d,
                        None => return CONTINUE,
                    }
                } else {
                    expr.clone()
                };
                match b.get(name) {
                    Some(existing) if !existing.same_q(&value) => CONTINUE,
                    Some(_) => self.attempt(inner, expr, b, slot, k),
                    None => {
                        let nb = b.bind(name.as_str(), value);
                        self.attempt(inner, expr, &nb, slot, k)
                    }
                }
            }
            Pattern::Optional { inner, default } => {
                if expr.is_empty_sequence() {
                    let Some(value) = self.resolve_default(default.as_ref(), slot) else { return CONTINUE };
                    self.attempt(inner, &value, b, Slot::root(true), k)
                } else {
                    self.attempt(inner, expr, b, Slot::root(true), k)
                }
            }
            Pattern::Alternatives(alts) => {
                for alt in alts {
                    self.attempt(alt, expr, b, slot, &mut *k)?;
                }
                CONTINUE
            }
            Pattern::Except { excluded, fallback } => {
                let probe = self.attempt(excluded, expr, b, slot, &mut |_, _| ControlFlow::Break(Stop::Excluded));
                match probe {
                    ControlFlow::Break(Stop::Excluded) => CONTINUE,
                    ControlFlow::Break(other) => ControlFlow::Break(other),
                    ControlFlow::Continue(()) => self.attempt(fallback, expr, b, slot, k),
                }
            }
            Pattern::Verbatim(v) | Pattern::Literal(v) => {
                if v.same_q(expr) { k(b, &Rest::default()) } else { CONTINUE }
            }
            Pattern::HoldPattern(inner) => self.attempt(inner, expr, b, slot, k),
            Pattern::PatternTest { inner, test, quick } => {
                let mut verdict: Option<bool> = None;
                self.attempt(inner, expr, b, slot.whole(), &mut |nb, _| {
                    let ok = *verdict.get_or_insert_with(|| self.passes(test, *quick, expr));
                    if ok { k(nb, &Rest::default()) } else { CONTINUE }
                })
            }
            Pattern::Condition { inner, guard } => self.attempt(inner, expr, b, slot, &mut |nb, rest| {
                let check = substitute(guard, nb);
                if self.ev.evaluate(check).is_true() { k(nb, rest) } else { CONTINUE }
            }),
            Pattern::Repeated { inner, min, max } => {
                let items = expr.sequence_items();
                if items.len() < *min || max.map_or(false, |m| items.len() > m) {
                    return CONTINUE;
                }
                self.repeat(inner, items, b, k)
            }
            Pattern::OptionsPattern(op) => {
                let mut values = self.option_defaults(op, slot);
                for item in expr.sequence_items() {
                    if !given_options(item, &mut values) {
                        return CONTINUE;
                    }
                }
                let nb = values.into_iter().fold(b.clone(), |acc, (name, v)| acc.bind_option(&name, v));
                k(&nb, &Rest::default())
            }
            Pattern::Expression(ep) => self.match_expression(ep, expr, b, slot.fully, k),
        }
    }

    /// Each item must match `inner` in turn, with bindings threaded through.
    fn repeat(&self, inner: &Pattern, items: &[Value], b: &Bindings, k: Yield<'_>) -> Flow {
        let Some((first, tail)) = items.split_first() else {
            return k(b, &Rest::default());
        };
        self.attempt(inner, first, b, Slot::root(true), &mut |nb, _| self.repeat(inner, tail, nb, &mut *k))
    }

    fn passes(&self, test: &Value, quick: Option<QuickTest>, candidate: &Value) -> bool {
        candidate.sequence_items().iter().all(|item| match quick {
            Some(q) => q.check(item, self.ev),
            None => {
                let item = self.ev.evaluate(item.clone());
                self.ev.evaluate(Value::expr(test.clone(), vec![item])).is_true()
            }
        })
    }

    fn optional_default(&self, p: &Pattern, slot: Slot<'_>) -> Option<Value> {
        match p {
            Pattern::Optional { default, .. } => self.resolve_default(default.as_ref(), slot),
            Pattern::Named { inner, .. } => self.optional_default(inner, slot),
            _ => None,
        }
    }

    /// Inline default, else `Default[h, i, n]`, `Default[h, i]`, `Default[h]`.
    fn resolve_default(&self, inline: Option<&Value>, slot: Slot<'_>) -> Option<Value> {
        if let Some(v) = inline {
            return Some(v.clone());
        }
        let head = slot.head.and_then(Value::as_symbol);
        if let Some(name) = head {
            let mut keys = Vec::with_capacity(3);
            if let Some(pos) = slot.position {
                if slot.count.is_some() {
                    keys.push((Some(pos), slot.count));
                }
                keys.push((Some(pos), None));
            }
            keys.push((None, None));
            for (pos, count) in keys {
                if let Some(v) = self.ev.default_value(name, pos, count) {
                    return Some(v);
                }
            }
        }
        let (symbol, tag) = MISSING_DEFAULT;
        warn!("{symbol}::{tag}: no default value for {} at position {:?}", head.unwrap_or("<unknown>"), slot.position);
        None
    }

    fn option_defaults(&self, op: &OptionsPattern, slot: Slot<'_>) -> Vec<(String, Value)> {
        match &op.defaults {
            Some(explicit) => {
                let mut out = Vec::new();
                self.declared_into(explicit, &mut out);
                out
            }
            None => op
                .inherited
                .get_or_init(|| {
                    slot.head
                        .and_then(Value::as_symbol)
                        .and_then(|h| self.ev.declared_options(h))
                        .unwrap_or_default()
                })
                .clone(),
        }
    }

    /// Explicit `OptionsPattern` defaults. Symbols contribute their declared
    /// options; anything unrecognised is skipped.
    fn declared_into(&self, v: &Value, out: &mut Vec<(String, Value)>) {
        if v.has_head("List") {
            for item in v.args() {
                self.declared_into(item, out);
            }
        } else if let Some((name, value)) = option_rule(v) {
            set_option(out, name, value);
        } else if let Some(sym) = v.as_symbol() {
            for (name, value) in self.ev.declared_options(sym).unwrap_or_default() {
                set_option(out, name, value);
            }
        }
    }

    fn match_expression(&self, ep: &ExprPattern, expr: &Value, b: &Bindings, fully: bool, k: Yield<'_>) -> Flow {
        let attrs = ep.head_symbol().map(|s| self.ev.attributes(s)).unwrap_or_default();
        let flat = attrs.contains(Attributes::FLAT);
        // A run of siblings is never one expression, unless the pattern asks for `Sequence`.
        if expr.is_sequence() && !ep.literal_head().map_or(false, |h| h.is_symbol("Sequence")) {
            return CONTINUE;
        }
        if let Value::Expr { head, args } = expr {
            if flat || ep.admits_arity(args.len()) {
                let scope = Scope {
                    pattern: ep,
                    order: ep.visit_order(attrs.contains(Attributes::ORDERLESS)),
                    head: &**head,
                    args: args.as_slice(),
                    attrs,
                    fully: fully || !flat,
                };
                self.attempt(&ep.head, head, b, Slot::root(true), &mut |hb, _| {
                    if scope.order.is_empty() {
                        return if args.is_empty() { k(hb, &Rest::default()) } else { CONTINUE };
                    }
                    self.match_element(&scope, 0, (0..args.len()).collect(), hb, &mut *k)
                })?;
            }
        }
        if attrs.contains(Attributes::ONE_IDENTITY) {
            return self.match_one_identity(ep, expr, b, k);
        }
        CONTINUE
    }

    /// `f[x_, y_.]` against something not headed by `f`, for OneIdentity
    /// heads: the lone required element takes the whole candidate and the
    /// optional ones take their defaults.
    fn match_one_identity(&self, ep: &ExprPattern, expr: &Value, b: &Bindings, k: Yield<'_>) -> Flow {
        let Some(head) = ep.literal_head() else { return CONTINUE };
        if expr.head_is(head) || expr == head {
            return CONTINUE;
        }
        let required = ep.elements.iter().filter(|e| !e.is_optional()).count();
        if required != 1 || ep.elements.len() < 2 {
            return CONTINUE;
        }
        self.one_identity_from(ep, head, 0, expr, b, k)
    }

    fn one_identity_from(&self, ep: &ExprPattern, head: &Value, i: usize, expr: &Value, b: &Bindings, k: Yield<'_>) -> Flow {
        let Some(element) = ep.elements.get(i) else {
            return k(b, &Rest::default());
        };
        let slot = Slot::element(head, i + 1, ep.elements.len());
        let candidate = if element.is_optional() { Value::sequence(vec![]) } else { expr.clone() };
        self.attempt(element, &candidate, b, slot, &mut |nb, _| self.one_identity_from(ep, head, i + 1, expr, nb, &mut *k))
    }

    /// Matches element pattern `scope.order[i]` against some of the
    /// `candidates` argument positions, then hands the remainder to the next
    /// element pattern.
    fn match_element(&self, scope: &Scope<'_>, i: usize, candidates: Vec<usize>, b: &Bindings, k: Yield<'_>) -> Flow {
        let position = scope.order[i];
        let element = &scope.pattern.elements[position];
        let (min, max) = element.match_count();
        let flat = scope.attrs.contains(Attributes::FLAT);
        let orderless = scope.attrs.contains(Attributes::ORDERLESS);
        let wildcard = flat && element.is_wildcard();
        let try_flattened = wildcard
            || (flat && matches!(element, Pattern::Expression(ep) if ep.literal_head() == Some(scope.head)));
        let run_max = if wildcard { None } else { max };
        let included: Vec<usize> = if try_flattened {
            candidates.clone()
        } else {
            candidates.iter().copied().filter(|&j| element.could_match(&scope.args[j])).collect()
        };
        if included.len() < min {
            return CONTINUE;
        }
        let last = i + 1 == scope.order.len();
        let slot = Slot::element(scope.head, position + 1, scope.order.len());

        let mut try_run = |items: &[usize], skipped: &[usize], remaining: &[usize]| -> Flow {
            let include_flattened = try_flattened && !items.is_empty() && items.len() < scope.args.len();
            let mut matched = |nb: &Bindings, _: &Rest| -> Flow {
                if !last {
                    self.match_element(scope, i + 1, remaining.to_vec(), nb, &mut |nb2, next| {
                        k(nb2, &Rest { before: skipped.to_vec(), after: next.after.clone() })
                    })
                } else if !scope.fully || (skipped.is_empty() && remaining.is_empty()) {
                    k(nb, &Rest { before: skipped.to_vec(), after: remaining.to_vec() })
                } else {
                    CONTINUE
                }
            };
            self.wrappings(scope, items, max, include_flattened, &mut |item| self.attempt(element, item, b, slot, &mut matched))
        };

        if !orderless {
            let flexible_start = i == 0 && !scope.fully;
            return for_each_run(&candidates, min, run_max, flexible_start, !last, &mut |items, skipped, remaining| {
                try_run(items, skipped, remaining)
            });
        }
        if let Pattern::Named { name, .. } = element {
            if let Some(existing) = b.get(name) {
                let needed = if existing.is_sequence() || (flat && existing.head_is(scope.head)) {
                    existing.args()
                } else {
                    std::slice::from_ref(existing)
                };
                let mut available = candidates.clone();
                let mut taken = Vec::with_capacity(needed.len());
                for want in needed {
                    let Some(at) = available.iter().position(|&j| scope.args[j].same_q(want) && included.contains(&j)) else {
                        return CONTINUE;
                    };
                    taken.push(available.remove(at));
                }
                return try_run(&taken, &[], &available);
            }
        }
        for_each_subset(&candidates, min, run_max, &included, !last, &mut |chosen, rest| try_run(chosen, &[], rest))
    }

    /// The ways a run of arguments is presented to an element pattern: a
    /// lone argument as itself, longer runs as `Sequence[...]` (every
    /// ordering under Orderless), and for Flat heads also as `head[...]`.
    fn wrappings(
        &self,
        scope: &Scope<'_>,
        items: &[usize],
        max: Option<usize>,
        include_flattened: bool,
        f: &mut dyn FnMut(&Value) -> Flow,
    ) -> Flow {
        if let [single] = items {
            return f(&scope.args[*single]);
        }
        let values = |idx: &[usize]| idx.iter().map(|&j| scope.args[j].clone()).collect::<Vec<_>>();
        if max.map_or(true, |m| items.len() <= m) {
            if scope.attrs.contains(Attributes::ORDERLESS) {
                for_each_permutation(&mut items.to_vec(), &mut Vec::new(), &mut |perm| f(&Value::sequence(values(perm))))?;
            } else {
                f(&Value::sequence(values(items)))?;
            }
        }
        if include_flattened && scope.attrs.contains(Attributes::FLAT) {
            f(&Value::expr(scope.head.clone(), values(items)))?;
        }
        CONTINUE
    }
}

fn head_ok(head: Option<&Value>, item: &Value) -> bool { head.map_or(true, |h| item.head_is(h)) }

/// Contiguous runs of `min..=max` items. Without a flexible start runs begin
/// at the first item; otherwise every start that still fits the longest run
/// is tried.
fn for_each_run(
    items: &[usize],
    min: usize,
    max: Option<usize>,
    flexible_start: bool,
    shortest_first: bool,
    f: &mut dyn FnMut(&[usize], &[usize], &[usize]) -> Flow,
) -> Flow {
    let n = items.len();
    let max = max.map_or(n, |m| m.min(n));
    if min > max {
        return CONTINUE;
    }
    let mut lengths: Vec<usize> = (min..=max).collect();
    if !shortest_first {
        lengths.reverse();
    }
    let last_start = if flexible_start { n - max } else { 0 };
    for start in 0..=last_start {
        for &len in &lengths {
            f(&items[start..start + len], &items[..start], &items[start + len..])?;
        }
    }
    CONTINUE
}

/// Subsets of `min..=max` items in lexicographic order of choice, only
/// choosing `included` items. The empty subset is always tried last.
fn for_each_subset(
    items: &[usize],
    min: usize,
    max: Option<usize>,
    included: &[usize],
    shortest_first: bool,
    f: &mut dyn FnMut(&[usize], &[usize]) -> Flow,
) -> Flow {
    let max = max.unwrap_or(items.len());
    if min > max {
        return CONTINUE;
    }
    let mut counts: Vec<usize> = (min..=max).collect();
    if !shortest_first {
        counts.reverse();
    }
    if counts.first() == Some(&0) {
        counts.rotate_left(1);
    }
    for count in counts {
        choose(&mut Vec::new(), &mut Vec::new(), items, count, included, f)?;
    }
    CONTINUE
}

fn choose(
    chosen: &mut Vec<usize>,
    skipped: &mut Vec<usize>,
    rest: &[usize],
    count: usize,
    included: &[usize],
    f: &mut dyn FnMut(&[usize], &[usize]) -> Flow,
) -> Flow {
    if rest.len() < count {
        return CONTINUE;
    }
    if count == 0 {
        let mut left = skipped.clone();
        left.extend_from_slice(rest);
        return f(chosen.as_slice(), &left);
    }
    if rest.len() == count {
        if !rest.iter().all(|j| included.contains(j)) {
            return CONTINUE;
        }
        let mut all = chosen.clone();
        all.extend_from_slice(rest);
        return f(&all, skipped.as_slice());
    }
    let Some((&item, tail)) = rest.split_first() else { return CONTINUE };
    if included.contains(&item) {
        chosen.push(item);
        let flow = choose(chosen, skipped, tail, count - 1, included, f);
        chosen.pop();
        flow?;
    }
    skipped.push(item);
    let flow = choose(chosen, skipped, tail, count, included, f);
    skipped.pop();
    flow
}

fn for_each_permutation(pool: &mut Vec<usize>, acc: &mut Vec<usize>, f: &mut dyn FnMut(&[usize]) -> Flow) -> Flow {
    if pool.is_empty() {
        return f(acc.as_slice());
    }
    for idx in 0..pool.len() {
        let item = pool.remove(idx);
        acc.push(item);
        let flow = for_each_permutation(pool, acc, f);
        acc.pop();
        pool.insert(idx, item);
        flow?;
    }
    CONTINUE
}

/// `name -> value` or `name :> value` with a symbol or string name.
fn option_rule(v: &Value) -> Option<(String, Value)> {
    if !(v.has_form("Rule", 2) || v.has_form("RuleDelayed", 2)) {
        return None;
    }
    let name = option_name(&v.args()[0])?;
    Some((name.to_string(), v.args()[1].clone()))
}

fn set_option(out: &mut Vec<(String, Value)>, name: String, value: Value) {
    match out.iter_mut().find(|(n, _)| *n == name) {
        Some(slot) => slot.1 = value,
        None => out.push((name, value)),
    }
}

/// Options passed in a call: rules, or (nested) lists of rules. Anything
/// else means the item is not an option sequence.
fn given_options(item: &Value, out: &mut Vec<(String, Value)>) -> bool {
    if item.has_head("List") {
        return item.args().iter().all(|i| given_options(i, out));
    }
    match option_rule(item) {
        Some((name, value)) => {
            set_option(out, name, value);
            true
        }
        None => false,
    }
}
