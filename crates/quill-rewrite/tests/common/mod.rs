#![allow(dead_code)]

use std::cmp::Ordering;

use quill_core::{Attributes, Value};
use quill_rewrite::{DefinitionStore, Evaluate};

pub fn sym(s: &str) -> Value { Value::symbol(s) }
pub fn int(n: i64) -> Value { Value::Integer(n) }
pub fn call(h: &str, args: Vec<Value>) -> Value { Value::call(h, args) }
pub fn list(items: Vec<Value>) -> Value { Value::list(items) }
pub fn plus(args: Vec<Value>) -> Value { call("Plus", args) }

pub fn blank() -> Value { call("Blank", vec![]) }
pub fn blank_h(h: &str) -> Value { call("Blank", vec![sym(h)]) }
pub fn blank_seq() -> Value { call("BlankSequence", vec![]) }
pub fn blank_null() -> Value { call("BlankNullSequence", vec![]) }
pub fn pat(name: &str, p: Value) -> Value { call("Pattern", vec![sym(name), p]) }
/// `name_`
pub fn var(name: &str) -> Value { pat(name, blank()) }
pub fn rule(l: Value, r: Value) -> Value { call("Rule", vec![l, r]) }
pub fn rule_delayed(l: Value, r: Value) -> Value { call("RuleDelayed", vec![l, r]) }

/// A small evaluator: flat, orderless `Plus`/`Times` over integers,
/// integer comparisons, `Length` and pure functions of `Slot[n]`.
pub struct Kernel {
    pub defs: DefinitionStore,
}

impl Kernel {
    pub fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut defs = DefinitionStore::new();
        let arith = Attributes::FLAT | Attributes::ORDERLESS | Attributes::ONE_IDENTITY;
        defs.set_attributes("Plus", arith);
        defs.set_attributes("Times", arith);
        defs.set_default("Plus", None, None, int(0));
        defs.set_default("Times", None, None, int(1));
        Kernel { defs }
    }
}

impl Evaluate for Kernel {
    fn evaluate(&self, expr: Value) -> Value { eval(expr) }

    fn attributes(&self, symbol: &str) -> Attributes { self.defs.attributes(symbol) }

    fn default_value(&self, symbol: &str, position: Option<usize>, count: Option<usize>) -> Option<Value> {
        self.defs.default_value(symbol, position, count)
    }

    fn declared_options(&self, symbol: &str) -> Option<Vec<(String, Value)>> { self.defs.declared_options(symbol) }

    fn abort_requested(&self) -> bool { self.defs.abort_requested() }
}

pub fn eval(v: Value) -> Value {
    let Value::Expr { head, args } = v else { return v };
    let head = eval(*head);
    if head.has_head("Function") {
        let args: Vec<Value> = args.into_iter().map(eval).collect();
        let body = head.args().first().cloned().unwrap_or_else(|| sym("Null"));
        return eval(fill_slots(&body, &args));
    }
    if head.is_symbol("Function") || head.is_symbol("Hold") {
        return Value::expr(head, args);
    }
    let mut flat = Vec::with_capacity(args.len());
    for a in args {
        let a = eval(a);
        if a.is_sequence() { flat.extend(a.args().iter().cloned()) } else { flat.push(a) }
    }
    match head.as_symbol() {
        Some("Plus") => arith("Plus", flat, 0, |a, b| a + b),
        Some("Times") => arith("Times", flat, 1, |a, b| a * b),
        Some("Greater") => compare(head, flat, Ordering::Greater),
        Some("Less") => compare(head, flat, Ordering::Less),
        Some("Length") if flat.len() == 1 => int(flat[0].args().len() as i64),
        _ => Value::expr(head, flat),
    }
}

fn fill_slots(body: &Value, args: &[Value]) -> Value {
    if body.has_form("Slot", 1) {
        if let Some(n) = body.args()[0].as_int() {
            if n >= 1 && (n as usize) <= args.len() {
                return args[n as usize - 1].clone();
            }
        }
    }
    match body {
        Value::Expr { .. } if body.has_head("Function") => body.clone(),
        Value::Expr { head, args: inner } => Value::expr(
            fill_slots(head, args),
            inner.iter().map(|a| fill_slots(a, args)).collect(),
        ),
        other => other.clone(),
    }
}

fn arith(name: &str, args: Vec<Value>, unit: i64, op: fn(i64, i64) -> i64) -> Value {
    let mut acc = unit;
    let mut rest = Vec::new();
    for a in args {
        match a {
            Value::Integer(n) => acc = op(acc, n),
            other if other.has_head(name) => {
                for inner in other.args() {
                    match inner {
                        Value::Integer(n) => acc = op(acc, *n),
                        x => rest.push(x.clone()),
                    }
                }
            }
            other => rest.push(other),
        }
    }
    rest.sort_by_key(order_key);
    if acc != unit || rest.is_empty() {
        rest.insert(0, int(acc));
    }
    if rest.len() == 1 {
        return rest.remove(0);
    }
    call(name, rest)
}

fn compare(head: Value, args: Vec<Value>, want: Ordering) -> Value {
    match args.as_slice() {
        [Value::Integer(a), Value::Integer(b)] => Value::Boolean(a.cmp(b) == want),
        _ => Value::expr(head, args),
    }
}

/// Canonical order for orderless arguments: numbers, strings, symbols,
/// then compound expressions.
fn order_key(v: &Value) -> String {
    match v {
        Value::Integer(n) => format!("0:{n:020}"),
        Value::Real(f) => format!("1:{:.*}", 16, f),
        Value::Rational { num, den } => format!("1r:{}/{}", num, den),
        Value::String(s) => format!("2:{s}"),
        Value::Symbol(s) => format!("3:{s}"),
        Value::Boolean(b) => format!("4:{}", if *b { 1 } else { 0 }),
        Value::Expr { head, args } => format!(
            "5:{}[{}]",
            order_key(head),
            args.iter().map(order_key).collect::<Vec<_>>().join(",")
        ),
    }
}
