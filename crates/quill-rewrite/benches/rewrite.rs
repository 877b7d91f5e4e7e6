use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use quill_core::{Attributes, Value};
use quill_rewrite::{replace_all, replace_list, replace_repeated, DefinitionStore, Dispatch, RuleArg};

fn sym(s: &str) -> Value { Value::symbol(s) }
fn call(h: &str, args: Vec<Value>) -> Value { Value::call(h, args) }
fn named(name: &str, p: Value) -> Value { call("Pattern", vec![sym(name), p]) }
fn blank() -> Value { call("Blank", vec![]) }

fn store() -> DefinitionStore {
    let mut defs = DefinitionStore::new();
    defs.set_attributes("Plus", Attributes::FLAT | Attributes::ORDERLESS | Attributes::ONE_IDENTITY);
    defs.set_default("Plus", None, None, Value::Integer(0));
    defs
}

/// Matching rule placed first, middle and last in a list of 16 rules.
fn rule_position_benchmark(c: &mut Criterion) {
    let defs = store();
    let mut group = c.benchmark_group("rule_position");
    let expr = call("target", vec![Value::Integer(1)]);

    for position in [0usize, 8, 15] {
        let rules: Vec<Value> = (0..16)
            .map(|i| {
                let head = if i == position { "target".to_string() } else { format!("miss{i}") };
                call("Rule", vec![call(&head, vec![named("x", blank())]), sym("x")])
            })
            .collect();
        let dispatch = Dispatch::new(&Value::list(rules)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(position), &dispatch, |b, d| {
            b.iter(|| replace_all(&defs, black_box(&expr), RuleArg::Dispatch(d)))
        });
    }
    group.finish();
}

/// `ReplaceList` over every split of a Flat, Orderless sum.
fn orderless_split_benchmark(c: &mut Criterion) {
    let defs = store();
    let mut group = c.benchmark_group("orderless_splits");
    let rule = call("Rule", vec![call("Plus", vec![named("x", blank()), named("y", blank())]), sym("x")]);

    for n in [3usize, 5, 7] {
        let sum = call("Plus", (0..n).map(|i| sym(&format!("a{i}"))).collect());
        group.bench_with_input(BenchmarkId::from_parameter(n), &sum, |b, sum| {
            b.iter(|| replace_list(&defs, black_box(sum), RuleArg::Expr(&rule), None))
        });
    }
    group.finish();
}

/// `ReplaceRepeated` unwinding a nested chain `s[s[...s[z]...]]`.
fn repeated_benchmark(c: &mut Criterion) {
    let defs = store();
    let rule = call("Rule", vec![call("s", vec![named("n", blank())]), sym("n")]);
    let nested = (0..64).fold(sym("z"), |acc, _| call("s", vec![acc]));

    c.bench_function("replace_repeated_unwind_64", |b| {
        b.iter(|| replace_repeated(&defs, black_box(&nested), RuleArg::Expr(&rule), Some(65535)))
    });
}

criterion_group!(benches, rule_position_benchmark, orderless_split_benchmark, repeated_benchmark);
criterion_main!(benches);
