mod common;

use std::sync::atomic::Ordering;

use common::*;
use quill_core::Value;
use quill_rewrite as rw;
use quill_rewrite::{Dispatch, ErrorKind, RewriteConfig, RewriteError, Rewriter, Rule, RuleArg};

fn replace_all(k: &Kernel, expr: &Value, rules: &Value) -> Value {
    rw::replace_all(k, expr, RuleArg::Expr(rules)).unwrap()
}

fn replace_list(k: &Kernel, expr: &Value, rules: &Value, max: Option<usize>) -> Value {
    rw::replace_list(k, expr, RuleArg::Expr(rules), max).unwrap()
}

/// n_Integer /; n < 5 :> n + 1
fn count_up() -> Value {
    rule_delayed(
        call("Condition", vec![pat("n", blank_h("Integer")), call("Less", vec![sym("n"), int(5)])]),
        plus(vec![sym("n"), int(1)]),
    )
}

#[test]
fn replace_all_matches_part_of_a_flat_sum() {
    // a + b + c /. a + b -> t
    let k = Kernel::new();
    let expr = plus(vec![sym("a"), sym("b"), sym("c")]);
    let out = replace_all(&k, &expr, &rule(plus(vec![sym("a"), sym("b")]), sym("t")));
    assert_eq!(out, plus(vec![sym("c"), sym("t")]));
}

#[test]
fn sequence_patterns_split_shortest_first() {
    // f[a, b, c, d] /. f[start__, end__] -> {{start}, {end}}
    let k = Kernel::new();
    let expr = call("f", vec![sym("a"), sym("b"), sym("c"), sym("d")]);
    let r = rule(
        call("f", vec![pat("start", blank_seq()), pat("end", blank_seq())]),
        list(vec![list(vec![sym("start")]), list(vec![sym("end")])]),
    );
    let expected = list(vec![list(vec![sym("a")]), list(vec![sym("b"), sym("c"), sym("d")])]);
    assert_eq!(replace_all(&k, &expr, &r), expected);
}

#[test]
fn replace_all_tries_the_node_before_its_parts() {
    // x[1] /. {x[1] -> y, 1 -> 2}
    let k = Kernel::new();
    let rules = list(vec![rule(call("x", vec![int(1)]), sym("y")), rule(int(1), int(2))]);
    assert_eq!(replace_all(&k, &call("x", vec![int(1)]), &rules), sym("y"));

    // f[f[a]] /. f[x_] -> g[x] does not revisit the replacement
    let r = rule(call("f", vec![var("x")]), call("g", vec![sym("x")]));
    let out = replace_all(&k, &call("f", vec![call("f", vec![sym("a")])]), &r);
    assert_eq!(out, call("g", vec![call("f", vec![sym("a")])]));
}

#[test]
fn first_matching_rule_wins() {
    let k = Kernel::new();
    let rules = list(vec![rule(sym("a"), int(1)), rule(sym("a"), int(2))]);
    assert_eq!(replace_all(&k, &sym("a"), &rules), int(1));
}

#[test]
fn unmatched_expression_comes_back_unchanged() {
    let k = Kernel::new();
    let expr = call("f", vec![sym("b")]);
    assert_eq!(replace_all(&k, &expr, &rule(sym("a"), int(1))), expr);
}

#[test]
fn sequence_results_splice_into_the_parent() {
    // f[a, b] /. a -> Sequence[x, y]
    let k = Kernel::new();
    let r = rule(sym("a"), Value::sequence(vec![sym("x"), sym("y")]));
    let out = replace_all(&k, &call("f", vec![sym("a"), sym("b")]), &r);
    assert_eq!(out, call("f", vec![sym("x"), sym("y"), sym("b")]));

    // g[f[a, b, c]] /. f[x__] :> h[x]
    let r = rule_delayed(call("f", vec![pat("x", blank_seq())]), call("h", vec![sym("x")]));
    let out = replace_all(&k, &call("g", vec![call("f", vec![sym("a"), sym("b"), sym("c")])]), &r);
    assert_eq!(out, call("g", vec![call("h", vec![sym("a"), sym("b"), sym("c")])]));
}

#[test]
fn delayed_rules_evaluate_their_result() {
    let k = Kernel::new();
    let lhs = call("f", vec![var("x")]);
    let rhs = plus(vec![sym("x"), int(1)]);
    let f2 = call("f", vec![int(2)]);

    let immediate = Rule::immediate(lhs.clone(), rhs.clone()).unwrap();
    assert_eq!(immediate.apply(&k, &f2, true), Some(plus(vec![int(2), int(1)])));

    let delayed = Rule::delayed(lhs, rhs).unwrap();
    assert_eq!(delayed.apply(&k, &f2, true), Some(int(3)));
    assert_eq!(delayed.to_value().head(), sym("RuleDelayed"));
}

#[test]
fn replace_defaults_to_the_root() {
    let k = Kernel::new();
    let rules = list(vec![rule(call("x", vec![int(1)]), sym("y")), rule(int(1), int(2))]);
    let expr = call("x", vec![int(1)]);
    assert_eq!(rw::replace(&k, &expr, RuleArg::Expr(&rules), None, false).unwrap(), sym("y"));

    let inner_only = rule(int(1), int(2));
    assert_eq!(rw::replace(&k, &expr, RuleArg::Expr(&inner_only), None, false).unwrap(), expr);

    // Replace[x[1], rules, {0}] is the same as the default
    let root = list(vec![int(0)]);
    assert_eq!(rw::replace(&k, &expr, RuleArg::Expr(&rules), Some(&root), false).unwrap(), sym("y"));
    assert_eq!(rw::replace(&k, &expr, RuleArg::Expr(&inner_only), Some(&root), false).unwrap(), expr);
}

#[test]
fn replace_all_levels_rewrites_deepest_first() {
    // Replace[x[1], {x[1] -> y, 1 -> 2}, All]
    let k = Kernel::new();
    let rules = list(vec![rule(call("x", vec![int(1)]), sym("y")), rule(int(1), int(2))]);
    let out = rw::replace(&k, &call("x", vec![int(1)]), RuleArg::Expr(&rules), Some(&sym("All")), false).unwrap();
    assert_eq!(out, call("x", vec![int(2)]));
}

#[test]
fn replace_at_explicit_and_negative_levels() {
    let k = Kernel::new();
    // Replace[{a, {a}}, a -> b, {2}]
    let expr = list(vec![sym("a"), list(vec![sym("a")])]);
    let out = rw::replace(&k, &expr, RuleArg::Expr(&rule(sym("a"), sym("b"))), Some(&list(vec![int(2)])), false).unwrap();
    assert_eq!(out, list(vec![sym("a"), list(vec![sym("b")])]));

    // Replace[f[g[a]], x_ -> h[x], {-1}] touches only atoms
    let expr = call("f", vec![call("g", vec![sym("a")])]);
    let r = rule(var("x"), call("h", vec![sym("x")]));
    let out = rw::replace(&k, &expr, RuleArg::Expr(&r), Some(&list(vec![int(-1)])), false).unwrap();
    assert_eq!(out, call("f", vec![call("g", vec![call("h", vec![sym("a")])])]));
}

#[test]
fn replace_visits_heads_only_when_asked() {
    let k = Kernel::new();
    let rules = list(vec![rule(sym("f"), sym("g")), rule(sym("a"), sym("b"))]);
    let expr = call("f", vec![sym("a")]);
    let all = sym("All");
    let with_heads = rw::replace(&k, &expr, RuleArg::Expr(&rules), Some(&all), true).unwrap();
    assert_eq!(with_heads, call("g", vec![sym("b")]));
    let without = rw::replace(&k, &expr, RuleArg::Expr(&rules), Some(&all), false).unwrap();
    assert_eq!(without, call("f", vec![sym("b")]));
    let level_one = rw::replace(&k, &expr, RuleArg::Expr(&rules), Some(&list(vec![int(1)])), true).unwrap();
    assert_eq!(level_one, call("g", vec![sym("b")]));
}

#[test]
fn heads_are_replaced_at_their_own_level() {
    let k = Kernel::new();
    let r = rule(sym("x"), sym("z"));
    let expr = call("x", vec![call("x", vec![sym("y")])]);
    let all = sym("All");
    assert_eq!(rw::replace(&k, &expr, RuleArg::Expr(&r), Some(&all), false).unwrap(), expr);
    let out = rw::replace(&k, &expr, RuleArg::Expr(&r), Some(&all), true).unwrap();
    assert_eq!(out, call("z", vec![call("z", vec![sym("y")])]));
    let out = rw::replace(&k, &expr, RuleArg::Expr(&r), Some(&list(vec![int(1)])), true).unwrap();
    assert_eq!(out, call("z", vec![call("x", vec![sym("y")])]));
}

#[test]
fn lists_of_rule_lists_give_one_result_each() {
    // a /. {{a -> 1}, {a -> 2}}
    let k = Kernel::new();
    let rules = list(vec![list(vec![rule(sym("a"), int(1))]), list(vec![rule(sym("a"), int(2))])]);
    assert_eq!(replace_all(&k, &sym("a"), &rules), list(vec![int(1), int(2)]));
    let out = rw::replace(&k, &sym("a"), RuleArg::Expr(&rules), None, false).unwrap();
    assert_eq!(out, list(vec![int(1), int(2)]));
    let out = rw::replace_repeated(&k, &sym("a"), RuleArg::Expr(&rules), Some(10)).unwrap();
    assert_eq!(out, list(vec![int(1), int(2)]));
}

#[test]
fn malformed_rule_arguments_are_reported() {
    let k = Kernel::new();

    let mixed = list(vec![list(vec![rule(sym("a"), int(1))]), rule(sym("a"), int(2))]);
    let err = rw::replace_all(&k, &sym("a"), RuleArg::Expr(&mixed)).unwrap_err();
    assert_eq!(err, RewriteError::RuleMix(mixed));
    assert_eq!(err.message_key("ReplaceAll"), ("ReplaceAll", "rmix"));

    let not_rules = list(vec![sym("a"), int(1)]);
    let err = rw::replace_all(&k, &sym("a"), RuleArg::Expr(&not_rules)).unwrap_err();
    assert_eq!(err, RewriteError::InvalidRule(sym("a")));
    assert_eq!(err.message_key("ReplaceAll"), ("ReplaceAll", "reps"));
    assert_eq!(err.kind(), ErrorKind::InvalidRule);

    let three = call("Rule", vec![sym("a"), sym("b"), sym("c")]);
    let err = rw::replace_all(&k, &sym("a"), RuleArg::Expr(&three)).unwrap_err();
    assert_eq!(err.message_key("ReplaceAll"), ("Rule", "argrx"));

    let err = rw::replace(&k, &sym("a"), RuleArg::Expr(&rule(sym("a"), sym("b"))), Some(&sym("x")), false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidLevelSpec);
    assert_eq!(err.message_key("Replace"), ("General", "level"));
}

#[test]
fn replace_list_enumerates_sequence_splits() {
    // ReplaceList[{a, b, c}, {___, x__, ___} -> {x}, 3]
    let k = Kernel::new();
    let r = rule(list(vec![blank_null(), pat("x", blank_seq()), blank_null()]), list(vec![sym("x")]));
    let expr = list(vec![sym("a"), sym("b"), sym("c")]);
    let expected = list(vec![
        list(vec![sym("a")]),
        list(vec![sym("a"), sym("b")]),
        list(vec![sym("a"), sym("b"), sym("c")]),
    ]);
    assert_eq!(replace_list(&k, &expr, &r, Some(3)), expected);
}

#[test]
fn replace_list_enumerates_flat_orderless_splits() {
    // ReplaceList[a + b + c, x_ + y_ -> {x, y}]
    let k = Kernel::new();
    let (a, b, c) = (sym("a"), sym("b"), sym("c"));
    let r = rule(plus(vec![var("x"), var("y")]), list(vec![sym("x"), sym("y")]));
    let out = replace_list(&k, &plus(vec![a.clone(), b.clone(), c.clone()]), &r, None);
    let pair = |x: Value, y: Value| list(vec![x, y]);
    let expected = list(vec![
        pair(a.clone(), plus(vec![b.clone(), c.clone()])),
        pair(b.clone(), plus(vec![a.clone(), c.clone()])),
        pair(c.clone(), plus(vec![a.clone(), b.clone()])),
        pair(plus(vec![a.clone(), b.clone()]), c.clone()),
        pair(plus(vec![a.clone(), c.clone()]), b.clone()),
        pair(plus(vec![b, c]), a),
    ]);
    assert_eq!(out, expected);
}

#[test]
fn replace_list_truncation_is_a_prefix() {
    let k = Kernel::new();
    let r = rule(plus(vec![var("x"), var("y")]), list(vec![sym("x"), sym("y")]));
    let expr = plus(vec![sym("a"), sym("b"), sym("c")]);
    let full = replace_list(&k, &expr, &r, None);
    for n in 0..=7 {
        let cut = replace_list(&k, &expr, &r, Some(n));
        let keep = n.min(full.args().len());
        assert_eq!(cut.args(), &full.args()[..keep], "max count {}", n);
    }
}

#[test]
fn replace_list_walks_rules_in_order() {
    let k = Kernel::new();
    let rules = list(vec![rule(sym("a"), int(1)), rule(sym("b"), int(9)), rule(blank(), int(3))]);
    assert_eq!(replace_list(&k, &sym("a"), &rules, None), list(vec![int(1), int(3)]));
    assert_eq!(replace_list(&k, &sym("a"), &rules, Some(1)), list(vec![int(1)]));
    assert_eq!(replace_list(&k, &sym("z"), &rule(sym("a"), int(1)), None), list(vec![]));
}

#[test]
fn replace_repeated_runs_to_a_fixed_point() {
    let k = Kernel::new();
    let out = rw::replace_repeated(&k, &int(0), RuleArg::Expr(&count_up()), Some(65535)).unwrap();
    assert_eq!(out, int(5));

    let chain = list(vec![rule(sym("a"), sym("b")), rule(sym("b"), sym("c"))]);
    assert_eq!(rw::replace_repeated(&k, &sym("a"), RuleArg::Expr(&chain), None).unwrap(), sym("c"));

    // a rule that maps a value to itself stops immediately
    let idle = rule(sym("a"), sym("a"));
    assert_eq!(rw::replace_repeated(&k, &sym("a"), RuleArg::Expr(&idle), None).unwrap(), sym("a"));
}

#[test]
fn replace_repeated_stops_at_the_iteration_cap() {
    let k = Kernel::new();
    let out = rw::replace_repeated(&k, &int(0), RuleArg::Expr(&count_up()), Some(3)).unwrap();
    assert_eq!(out, int(3));
}

#[test]
fn replace_repeated_honours_abort_requests() {
    let k = Kernel::new();
    let handle = k.defs.abort_handle();
    handle.store(true, Ordering::SeqCst);
    let out = rw::replace_repeated(&k, &int(0), RuleArg::Expr(&count_up()), None).unwrap();
    assert_eq!(out, sym("$Aborted"));
    assert!(rw::is_aborted(&out));

    k.defs.clear_abort();
    let out = rw::replace_repeated(&k, &int(0), RuleArg::Expr(&count_up()), None).unwrap();
    assert_eq!(out, int(5));
}

#[test]
fn dispatch_behaves_like_its_rule_list() {
    let k = Kernel::new();
    let rules = list(vec![rule(sym("a"), int(1)), rule(call("f", vec![var("x")]), sym("x"))]);
    let d = Dispatch::new(&rules).unwrap();
    assert_eq!(d, rules);

    for expr in [sym("a"), call("f", vec![sym("q")]), call("g", vec![sym("a")])] {
        let via_dispatch = rw::replace_all(&k, &expr, RuleArg::Dispatch(&d)).unwrap();
        assert_eq!(via_dispatch, replace_all(&k, &expr, &rules));
    }
    let wrapped = d.to_value();
    assert_eq!(replace_all(&k, &sym("a"), &wrapped), int(1));

    let bad = list(vec![rule(sym("a"), int(1)), int(2)]);
    let err = Dispatch::new(&bad).unwrap_err();
    assert_eq!(err.message_key("Dispatch"), ("Dispatch", "invrpl"));
}

#[test]
fn rewriter_takes_options_from_config() {
    let k = Kernel::new();
    let config = RewriteConfig { max_iterations: Some(2), heads: true, max_results: Some(1) };
    let rw = Rewriter::with_config(&k, config);

    assert_eq!(rw.replace_repeated(&int(0), &count_up()).unwrap(), int(2));

    let r = rule(plus(vec![var("x"), var("y")]), list(vec![sym("x"), sym("y")]));
    let out = rw.replace_list(&plus(vec![sym("a"), sym("b")]), &r).unwrap();
    assert_eq!(out.args().len(), 1);

    let heads = rule(sym("f"), sym("g"));
    let out = rw.replace(&call("f", vec![sym("a")]), &heads, Some(&list(vec![int(1)]))).unwrap();
    assert_eq!(out, call("g", vec![sym("a")]));

    assert!(rw.match_q(&int(1), &blank_h("Integer")).unwrap());
    assert_eq!(Rewriter::new(&k).config(), &RewriteConfig::default());
}
