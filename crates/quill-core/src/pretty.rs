use crate::value::Value;

/// Input-form rendering used in diagnostics and test failures. Lists use
/// braces and rules use infix arrows; everything else prints as `h[a, b]`.
pub fn format_value(v: &Value) -> String {
    match v {
        Value::Integer(n) => n.to_string(),
        Value::Real(f) => {
            if f.fract() == 0.0 { format!("{:.1}", f) } else { f.to_string() }
        }
        Value::Rational { num, den } => format!("{}/{}", num, den),
        Value::String(s) => format!("\"{}\"", s),
        Value::Symbol(s) => s.clone(),
        Value::Boolean(b) => if *b { "True".into() } else { "False".into() },
        Value::Expr { head, args } => {
            let a: Vec<String> = args.iter().map(format_value).collect();
            match (head.as_symbol(), args.len()) {
                (Some("List"), _) => format!("{{{}}}", a.join(", ")),
                (Some("Rule"), 2) => format!("{} -> {}", a[0], a[1]),
                (Some("RuleDelayed"), 2) => format!("{} :> {}", a[0], a[1]),
                (Some("Plus"), n) if n > 1 => a.join(" + "),
                _ => format!("{}[{}]", format_value(head), a.join(", ")),
            }
        }
    }
}
