use quill_core::{Attributes, Value};

/// Everything the matcher needs from the surrounding evaluator.
///
/// Only `evaluate` is required; the lookups default to "nothing declared",
/// which makes every head attribute-free and every `Optional` without an
/// inline default fail.
pub trait Evaluate {
    /// Reduce an expression to normal form. Guards and `PatternTest`
    /// predicates pass only when this returns `True`.
    fn evaluate(&self, expr: Value) -> Value;

    fn is_numeric(&self, expr: &Value) -> bool { expr.is_number() }

    fn attributes(&self, _symbol: &str) -> Attributes { Attributes::empty() }

    /// `Default[symbol, position, count]` with trailing arguments omitted
    /// when `None`.
    fn default_value(&self, _symbol: &str, _position: Option<usize>, _count: Option<usize>) -> Option<Value> {
        None
    }

    /// `Options[symbol]` as `(name, value)` pairs.
    fn declared_options(&self, _symbol: &str) -> Option<Vec<(String, Value)>> { None }

    /// Polled by `ReplaceRepeated` between iterations.
    fn abort_requested(&self) -> bool { false }
}
