use serde::{Deserialize, Serialize};
use std::fmt;

/// An immutable symbolic expression: an atom or `head[args...]`.
///
/// Lists and sequences are ordinary expressions headed by the symbols `List`
/// and `Sequence`. `PartialEq` is purely structural; `same_q` additionally
/// identifies `Boolean(b)` with the symbols `True`/`False`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Integer(i64),
    Real(f64),
    Rational { num: i64, den: i64 },
    String(String),
    Symbol(String),
    Boolean(bool),
    Expr { head: Box<Value>, args: Vec<Value> },
}

impl Value {
    pub fn symbol<S: Into<String>>(s: S) -> Self { Value::Symbol(s.into()) }
    pub fn string<S: Into<String>>(s: S) -> Self { Value::String(s.into()) }
    pub fn expr(head: Value, args: Vec<Value>) -> Self { Value::Expr { head: Box::new(head), args } }
    /// `name[args...]` with a symbol head.
    pub fn call<S: Into<String>>(name: S, args: Vec<Value>) -> Self { Value::expr(Value::symbol(name), args) }
    pub fn list(items: Vec<Value>) -> Self { Value::call("List", items) }
    pub fn sequence(items: Vec<Value>) -> Self { Value::call("Sequence", items) }

    pub fn is_atom(&self) -> bool { !matches!(self, Value::Expr { .. }) }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Real(_) | Value::Rational { .. })
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Value::Symbol(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_symbol(&self, name: &str) -> bool { self.as_symbol() == Some(name) }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// `True` in either of its spellings.
    pub fn is_true(&self) -> bool {
        matches!(self, Value::Boolean(true)) || self.is_symbol("True")
    }

    /// The truth value of `Boolean(b)` or the symbols `True`/`False`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            Value::Symbol(s) if s == "True" => Some(true),
            Value::Symbol(s) if s == "False" => Some(false),
            _ => None,
        }
    }

    /// Structural equality that treats `Boolean(b)` and the symbol spelling
    /// of `b` as the same atom. Pattern matching compares with this; the
    /// derived `PartialEq` keeps the two apart.
    pub fn same_q(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Expr { head: h1, args: a1 }, Value::Expr { head: h2, args: a2 }) => {
                a1.len() == a2.len() && h1.same_q(h2) && a1.iter().zip(a2).all(|(x, y)| x.same_q(y))
            }
            (Value::Boolean(_), _) | (_, Value::Boolean(_)) => {
                self.as_bool().is_some() && self.as_bool() == other.as_bool()
            }
            _ => self == other,
        }
    }

    /// Name of the head symbol. Atoms report their kind (`Integer`, `Real`,
    /// `Rational`, `String`, `Symbol`).
    pub fn head_name(&self) -> Option<&str> {
        match self {
            Value::Integer(_) => Some("Integer"),
            Value::Real(_) => Some("Real"),
            Value::Rational { .. } => Some("Rational"),
            Value::String(_) => Some("String"),
            Value::Symbol(_) | Value::Boolean(_) => Some("Symbol"),
            Value::Expr { head, .. } => head.as_symbol(),
        }
    }

    pub fn head(&self) -> Value {
        match self {
            Value::Expr { head, .. } => (**head).clone(),
            atom => Value::symbol(atom.head_name().unwrap_or("Symbol")),
        }
    }

    /// Structural head comparison without allocating for atoms.
    pub fn head_is(&self, head: &Value) -> bool {
        match self {
            Value::Expr { head: h, .. } => **h == *head,
            atom => match (head, atom.head_name()) {
                (Value::Symbol(s), Some(kind)) => s == kind,
                _ => false,
            },
        }
    }

    pub fn has_head(&self, name: &str) -> bool {
        matches!(self, Value::Expr { head, .. } if head.is_symbol(name))
    }

    pub fn has_form(&self, name: &str, arity: usize) -> bool {
        self.has_head(name) && self.args().len() == arity
    }

    /// Arguments of a compound expression; empty for atoms.
    pub fn args(&self) -> &[Value] {
        match self {
            Value::Expr { args, .. } => args,
            _ => &[],
        }
    }

    pub fn is_sequence(&self) -> bool { self.has_head("Sequence") }

    pub fn is_empty_sequence(&self) -> bool { self.has_form("Sequence", 0) }

    /// The items a candidate stands for: the arguments of `Sequence[...]`,
    /// otherwise the value itself.
    pub fn sequence_items(&self) -> &[Value] {
        if self.is_sequence() { self.args() } else { std::slice::from_ref(self) }
    }

    /// `Depth`: atoms are 1, compound expressions are one more than their
    /// deepest argument. Heads are not counted.
    pub fn depth(&self) -> usize {
        match self {
            Value::Expr { args, .. } => 1 + args.iter().map(Value::depth).max().unwrap_or(0),
            _ => 1,
        }
    }

    /// Sign of a real-valued number atom.
    pub fn sign(&self) -> Option<std::cmp::Ordering> {
        match self {
            Value::Integer(n) => Some(n.cmp(&0)),
            Value::Real(f) => f.partial_cmp(&0.0),
            Value::Rational { num, den } => Some((num.signum() * den.signum()).cmp(&0)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::pretty::format_value(self))
    }
}
