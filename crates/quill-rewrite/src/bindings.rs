//! Persistent variable bindings.
//!
//! A binding set is an immutable linked list shared between backtracking
//! branches: extending it allocates one node and leaves the parent intact,
//! so an abandoned branch can never leak a binding into its siblings.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use quill_core::Value;

/// Key prefix for values bound by `OptionsPattern`. Pattern variable names
/// are symbols and never start with an underscore.
pub const OPTION_PREFIX: &str = "_option_";

/// Name of an option given as a symbol or a string.
pub(crate) fn option_name(v: &Value) -> Option<&str> {
    match v {
        Value::Symbol(s) | Value::String(s) => Some(s.as_str()),
        _ => None,
    }
}

struct Node {
    name: String,
    value: Value,
    next: Option<Rc<Node>>,
}

#[derive(Clone, Default)]
pub struct Bindings {
    head: Option<Rc<Node>>,
    len: usize,
}

impl Bindings {
    pub fn new() -> Self { Self::default() }

    /// Most recent binding for `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.nodes().find(|n| n.name == name).map(|n| &n.value)
    }

    pub fn contains(&self, name: &str) -> bool { self.get(name).is_some() }

    /// A new binding set with `name` bound in front of `self`.
    pub fn bind(&self, name: impl Into<String>, value: Value) -> Bindings {
        let node = Node { name: name.into(), value, next: self.head.clone() };
        Bindings { head: Some(Rc::new(node)), len: self.len + 1 }
    }

    pub fn bind_option(&self, option: &str, value: Value) -> Bindings {
        self.bind(format!("{OPTION_PREFIX}{option}"), value)
    }

    pub fn option(&self, option: &str) -> Option<&Value> {
        self.nodes()
            .find(|n| n.name.strip_prefix(OPTION_PREFIX) == Some(option))
            .map(|n| &n.value)
    }

    pub fn len(&self) -> usize { self.len }

    pub fn is_empty(&self) -> bool { self.len == 0 }

    /// Pattern variables, newest binding per name, option values excluded.
    pub fn variables(&self) -> HashMap<String, Value> {
        let mut out = HashMap::new();
        for n in self.nodes().filter(|n| !n.name.starts_with(OPTION_PREFIX)) {
            out.entry(n.name.clone()).or_insert_with(|| n.value.clone());
        }
        out
    }

    /// Option values keyed by option name.
    pub fn options(&self) -> HashMap<String, Value> {
        let mut out = HashMap::new();
        for n in self.nodes() {
            if let Some(opt) = n.name.strip_prefix(OPTION_PREFIX) {
                out.entry(opt.to_string()).or_insert_with(|| n.value.clone());
            }
        }
        out
    }

    fn nodes(&self) -> impl Iterator<Item = &Node> {
        std::iter::successors(self.head.as_deref(), |n| n.next.as_deref())
    }
}

impl fmt::Debug for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.nodes().map(|n| (&n.name, &n.value))).finish()
    }
}
