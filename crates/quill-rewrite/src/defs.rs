use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use quill_core::{Attributes, Value};

use crate::eval::Evaluate;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DefaultKey {
    symbol: String,
    position: Option<usize>,
    count: Option<usize>,
}

/// Per-symbol declarations the matcher reads: attributes, `Default` values
/// and `Options`. As an `Evaluate` it leaves expressions untouched, so it
/// doubles as a purely structural kernel.
#[derive(Debug, Default)]
pub struct DefinitionStore {
    attributes: HashMap<String, Attributes>,
    defaults: HashMap<DefaultKey, Value>,
    options: HashMap<String, Vec<(String, Value)>>,
    abort: Arc<AtomicBool>,
}

impl DefinitionStore {
    pub fn new() -> Self { Self::default() }

    pub fn set_attributes(&mut self, sym: &str, attrs: Attributes) {
        self.attributes.insert(sym.to_string(), attrs);
    }

    pub fn attributes_of(&self, sym: &str) -> Attributes {
        self.attributes.get(sym).copied().unwrap_or_default()
    }

    /// `Default[sym] = v`, `Default[sym, i] = v` or `Default[sym, i, n] = v`.
    pub fn set_default(&mut self, sym: &str, position: Option<usize>, count: Option<usize>, value: Value) {
        let key = DefaultKey { symbol: sym.to_string(), position, count };
        self.defaults.insert(key, value);
    }

    pub fn default_of(&self, sym: &str, position: Option<usize>, count: Option<usize>) -> Option<&Value> {
        self.defaults.get(&DefaultKey { symbol: sym.to_string(), position, count })
    }

    pub fn set_options(&mut self, sym: &str, options: Vec<(String, Value)>) {
        self.options.insert(sym.to_string(), options);
    }

    pub fn options_of(&self, sym: &str) -> Option<&[(String, Value)]> {
        self.options.get(sym).map(Vec::as_slice)
    }

    /// Shared flag another thread may set to stop `ReplaceRepeated`.
    pub fn abort_handle(&self) -> Arc<AtomicBool> { Arc::clone(&self.abort) }

    pub fn clear_abort(&self) { self.abort.store(false, Ordering::SeqCst); }
}

impl Evaluate for DefinitionStore {
    fn evaluate(&self, expr: Value) -> Value { expr }

    fn attributes(&self, symbol: &str) -> Attributes { self.attributes_of(symbol) }

    fn default_value(&self, symbol: &str, position: Option<usize>, count: Option<usize>) -> Option<Value> {
        self.default_of(symbol, position, count).cloned()
    }

    fn declared_options(&self, symbol: &str) -> Option<Vec<(String, Value)>> {
        self.options_of(symbol).map(<[_]>::to_vec)
    }

    fn abort_requested(&self) -> bool { self.abort.load(Ordering::SeqCst) }
}
