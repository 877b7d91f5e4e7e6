use log::trace;
use quill_core::Value;

use crate::error::{Result, RewriteError};
use crate::rule::{Rule, RuleSet};

/// A rule list compiled once and reused across rewrite calls.
///
/// It behaves like the list it was built from: drivers accept either, and a
/// dispatch compares equal to its source list.
#[derive(Debug, Clone)]
pub struct Dispatch {
    source: Value,
    rules: RuleSet,
}

impl Dispatch {
    /// Accepts a rule, a list of rules (nested lists are flattened), or a
    /// `Dispatch[...]` expression wrapping either.
    pub fn new(rules: &Value) -> Result<Self> {
        let source = if rules.has_form("Dispatch", 1) { &rules.args()[0] } else { rules };
        let mut compiled = RuleSet::new();
        collect(source, source, &mut compiled)?;
        trace!("compiled dispatch of {} rules", compiled.len());
        let source = if source.has_head("List") { source.clone() } else { Value::list(vec![source.clone()]) };
        Ok(Self { source, rules: compiled })
    }

    pub fn rules(&self) -> &[Rule] { self.rules.as_slice() }

    pub fn len(&self) -> usize { self.rules.len() }

    pub fn is_empty(&self) -> bool { self.rules.is_empty() }

    /// `Normal[dispatch]`: the rule list it was built from.
    pub fn normal(&self) -> &Value { &self.source }

    pub fn to_value(&self) -> Value { Value::call("Dispatch", vec![self.source.clone()]) }
}

fn collect(v: &Value, root: &Value, out: &mut RuleSet) -> Result<()> {
    if v.has_head("List") {
        for item in v.args() {
            collect(item, root, out)?;
        }
        return Ok(());
    }
    if v.has_form("Dispatch", 1) {
        return collect(&v.args()[0], root, out);
    }
    if v.has_head("Rule") || v.has_head("RuleDelayed") {
        out.push(Rule::from_value(v)?);
        return Ok(());
    }
    Err(RewriteError::InvalidDispatch(root.clone()))
}

impl PartialEq for Dispatch {
    fn eq(&self, other: &Self) -> bool { self.source == other.source }
}

impl PartialEq<Value> for Dispatch {
    fn eq(&self, other: &Value) -> bool { self.source == *other }
}
