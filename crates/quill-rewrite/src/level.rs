use quill_core::Value;

use crate::error::{Result, RewriteError};

/// Which levels of an expression a traversal visits. Non-negative bounds
/// count from the root (level 0); negative bounds count depth, so `-1`
/// means atoms. `stop == None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelSpec {
    pub start: i64,
    pub stop: Option<i64>,
}

impl Default for LevelSpec {
    fn default() -> Self { LevelSpec::ROOT }
}

impl LevelSpec {
    /// `{0}`: the expression itself.
    pub const ROOT: LevelSpec = LevelSpec { start: 0, stop: Some(0) };
    /// `All`: levels 0 through infinity.
    pub const ALL: LevelSpec = LevelSpec { start: 0, stop: None };

    pub fn from_value(spec: &Value) -> Result<LevelSpec> {
        let invalid = || RewriteError::InvalidLevelSpec(spec.clone());
        if spec.is_symbol("All") {
            return Ok(LevelSpec::ALL);
        }
        if spec.has_head("List") {
            return match spec.args() {
                [n] => {
                    let n = bound(n).ok_or_else(invalid)?;
                    Ok(LevelSpec { start: n.ok_or_else(invalid)?, stop: n })
                }
                [m, n] => {
                    let start = bound(m).flatten().ok_or_else(invalid)?;
                    let stop = bound(n).ok_or_else(invalid)?;
                    Ok(LevelSpec { start, stop })
                }
                _ => Err(invalid()),
            };
        }
        let stop = bound(spec).ok_or_else(invalid)?;
        Ok(LevelSpec { start: 1, stop })
    }

    /// Whether a traversal at `level` can still reach admitted levels below.
    pub fn descends_past(&self, level: usize) -> bool {
        match self.stop {
            Some(stop) if stop >= 0 => (level as i64) < stop,
            _ => true,
        }
    }

    /// Negative bounds need the depth of the subexpression.
    pub fn needs_depth(&self) -> bool {
        self.start < 0 || matches!(self.stop, Some(s) if s < 0)
    }

    pub fn contains(&self, level: usize, expr: &Value) -> bool {
        let level = level as i64;
        let depth = if self.needs_depth() { expr.depth() as i64 } else { 0 };
        let lower = if self.start >= 0 { level >= self.start } else { depth <= -self.start };
        let upper = match self.stop {
            None => true,
            Some(s) if s >= 0 => level <= s,
            Some(s) => depth >= -s,
        };
        lower && upper
    }
}

/// `Some(None)` is `Infinity`, `Some(Some(n))` an integer bound.
fn bound(v: &Value) -> Option<Option<i64>> {
    match v {
        Value::Integer(n) => Some(Some(*n)),
        Value::Symbol(s) if s == "Infinity" => Some(None),
        Value::Expr { .. } if v.has_form("DirectedInfinity", 1) && v.args()[0] == Value::Integer(1) => Some(None),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(n: i64) -> Value { Value::Integer(n) }

    #[test]
    fn parses_every_accepted_form() {
        assert_eq!(LevelSpec::from_value(&int(2)).unwrap(), LevelSpec { start: 1, stop: Some(2) });
        assert_eq!(LevelSpec::from_value(&Value::list(vec![int(2)])).unwrap(), LevelSpec { start: 2, stop: Some(2) });
        assert_eq!(
            LevelSpec::from_value(&Value::list(vec![int(0), Value::symbol("Infinity")])).unwrap(),
            LevelSpec::ALL
        );
        assert_eq!(LevelSpec::from_value(&Value::symbol("All")).unwrap(), LevelSpec::ALL);
        assert_eq!(LevelSpec::from_value(&Value::symbol("Infinity")).unwrap(), LevelSpec { start: 1, stop: None });
    }

    #[test]
    fn rejects_malformed_specs() {
        for bad in [
            Value::string("x"),
            Value::list(vec![]),
            Value::list(vec![int(1), int(2), int(3)]),
            Value::list(vec![Value::symbol("Infinity")]),
            Value::Real(1.5),
        ] {
            let err = LevelSpec::from_value(&bad).unwrap_err();
            assert_eq!(err, RewriteError::InvalidLevelSpec(bad));
        }
    }

    #[test]
    fn negative_levels_measure_depth() {
        let atoms_only = LevelSpec { start: -1, stop: Some(-1) };
        let leaf = Value::symbol("a");
        let node = Value::call("f", vec![leaf.clone()]);
        assert!(atoms_only.contains(3, &leaf));
        assert!(!atoms_only.contains(0, &node));
        let everything = LevelSpec { start: 0, stop: Some(-1) };
        assert!(everything.contains(0, &node));
        assert!(everything.contains(1, &leaf));
        assert!(everything.descends_past(40));
    }

    #[test]
    fn positive_stop_limits_descent() {
        let spec = LevelSpec { start: 1, stop: Some(2) };
        assert!(spec.descends_past(1));
        assert!(!spec.descends_past(2));
        assert!(!spec.contains(0, &int(1)));
        assert!(spec.contains(2, &int(1)));
    }
}
