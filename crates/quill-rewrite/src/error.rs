use quill_core::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RewriteError {
    #[error("First element in pattern {0} is not a valid pattern name.")]
    InvalidPatternName(Value),
    #[error("{head} called with {got} arguments; {expected} expected.")]
    PatternArity { head: String, got: usize, expected: &'static str },
    #[error("Range specification in integers (max or {{min, max}}) expected at position 2 in {0}.")]
    RepeatedRange(Value),
    #[error("{0} is not a valid replacement rule.")]
    InvalidRule(Value),
    #[error("{head} called with {got} arguments; 2 arguments are expected.")]
    RuleArity { head: String, got: usize },
    #[error("Elements of {0} are a mixture of lists and nonlists.")]
    RuleMix(Value),
    #[error("{0} is not a valid rule or list of rules.")]
    InvalidDispatch(Value),
    #[error("Level specification {0} is not of the form n, {{n}}, or {{m, n}}.")]
    InvalidLevelSpec(Value),
}

/// Message key logged when an `Optional` has no default anywhere. Only
/// that match attempt fails; no error is returned.
pub const MISSING_DEFAULT: (&str, &str) = ("Pattern", "nodef");

/// Message key logged when `ReplaceRepeated` runs out of iterations. The
/// last value is returned.
pub const ITERATION_LIMIT: (&str, &str) = ("ReplaceRepeated", "rrlim");

/// Broad failure categories a caller can branch on. Missing defaults and
/// cancellation are not errors: see `MISSING_DEFAULT` and
/// `engine::is_aborted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    PatternCompile,
    InvalidRule,
    InvalidLevelSpec,
}

impl RewriteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RewriteError::InvalidPatternName(_)
            | RewriteError::PatternArity { .. }
            | RewriteError::RepeatedRange(_) => ErrorKind::PatternCompile,
            RewriteError::InvalidRule(_)
            | RewriteError::RuleArity { .. }
            | RewriteError::RuleMix(_)
            | RewriteError::InvalidDispatch(_) => ErrorKind::InvalidRule,
            RewriteError::InvalidLevelSpec(_) => ErrorKind::InvalidLevelSpec,
        }
    }

    /// `(symbol, tag)` of the diagnostic message. `reps` and `rmix` are
    /// reported against the driver that raised them.
    pub fn message_key(&self, driver: &'static str) -> (&'static str, &'static str) {
        match self {
            RewriteError::InvalidPatternName(_) => ("Pattern", "patvar"),
            RewriteError::PatternArity { .. } => ("General", "argr"),
            RewriteError::RepeatedRange(_) => ("Repeated", "range"),
            RewriteError::InvalidRule(_) => (driver, "reps"),
            RewriteError::RuleArity { .. } => ("Rule", "argrx"),
            RewriteError::RuleMix(_) => (driver, "rmix"),
            RewriteError::InvalidDispatch(_) => ("Dispatch", "invrpl"),
            RewriteError::InvalidLevelSpec(_) => ("General", "level"),
        }
    }
}

pub type Result<T> = std::result::Result<T, RewriteError>;
