pub mod bindings;
pub mod config;
pub mod defs;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod eval;
pub mod level;
pub mod matcher;
pub mod pattern;
pub mod quick;
pub mod rule;

pub use bindings::Bindings;
pub use config::{ConfigError, RewriteConfig};
pub use defs::DefinitionStore;
pub use dispatch::Dispatch;
pub use engine::{is_aborted, match_q, replace, replace_all, replace_list, replace_repeated, Rewriter, RuleArg, ABORTED};
pub use error::{ErrorKind, Result, RewriteError, ITERATION_LIMIT, MISSING_DEFAULT};
pub use eval::Evaluate;
pub use level::LevelSpec;
pub use matcher::{Flow, Matcher, Stop};
pub use pattern::{compile_pattern, Pattern};
pub use rule::{substitute, Delayed, Rule, RuleSet};
