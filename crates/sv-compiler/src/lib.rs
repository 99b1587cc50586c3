//! Sieve Filter List Compiler
//!
//! This crate parses ABP/uBO/hosts-style filter lists and compiles them into
//! the immutable rulesets matched by `sv-core`.

pub mod builder;
pub mod optimizer;
pub mod parser;

pub use builder::{build_ruleset, compile_ruleset, CompileStats};
pub use optimizer::optimize_patterns;
pub use parser::{
    classify_line, parse_filter_list, parse_filter_list_with, sanitize_domain, LineRule,
    ParseOptions, ParseStats, ParsedList,
};
