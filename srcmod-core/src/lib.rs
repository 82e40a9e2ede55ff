// Srcmod Core Library
//
// Rule-driven source rewriting: an ordered list of rewrite rules is
// folded over a single file's text buffer. Main interface for one-shot
// code migrations and dedupe passes.

pub mod types;
pub mod matcher;
pub mod engine;
pub mod config;
pub mod processor;

// Re-export main types and functions for easy use
pub use types::*;
pub use matcher::{Delimiter, Matcher};
pub use engine::{PipelineError, PipelineOutput, RulePipeline};
pub use config::{bridge_dedupe_rules, TransformConfig};
pub use processor::TransformProcessor;
