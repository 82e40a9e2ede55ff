// Rule Engine - applies rewrite rules to a text buffer in sequence
//
// The pipeline owns one String buffer for the whole run. Each enabled
// rule receives the previous rule's output, so later rules see (and may
// match inside) text inserted by earlier ones. A rule that matches
// nothing leaves the buffer untouched; only strict mode turns that into
// an error, and only after the full pass has completed.

use thiserror::Error;

use crate::config::TransformConfig;
use crate::matcher::CompiledMatcher;
use crate::types::{MatchSpan, Multiplicity, RewriteRule, RuleAction, RuleOutcome};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("rule '{rule}' has an invalid pattern: {source}")]
    InvalidPattern {
        rule: String,
        #[source]
        source: regex::Error,
    },

    #[error("strict mode: {} enabled rule(s) matched nothing: {}", .rules.len(), .rules.join(", "))]
    UnmatchedRules { rules: Vec<String> },
}

/// Final buffer plus the per-rule ledger for one run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub text: String,
    pub outcomes: Vec<RuleOutcome>,
}

#[derive(Debug)]
struct PreparedRule {
    rule: RewriteRule,
    matcher: CompiledMatcher,
}

/// Executes an ordered rule list against a buffer. Rules are compiled
/// once at construction; a pipeline can run against many inputs.
#[derive(Debug)]
pub struct RulePipeline {
    rules: Vec<PreparedRule>,
    strict: bool,
}

impl RulePipeline {
    /// Compile `rules` into a runnable pipeline. Fails if any pattern
    /// matcher does not compile.
    pub fn new(rules: Vec<RewriteRule>, strict: bool) -> Result<Self, PipelineError> {
        let mut prepared = Vec::with_capacity(rules.len());
        for rule in rules {
            let matcher = rule
                .matcher
                .compile()
                .map_err(|source| PipelineError::InvalidPattern {
                    rule: rule.name.clone(),
                    source,
                })?;
            prepared.push(PreparedRule { rule, matcher });
        }
        Ok(Self {
            rules: prepared,
            strict,
        })
    }

    pub fn from_config(config: &TransformConfig) -> Result<Self, PipelineError> {
        Self::new(config.rules.clone(), config.strict)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule in order over `input` and return the final buffer
    /// with the outcome ledger.
    pub fn run(&self, input: &str) -> Result<PipelineOutput, PipelineError> {
        println!("🔗 Executing rewrite pipeline ({} rules)...", self.rules.len());

        let mut buffer = input.to_string();
        let mut outcomes = Vec::with_capacity(self.rules.len());

        for prepared in &self.rules {
            let name = &prepared.rule.name;
            if !prepared.rule.enabled {
                println!("⏭️  Skipping disabled rule: {name}");
                outcomes.push(RuleOutcome::disabled(&prepared.rule));
                continue;
            }

            println!("🔧 Applying rule: {name}");
            let (next, outcome) = apply_rule(prepared, buffer);
            buffer = next;
            if outcome.matched {
                println!(
                    "   ✅ {} span(s) rewritten ({} bytes removed, {} bytes inserted)",
                    outcome.applications, outcome.bytes_removed, outcome.bytes_inserted
                );
            } else {
                println!("   ⏭️  No match, buffer unchanged");
            }
            outcomes.push(outcome);
        }

        if self.strict {
            let unmatched: Vec<String> = outcomes
                .iter()
                .filter(|o| o.enabled && !o.matched)
                .map(|o| o.rule.clone())
                .collect();
            if !unmatched.is_empty() {
                return Err(PipelineError::UnmatchedRules { rules: unmatched });
            }
        }

        Ok(PipelineOutput {
            text: buffer,
            outcomes,
        })
    }
}

/// Apply one rule to the buffer, consuming one span (or every span for
/// multiplicity All) and returning the next buffer with the outcome.
fn apply_rule(prepared: &PreparedRule, buffer: String) -> (String, RuleOutcome) {
    let rule = &prepared.rule;
    let replacement = match &rule.action {
        RuleAction::Replace { replacement } => replacement.as_str(),
        RuleAction::Delete => "",
    };

    let mut buf = buffer;
    let mut cursor = 0usize;
    let mut applications = 0usize;
    let mut first_span: Option<MatchSpan> = None;
    let mut bytes_removed = 0usize;
    let mut bytes_inserted = 0usize;

    while let Some(range) = prepared.matcher.find_span(&buf, cursor) {
        // a zero-width match with an empty replacement makes no progress
        if range.is_empty() && replacement.is_empty() {
            break;
        }
        if first_span.is_none() {
            first_span = Some(MatchSpan {
                start: range.start,
                end: range.end,
            });
        }
        bytes_removed += range.len();
        bytes_inserted += replacement.len();

        let mut next = String::with_capacity(buf.len() - range.len() + replacement.len());
        next.push_str(&buf[..range.start]);
        next.push_str(replacement);
        next.push_str(&buf[range.end..]);
        buf = next;

        applications += 1;
        // continue past the inserted text so a replacement containing
        // its own needle cannot loop
        cursor = range.start + replacement.len();
        if rule.multiplicity == Multiplicity::First {
            break;
        }
    }

    let outcome = RuleOutcome {
        rule: rule.name.clone(),
        action: rule.action.kind().to_string(),
        enabled: true,
        matched: applications > 0,
        applications,
        span: first_span,
        bytes_removed,
        bytes_inserted,
    };
    (buf, outcome)
}
