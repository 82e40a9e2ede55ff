use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::matcher::Matcher;

/// The report version stamped on every run report.
/// Bump this when the report shape changes.
pub const REPORT_VERSION: &str = "0.1.0";

fn default_true() -> bool {
    true
}

/// One declarative rewrite step: a matcher that locates a span of the
/// buffer, and an action that replaces or deletes it.
///
/// Rules are pure data with no compiled state. They round-trip
/// through YAML, so rule sets can live in config files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewriteRule {
    /// Stable name used in progress output, reports and strict-mode errors
    pub name: String,
    /// How the rule locates the span it acts on
    pub matcher: Matcher,
    /// What happens to the matched span
    pub action: RuleAction,
    /// Whether the rule stops after the first match or sweeps the buffer
    #[serde(default)]
    pub multiplicity: Multiplicity,
    /// Disabled rules are skipped with a notice and never count as unmatched
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// The edit applied to a matched span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RuleAction {
    /// Substitute the span with fixed replacement text
    Replace { replacement: String },
    /// Remove the span outright
    Delete,
}

impl RuleAction {
    /// Short label used in reports and rule listings.
    pub fn kind(&self) -> &'static str {
        match self {
            RuleAction::Replace { .. } => "replace",
            RuleAction::Delete => "delete",
        }
    }
}

/// How many occurrences a rule consumes in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Multiplicity {
    /// First occurrence only
    First,
    /// Every occurrence, scanning left to right
    All,
}

impl Default for Multiplicity {
    fn default() -> Self {
        Multiplicity::First
    }
}

/// Byte range of a match within the buffer the rule saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
}

/// What a single rule did during a run.
#[derive(Debug, Clone, Serialize)]
pub struct RuleOutcome {
    pub rule: String,
    /// "replace" or "delete"
    pub action: String,
    /// False when the rule was disabled in the config
    pub enabled: bool,
    pub matched: bool,
    /// Number of spans the rule consumed (0 or 1 unless multiplicity is All)
    pub applications: usize,
    /// Span of the first match, relative to the buffer this rule received
    pub span: Option<MatchSpan>,
    pub bytes_removed: usize,
    pub bytes_inserted: usize,
}

impl RuleOutcome {
    /// Outcome for a rule that never ran because it was disabled.
    pub fn disabled(rule: &RewriteRule) -> Self {
        Self {
            rule: rule.name.clone(),
            action: rule.action.kind().to_string(),
            enabled: false,
            matched: false,
            applications: 0,
            span: None,
            bytes_removed: 0,
            bytes_inserted: 0,
        }
    }
}

/// The serializable record of one complete run. Carries a report version
/// so consumers can detect and handle shape changes.
#[derive(Debug, Clone, Serialize)]
pub struct TransformReport {
    pub report_version: String,
    pub created_at: DateTime<Utc>,
    pub input_path: String,
    pub output_path: String,
    pub input_bytes: usize,
    pub output_bytes: usize,
    pub rules_total: usize,
    pub rules_matched: usize,
    /// Enabled rules that found nothing (the set strict mode rejects)
    pub rules_unmatched: Vec<String>,
    pub outcomes: Vec<RuleOutcome>,
}

impl TransformReport {
    pub fn new(
        input_path: &str,
        output_path: &str,
        input_bytes: usize,
        output_bytes: usize,
        outcomes: Vec<RuleOutcome>,
    ) -> Self {
        let rules_matched = outcomes.iter().filter(|o| o.matched).count();
        let rules_unmatched = outcomes
            .iter()
            .filter(|o| o.enabled && !o.matched)
            .map(|o| o.rule.clone())
            .collect();
        Self {
            report_version: REPORT_VERSION.to_string(),
            created_at: Utc::now(),
            input_path: input_path.to_string(),
            output_path: output_path.to_string(),
            input_bytes,
            output_bytes,
            rules_total: outcomes.len(),
            rules_matched,
            rules_unmatched,
            outcomes,
        }
    }
}
