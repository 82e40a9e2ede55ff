use crate::matcher::{Delimiter, Matcher};
use crate::types::{Multiplicity, RewriteRule, RuleAction};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// The legacy context import line the builtin migration replaces.
pub const LEGACY_CONTEXT_IMPORT: &str =
    r#"import { usePendingTransactionsContext } from "@/contexts/PendingTransactionsContext";"#;

/// Replacement import block: the legacy context import followed by the
/// shared l2-to-l1 library exports that supersede the local copies.
pub const SHARED_LIB_IMPORT_BLOCK: &str = r#"import { usePendingTransactionsContext } from "@/contexts/PendingTransactionsContext";
import {
  type MessagePassedEventData,
  type DisputeGameData,
  type ProofData,
  extractMessagePassedEvent,
  waitForDisputeGame,
  generateProof,
  submitProof,
  optimismPortalAbi,
  resolveGame as resolveGameL2ToL1,
  finalizeWithdrawal as finalizeWithdrawalL2ToL1,
} from "@/lib/l2-to-l1";"#;

/// Everything one run needs: the rule list (order is execution order)
/// and the strict flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Fail the run when any enabled rule matches nothing
    #[serde(default)]
    pub strict: bool,
    /// Rules to apply, in order
    pub rules: Vec<RewriteRule>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            strict: false,
            rules: bridge_dedupe_rules(),
        }
    }
}

impl TransformConfig {
    /// Load config from file path (functional approach)
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TransformConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|_| {
                eprintln!("⚠️  Failed to load rules from {}, using builtin set", p);
                Self::default()
            }),
            None => Self::default(),
        }
    }
}

fn delete_block(name: &str, anchor: &str, delimiter: Delimiter, groups: usize) -> RewriteRule {
    RewriteRule {
        name: name.to_string(),
        matcher: Matcher::Block {
            anchor: anchor.to_string(),
            delimiter,
            groups,
            trailing_blank_lines: 1,
        },
        action: RuleAction::Delete,
        multiplicity: Multiplicity::First,
        enabled: true,
    }
}

/// The builtin rule set: migrate a bridge-interface component from local
/// withdrawal-proof plumbing to the shared l2-to-l1 library. One import
/// substitution, then eight block deletions for the code the library
/// now provides.
pub fn bridge_dedupe_rules() -> Vec<RewriteRule> {
    vec![
        RewriteRule {
            name: "SharedLibImports".to_string(),
            matcher: Matcher::Literal {
                text: LEGACY_CONTEXT_IMPORT.to_string(),
            },
            action: RuleAction::Replace {
                replacement: SHARED_LIB_IMPORT_BLOCK.to_string(),
            },
            multiplicity: Multiplicity::First,
            enabled: true,
        },
        // two interface declarations, each its own brace group
        delete_block(
            "DuplicateEventInterfaces",
            "// Interface for MessagePassed event data",
            Delimiter::Braces,
            2,
        ),
        // two parseAbi(...) consts, each its own paren group
        delete_block(
            "DuplicateDisputeAbis",
            "// DisputeGameFactory ABI",
            Delimiter::Parens,
            2,
        ),
        delete_block(
            "LocalWaitForDisputeGame",
            "// Step 2: Poll DisputeGameFactory for suitable game",
            Delimiter::Parens,
            1,
        ),
        delete_block(
            "LocalGenerateProof",
            "// Step 3: Generate Merkle Proof",
            Delimiter::Parens,
            1,
        ),
        delete_block(
            "LocalPortalAbi",
            "// OptimismPortal ABI for proof submission",
            Delimiter::Parens,
            1,
        ),
        delete_block(
            "LocalSubmitProof",
            "// Step 4: Submit Proof to L1",
            Delimiter::Parens,
            1,
        ),
        delete_block(
            "LocalResolveGame",
            "// Step 5: Resolve dispute game",
            Delimiter::Parens,
            1,
        ),
        delete_block(
            "LocalFinalizeWithdrawal",
            "// Step 6: Finalize withdrawal",
            Delimiter::Parens,
            1,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_bridge_dedupe() {
        let config = TransformConfig::default();
        assert!(!config.strict);
        let names: Vec<&str> = config.rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "SharedLibImports",
                "DuplicateEventInterfaces",
                "DuplicateDisputeAbis",
                "LocalWaitForDisputeGame",
                "LocalGenerateProof",
                "LocalPortalAbi",
                "LocalSubmitProof",
                "LocalResolveGame",
                "LocalFinalizeWithdrawal",
            ]
        );
        assert!(config.rules.iter().all(|r| r.enabled));
    }

    #[test]
    fn test_rule_names_are_unique() {
        let config = TransformConfig::default();
        let mut names: Vec<&str> = config.rules.iter().map(|r| r.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), config.rules.len());
    }

    #[test]
    fn test_import_block_starts_with_legacy_line() {
        // the replacement keeps the context import as its first line
        assert!(SHARED_LIB_IMPORT_BLOCK.starts_with(LEGACY_CONTEXT_IMPORT));
        assert!(SHARED_LIB_IMPORT_BLOCK.ends_with(r#"} from "@/lib/l2-to-l1";"#));
    }

    #[test]
    fn test_config_round_trips_through_yaml() {
        let config = TransformConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let reloaded: TransformConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_load_with_fallback_missing_file_uses_builtin() {
        let config = TransformConfig::load_with_fallback(Some("/nonexistent/rules.yaml"));
        assert_eq!(config, TransformConfig::default());
    }

    #[test]
    fn test_load_from_file_reads_yaml() {
        let yaml = r#"
strict: true
rules:
  - name: DropDebug
    matcher: !Pattern
      pattern: 'console\.debug\([^\n]*\);\n'
    action: Delete
    multiplicity: All
"#;
        let path = std::env::temp_dir().join("srcmod_config_load_test.yaml");
        std::fs::write(&path, yaml).unwrap();
        let config = TransformConfig::load_from_file(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(config.strict);
        assert_eq!(config.rules.len(), 1);
        assert_eq!(config.rules[0].name, "DropDebug");
        assert_eq!(config.rules[0].multiplicity, Multiplicity::All);
        assert!(config.rules[0].enabled);
    }
}
