use anyhow::Result;
use clap::Parser;
use std::path::Path;

// Import from srcmod-core
use srcmod_core::{Matcher, RuleAction, TransformConfig, TransformProcessor, TransformReport};

#[derive(Parser)]
#[command(name = "srcmod")]
#[command(about = "A rule-driven source rewriter for one-shot code migrations")]
struct Args {
    /// Path to the source file to transform
    #[arg(short, long, default_value = "src/components/bridge-interface.tsx")]
    input: String,

    /// Output file path (if not specified, `<input>.new`)
    #[arg(short, long)]
    output: Option<String>,

    /// Path to custom rule file (YAML format)
    #[arg(short, long)]
    rules: Option<String>,

    /// Fail when any enabled rule matches nothing
    #[arg(long)]
    strict: bool,

    /// Run the pipeline without writing the output file
    #[arg(long)]
    dry_run: bool,

    /// Write a JSON run report to this path
    #[arg(long)]
    report: Option<String>,

    /// Show the active rule set and exit
    #[arg(long)]
    show_rules: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    println!("🦀 Srcmod Source Rewriter");

    // Load rules using the functional fallback pattern
    let mut config = TransformConfig::load_with_fallback(args.rules.as_deref());

    if let Some(rules_path) = &args.rules {
        println!("📋 Loaded rules from: {}", rules_path);
    } else {
        println!("📋 Using builtin rule set");
    }

    // Apply CLI overrides to config
    if args.strict {
        config.strict = true;
    }

    if args.show_rules {
        show_rules(&config);
        return Ok(());
    }

    // Check if input file exists
    if !Path::new(&args.input).exists() {
        eprintln!("❌ Input file not found at: {}", args.input);
        eprintln!("   Please check the file path.");
        std::process::exit(1);
    }

    let processor = TransformProcessor::new(&config)?;

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| format!("{}.new", args.input));

    println!("📄 Transforming: {}", args.input);

    // Dry run mode: full pipeline, report only, nothing written
    if args.dry_run {
        println!("🔬 Dry run mode (no files will be written)");
        match processor.dry_run_file(&args.input, &output_path) {
            Ok(report) => {
                print_outcomes(&report);
                if let Some(report_path) = &args.report {
                    save_report(&report, report_path)?;
                }
                println!("✅ Dry run complete (would save to: {})", output_path);
            }
            Err(e) => {
                eprintln!("❌ Transformation failed: {e:#}");
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    match processor.process_file(&args.input, &output_path) {
        Ok(report) => {
            print_outcomes(&report);
            println!("✅ Refactored source saved to: {}", output_path);
            println!(
                "   {} of {} rules applied ({} bytes in, {} bytes out)",
                report.rules_matched, report.rules_total, report.input_bytes, report.output_bytes
            );
            if let Some(report_path) = &args.report {
                save_report(&report, report_path)?;
            }
        }
        Err(e) => {
            eprintln!("❌ Transformation failed: {e:#}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_outcomes(report: &TransformReport) {
    println!("\n📊 Rule outcomes:");
    for outcome in &report.outcomes {
        let status = if !outcome.enabled {
            "disabled".to_string()
        } else if outcome.matched {
            format!(
                "applied ({} bytes removed, {} inserted)",
                outcome.bytes_removed, outcome.bytes_inserted
            )
        } else {
            "no match".to_string()
        };
        println!("   {:.<35} {}", outcome.rule, status);
    }
}

fn show_rules(config: &TransformConfig) {
    println!("\n📋 Active rule set ({} rules):", config.rules.len());
    for (index, rule) in config.rules.iter().enumerate() {
        let status = if rule.enabled { "" } else { " [disabled]" };
        println!("  {}. {}{}", index + 1, rule.name, status);
        println!("     matcher: {}", describe_matcher(&rule.matcher));
        println!("     action:  {}", describe_action(&rule.action));
    }

    println!("\n📁 Example rule files in ./configs/:");
    println!("  bridge-dedupe.yaml  - The builtin bridge-interface migration, as a file");

    println!("\n📝 Usage Examples:");
    println!("  cargo run -- -i src/components/bridge-interface.tsx");
    println!("  cargo run -- -i component.tsx -o component.migrated.tsx");
    println!("  cargo run -- -i component.tsx -r configs/bridge-dedupe.yaml --strict");
    println!("  cargo run -- -i component.tsx --dry-run --report report.json");
}

fn describe_matcher(matcher: &Matcher) -> String {
    match matcher {
        Matcher::Literal { text } => {
            let first_line = text.lines().next().unwrap_or_default();
            format!("literal \"{}\"", first_line)
        }
        Matcher::Block {
            anchor,
            delimiter,
            groups,
            trailing_blank_lines,
        } => format!(
            "block at \"{}\" ({:?} x{}, {} trailing blank)",
            anchor, delimiter, groups, trailing_blank_lines
        ),
        Matcher::Pattern { pattern } => format!("pattern /{}/", pattern),
    }
}

fn describe_action(action: &RuleAction) -> String {
    match action {
        RuleAction::Replace { replacement } => {
            format!("replace with {} line(s)", replacement.lines().count())
        }
        RuleAction::Delete => "delete".to_string(),
    }
}

fn save_report(report: &TransformReport, report_path: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(report_path, json)?;
    println!("💾 Run report saved to: {}", report_path);
    Ok(())
}
