use colored::Colorize;
use std::path::Path;

use crate::builders::passes::PassOutcome;

/// Summary of a run over one target file.
#[derive(Debug, Clone)]
pub struct RunSummary<'a> {
    pub target: &'a Path,
    pub passes: &'a [PassOutcome],
    pub changed: bool,
    pub dry_run: bool,
}

pub trait RunReporter {
    /// Called once per pass after the file has been written.
    fn report_pass(&self, outcome: &PassOutcome, verbose: bool);

    fn report_summary(&self, summary: &RunSummary<'_>);

    /// Rules that change their own output when applied again.
    fn report_non_idempotent(&self, pass: &str, rule_ids: &[String]);
}

/// Prints to the console. This is the reporter the CLI uses.
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }

    fn format_pass_line(&self, outcome: &PassOutcome) -> String {
        let unmatched = outcome.unmatched_rules().count();
        let icon = if outcome.total_replacements() == 0 {
            "⚪"
        } else if unmatched > 0 {
            "🟡"
        } else {
            "🟢"
        };
        format!(
            "{icon} {} ({} rules, {} replacements, {} unmatched)",
            outcome.pass,
            outcome.hits.len(),
            outcome.total_replacements(),
            unmatched
        )
    }
}

impl RunReporter for ConsoleReporter {
    fn report_pass(&self, outcome: &PassOutcome, verbose: bool) {
        if verbose {
            println!("{}", self.format_pass_line(outcome));
            for hit in &outcome.hits {
                if hit.replacements == 0 {
                    println!("  └─ {} {}", hit.rule_id, "no match".yellow());
                } else {
                    println!("  └─ {} ×{}", hit.rule_id, hit.replacements);
                }
            }
        }
        println!("{}", outcome.confirmation);
    }

    fn report_summary(&self, summary: &RunSummary<'_>) {
        println!("\n📊 {}", "Rewrite Report".cyan().bold());
        println!("=====================================");
        println!("Target: {}", summary.target.display());

        for outcome in summary.passes {
            println!("{}", self.format_pass_line(outcome));
            for hit in outcome.unmatched_rules() {
                println!("  └─ {} {}", hit.rule_id, "matched nothing".yellow());
            }
        }

        let total: usize = summary.passes.iter().map(PassOutcome::total_replacements).sum();
        println!("\n📈 Summary:");
        println!("  Passes: {}", summary.passes.len());
        println!("  Total replacements: {total}");

        if !summary.changed {
            println!("{}", "  File already up to date.".green());
        } else if summary.dry_run {
            println!("{}", "  Dry run: the file was not written.".bright_blue().bold());
        } else {
            println!("{}", "  File rewritten.".green().bold());
        }
    }

    fn report_non_idempotent(&self, pass: &str, rule_ids: &[String]) {
        if rule_ids.is_empty() {
            println!("✓ {pass}: every rule is idempotent on this file");
            return;
        }
        println!("{} {pass}: rules that keep changing their own output:", "⚠️ ".red());
        for id in rule_ids {
            println!("  - {id}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::passes::RuleHit;

    fn outcome(hits: &[(&str, usize)]) -> PassOutcome {
        PassOutcome {
            pass: "translations".to_string(),
            confirmation: "done".to_string(),
            hits: hits
                .iter()
                .map(|(id, n)| RuleHit {
                    rule_id: id.to_string(),
                    replacements: *n,
                })
                .collect(),
        }
    }

    #[test]
    fn test_pass_line_counts() {
        let line = ConsoleReporter::new().format_pass_line(&outcome(&[("a", 2), ("b", 0)]));
        assert!(line.starts_with("🟡 translations"));
        assert!(line.contains("2 rules, 2 replacements, 1 unmatched"));
    }

    #[test]
    fn test_pass_line_icons() {
        let reporter = ConsoleReporter::new();
        assert!(reporter.format_pass_line(&outcome(&[("a", 0)])).starts_with("⚪"));
        assert!(reporter.format_pass_line(&outcome(&[("a", 1)])).starts_with("🟢"));
    }
}
