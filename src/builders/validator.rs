use anyhow::Result;
use std::collections::HashSet;
use std::path::PathBuf;

use crate::builders::passes::{CompiledPass, RewritePass};
use crate::builders::rules::{RewriteRule, RuleKind, TextRewriter};
use crate::core::config::{CONFIG_VERSION, RewriteConfig};

/// The `PassValidator` trait defines the public interface for validating
/// the config and the rule tables it refers to.
pub trait PassValidator {
    /// Performs a full validation of the `RewriteConfig` and returns a list
    /// of issues found.
    ///
    /// # Arguments
    /// * `config`: The `RewriteConfig` to be validated.
    ///
    /// # Returns
    /// A `Result<Vec<String>>` where each string describes one issue.
    fn validate_config(&self, config: &RewriteConfig) -> Result<Vec<String>>;

    /// Validates a single pass's rule table.
    fn validate_pass(&self, pass: &RewritePass) -> Result<Vec<String>>;
}

/// Runs the static checks that catch the mistakes made when rule tables are
/// written by hand.
pub struct StandardValidator {
    project_root: PathBuf,
}

impl StandardValidator {
    pub fn new(project_root: PathBuf) -> Self {
        Self { project_root }
    }

    /// Looks for rules that can never do anything useful because of the
    /// rules before them.
    ///
    /// - two rules with the same kind and pattern: the second never matches
    ///   original text.
    /// - a literal rule whose pattern contains the pattern of an earlier
    ///   literal rule: the earlier rule eats the text first.
    fn check_rule_conflicts(&self, pass: &RewritePass) -> Vec<String> {
        let mut warnings = Vec::new();
        let mut seen = HashSet::new();

        for (i, rule) in pass.rules.iter().enumerate() {
            if !seen.insert((rule.kind, rule.pattern.as_str())) {
                warnings.push(format!(
                    "{}: rule {} repeats an earlier pattern",
                    pass.name, rule.id
                ));
                continue;
            }

            if rule.kind != RuleKind::Literal {
                continue;
            }
            let shadowing = pass.rules[..i].iter().find(|earlier| {
                earlier.kind == RuleKind::Literal
                    && earlier.pattern != rule.pattern
                    && !earlier.pattern.is_empty()
                    && rule.pattern.contains(&earlier.pattern)
            });
            if let Some(earlier) = shadowing {
                warnings.push(format!(
                    "{}: rule {} is shadowed by earlier rule {} (its pattern is a substring); move it first",
                    pass.name, rule.id, earlier.id
                ));
            }
        }
        warnings
    }

    fn check_rule(&self, pass: &RewritePass, rule: &RewriteRule) -> Vec<String> {
        let mut issues = Vec::new();
        let label = format!("{}: rule {}", pass.name, rule.id);

        // Syntax first; the remaining checks need a compiled pattern.
        let compiled = match rule.compile() {
            Ok(compiled) => compiled,
            Err(e) => {
                issues.push(format!("{}: {e}", pass.name));
                return issues;
            }
        };

        if rule.kind == RuleKind::Literal && rule.pattern == rule.replacement {
            issues.push(format!("{label} replaces its pattern with itself"));
        }
        if rule.limit == Some(0) {
            issues.push(format!("{label} has limit 0 and will never replace anything"));
        }

        if rule.kind == RuleKind::Regex {
            let matcher = compiled.matcher();
            for reference in group_references(&rule.replacement) {
                let exists = match reference.parse::<usize>() {
                    Ok(index) => index < matcher.captures_len(),
                    Err(_) => matcher.capture_names().flatten().any(|name| name == reference),
                };
                if !exists {
                    issues.push(format!(
                        "{label} references group '{reference}' which the pattern does not define"
                    ));
                }
            }
            if has_backslash_reference(&rule.replacement) {
                issues.push(format!(
                    "{label} uses a backslash group reference; write ${{1}} instead of \\1"
                ));
            }
        }
        issues
    }
}

/// `\1`-style references are left as text by the regex crate.
fn has_backslash_reference(replacement: &str) -> bool {
    replacement
        .as_bytes()
        .windows(2)
        .any(|pair| pair[0] == b'\\' && pair[1].is_ascii_digit())
}

/// Group names or indexes referenced by `$name` / `${name}` in a regex
/// replacement. `$$` is skipped.
fn group_references(replacement: &str) -> Vec<String> {
    let mut references = Vec::new();
    let mut rest = replacement;

    while let Some(pos) = rest.find('$') {
        rest = &rest[pos + 1..];
        if let Some(after) = rest.strip_prefix('$') {
            rest = after;
            continue;
        }
        if let Some(braced) = rest.strip_prefix('{') {
            if let Some(end) = braced.find('}') {
                references.push(braced[..end].to_string());
                rest = &braced[end + 1..];
            }
            continue;
        }
        let end = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if end > 0 {
            references.push(rest[..end].to_string());
            rest = &rest[end..];
        }
    }
    references
}

/// Runs `pass` over `text` rule by rule and names every rule whose output
/// changes when it runs a second time.
pub fn non_idempotent_rules(pass: &CompiledPass, text: &str) -> Vec<String> {
    let mut offenders = Vec::new();
    let mut current = text.to_string();

    for rule in pass.rules() {
        if !rule.is_idempotent_on(&current) {
            offenders.push(rule.id.clone());
        }
        current = rule.rewrite(&current).text;
    }
    offenders
}

impl PassValidator for StandardValidator {
    /// Checks the version, the sequence, the target file and every pass the
    /// config can reach.
    fn validate_config(&self, config: &RewriteConfig) -> Result<Vec<String>> {
        let mut issues = Vec::new();

        if config.version != CONFIG_VERSION {
            issues.push(format!("Unsupported config version: {}", config.version));
        }

        let available = config.available_passes();
        for name in &config.sequence {
            if !available.iter().any(|p| &p.name == name) {
                issues.push(format!("Sequence names unknown pass: {name}"));
            }
        }

        let target = self.project_root.join(&config.target);
        if !target.exists() {
            issues.push(format!("Target file not found: {}", config.target));
        }

        for pass in &available {
            issues.extend(self.validate_pass(pass)?);
        }

        Ok(issues)
    }

    fn validate_pass(&self, pass: &RewritePass) -> Result<Vec<String>> {
        let mut issues = Vec::new();

        if pass.rules.is_empty() {
            issues.push(format!("{}: pass has no rules", pass.name));
        }
        issues.extend(self.check_rule_conflicts(pass));
        for rule in &pass.rules {
            issues.extend(self.check_rule(pass, rule));
        }

        Ok(issues)
    }
}
