use serde::{Deserialize, Serialize};

use crate::builders::rules::{CompiledRule, Rewrite, RewriteRule, RuleError, TextRewriter};

/// A named, ordered list of rules that is applied to one file in one go.
///
/// Passes are data: the built-in ones come from [`crate::builders::catalog`],
/// custom ones come from the config file or an imported bundle.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RewritePass {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Printed once the pass has been written to disk.
    #[serde(default = "default_confirmation")]
    pub confirmation: String,
    /// File this pass is meant for, relative to the project root. Falls back
    /// to the configured target when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default)]
    pub rules: Vec<RewriteRule>,
}

fn default_confirmation() -> String {
    "Rewrite pass completed.".to_string()
}

impl RewritePass {
    pub fn new(name: &str, description: &str, confirmation: &str, rules: Vec<RewriteRule>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            confirmation: confirmation.to_string(),
            target: None,
            rules,
        }
    }

    pub fn with_target(mut self, target: &str) -> Self {
        self.target = Some(target.to_string());
        self
    }

    /// Compiles every rule, failing on the first one that does not compile.
    pub fn compile(&self) -> Result<CompiledPass, RuleError> {
        let rules = self
            .rules
            .iter()
            .map(RewriteRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CompiledPass {
            name: self.name.clone(),
            confirmation: self.confirmation.clone(),
            rules,
        })
    }
}

/// How many replacements one rule made during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleHit {
    pub rule_id: String,
    pub replacements: usize,
}

/// What a pass did to the buffer, rule by rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOutcome {
    pub pass: String,
    pub confirmation: String,
    pub hits: Vec<RuleHit>,
}

impl PassOutcome {
    pub fn total_replacements(&self) -> usize {
        self.hits.iter().map(|hit| hit.replacements).sum()
    }

    /// Rules that found nothing to replace.
    pub fn unmatched_rules(&self) -> impl Iterator<Item = &RuleHit> {
        self.hits.iter().filter(|hit| hit.replacements == 0)
    }
}

#[derive(Debug, Clone)]
pub struct CompiledPass {
    pub name: String,
    pub confirmation: String,
    rules: Vec<CompiledRule>,
}

impl CompiledPass {
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Runs the rules in order, each one on the output of the previous one.
    pub fn apply(&self, text: &str) -> (String, PassOutcome) {
        let mut current = text.to_string();
        let mut hits = Vec::with_capacity(self.rules.len());

        for rule in &self.rules {
            let Rewrite { text, replacements } = rule.rewrite(&current);
            tracing::debug!("{}/{}: {} replacement(s)", self.name, rule.id, replacements);
            hits.push(RuleHit {
                rule_id: rule.id.clone(),
                replacements,
            });
            current = text;
        }

        let outcome = PassOutcome {
            pass: self.name.clone(),
            confirmation: self.confirmation.clone(),
            hits,
        };
        (current, outcome)
    }
}

impl TextRewriter for CompiledPass {
    fn rewrite(&self, text: &str) -> Rewrite {
        let (text, outcome) = self.apply(text);
        Rewrite {
            text,
            replacements: outcome.total_replacements(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pass(rules: Vec<RewriteRule>) -> CompiledPass {
        RewritePass::new("test", "", "done", rules).compile().unwrap()
    }

    #[test]
    fn test_rules_chain_in_order() {
        let compiled = pass(vec![
            RewriteRule::literal("a", "one", "two"),
            RewriteRule::literal("b", "two", "three"),
        ]);
        let (text, outcome) = compiled.apply("one two");
        assert_eq!(text, "three three");
        assert_eq!(outcome.hits[0].replacements, 1);
        assert_eq!(outcome.hits[1].replacements, 2);
        assert_eq!(outcome.total_replacements(), 3);
    }

    #[test]
    fn test_unmatched_rules_are_listed() {
        let compiled = pass(vec![
            RewriteRule::literal("hit", "x", "y"),
            RewriteRule::literal("miss", "absent", "z"),
        ]);
        let (_, outcome) = compiled.apply("x");
        let unmatched: Vec<_> = outcome.unmatched_rules().map(|h| h.rule_id.as_str()).collect();
        assert_eq!(unmatched, vec!["miss"]);
    }

    #[test]
    fn test_compile_fails_on_bad_rule() {
        let result = RewritePass::new("p", "", "", vec![RewriteRule::regex("bad", "[", "x")]).compile();
        assert!(result.is_err());
    }

    #[test]
    fn test_pass_deserializes_with_defaults() {
        let pass: RewritePass = toml::from_str(
            r#"
name = "custom"

[[rules]]
id = "one"
kind = "literal"
pattern = "a"
replacement = "b"
"#,
        )
        .unwrap();
        assert_eq!(pass.confirmation, "Rewrite pass completed.");
        assert_eq!(pass.rules.len(), 1);
        assert!(pass.target.is_none());
    }
}
