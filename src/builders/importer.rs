use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::builders::passes::RewritePass;
use crate::builders::rules::RewriteRule;
use crate::core::config::PassBundle;

/// Separates a rule's pattern from its replacement in the custom format.
pub const RULE_SEPARATOR: &str = " => ";

/// A trait that defines the behavior for importing rewrite passes from a
/// source.
pub trait PassImporter {
    /// Imports passes from a file.
    ///
    /// # Arguments
    /// * `file_path`: The path to the file to be imported.
    /// * `import_type`: The format to parse ("custom", "toml", "json" or "yaml").
    ///
    /// # Returns
    /// The parsed passes, in file order, ready to be merged into the config.
    fn import_from_file(&self, file_path: &Path, import_type: &str) -> Result<Vec<RewritePass>>;
}

/// Parses pass files from disk.
pub struct FileImporter;

impl PassImporter for FileImporter {
    fn import_from_file(&self, file_path: &Path, import_type: &str) -> Result<Vec<RewritePass>> {
        let content = fs::read_to_string(file_path).context("Failed to read import file")?;

        let passes = match import_type {
            "toml" => toml::from_str::<PassBundle>(&content)
                .context("Failed to parse TOML pass bundle")?
                .passes,
            "json" => serde_json::from_str::<PassBundle>(&content)
                .context("Failed to parse JSON pass bundle")?
                .passes,
            "yaml" => serde_yaml::from_str::<PassBundle>(&content)
                .context("Failed to parse YAML pass bundle")?
                .passes,
            "custom" => self.parse_custom_format(&content)?,
            other => anyhow::bail!("Unknown import format: {other}"),
        };

        if passes.is_empty() {
            anyhow::bail!("No passes found in {}", file_path.display());
        }
        Ok(passes)
    }
}

impl FileImporter {
    pub fn new() -> Self {
        Self
    }

    /// Parses the line-oriented custom format.
    ///
    /// ```text
    /// # comment
    /// [pass-name]
    /// description: What the pass does
    /// confirmation: Printed after the write
    /// target: src/pages/Other.jsx
    /// literal: old text => new text
    /// regex: t\('([^']+)'\) => {t('${1}')}
    /// ```
    ///
    /// Rule lines keep trailing whitespace, since a pattern such as
    /// `الساعة ` may end in a space. Rules get ids `<pass>-NN`.
    pub fn parse_custom_format(&self, content: &str) -> Result<Vec<RewritePass>> {
        let mut passes: Vec<RewritePass> = Vec::new();

        for (line_no, raw) in content.lines().enumerate() {
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            // New pass section: `[name]`
            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                let name = trimmed[1..trimmed.len() - 1].trim();
                if name.is_empty() {
                    anyhow::bail!("line {}: empty pass name", line_no + 1);
                }
                passes.push(RewritePass::new(name, "", "Rewrite pass completed.", Vec::new()));
                continue;
            }

            let Some(pass) = passes.last_mut() else {
                anyhow::bail!("line {}: entry outside of a [pass] section", line_no + 1);
            };

            let line = raw.trim_start();
            let Some((key, value)) = line.split_once(':') else {
                anyhow::bail!("line {}: expected `key: value`", line_no + 1);
            };
            let value = value.strip_prefix(' ').unwrap_or(value);

            match key.trim() {
                "description" => pass.description = value.trim().to_string(),
                "confirmation" => pass.confirmation = value.trim().to_string(),
                "target" => pass.target = Some(value.trim().to_string()),
                kind @ ("literal" | "regex") => {
                    let Some((pattern, replacement)) = value.split_once(RULE_SEPARATOR) else {
                        anyhow::bail!(
                            "line {}: rule must be `pattern{RULE_SEPARATOR}replacement`",
                            line_no + 1
                        );
                    };
                    let mut rule = RewriteRule::new(kind, pattern, replacement)
                        .with_context(|| format!("line {}", line_no + 1))?;
                    rule.id = format!("{}-{:02}", pass.name, pass.rules.len() + 1);
                    pass.rules.push(rule);
                }
                other => anyhow::bail!("line {}: unknown key `{other}`", line_no + 1),
            }
        }

        Ok(passes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::rules::RuleKind;
    use tempfile::tempdir;

    #[test]
    fn test_custom_format() {
        let content = "\
# header names
[header-names]
description: Localize header names
confirmation: Fixed header names.
literal: الساعة  => t('at') + '
regex: >(\\s*)t\\(([^)]+)\\)< => >{${1}t(${2})}<
";
        let passes = FileImporter::new().parse_custom_format(content).unwrap();
        assert_eq!(passes.len(), 1);
        let pass = &passes[0];
        assert_eq!(pass.name, "header-names");
        assert_eq!(pass.confirmation, "Fixed header names.");
        assert_eq!(pass.rules.len(), 2);
        assert_eq!(pass.rules[0].id, "header-names-01");
        assert_eq!(pass.rules[0].kind, RuleKind::Literal);
        assert_eq!(pass.rules[0].pattern, "الساعة ");
        assert_eq!(pass.rules[0].replacement, "t('at') + '");
        assert_eq!(pass.rules[1].kind, RuleKind::Regex);
        assert_eq!(pass.rules[1].pattern, r">(\s*)t\(([^)]+)\)<");
    }

    #[test]
    fn test_custom_format_errors() {
        let importer = FileImporter::new();
        assert!(importer.parse_custom_format("literal: a => b").is_err());
        assert!(importer.parse_custom_format("[p]\nliteral: no separator").is_err());
        assert!(importer.parse_custom_format("[p]\nglob: a => b").is_err());
    }

    #[test]
    fn test_import_json_bundle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bundle.json");
        fs::write(
            &path,
            r#"{"passes":[{"name":"p","confirmation":"ok","rules":[{"kind":"regex","pattern":"a","replacement":"b","limit":1}]}]}"#,
        )
        .unwrap();

        let passes = FileImporter::new().import_from_file(&path, "json").unwrap();
        assert_eq!(passes[0].rules[0].limit, Some(1));
        assert!(passes[0].rules[0].id.starts_with("rule-"));
    }

    #[test]
    fn test_import_rejects_empty_and_unknown() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        fs::write(&path, "# nothing here\n").unwrap();

        let importer = FileImporter::new();
        assert!(importer.import_from_file(&path, "custom").is_err());
        assert!(importer.import_from_file(&path, "xml").is_err());
    }
}
