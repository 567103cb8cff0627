use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::builders::catalog::{self, DEFAULT_SEQUENCE, DEFAULT_TARGET};
use crate::builders::importer::{FileImporter, PassImporter};
use crate::builders::passes::RewritePass;
use crate::builders::storage::write_atomic;
use crate::builders::validator::{PassValidator, StandardValidator};
use crate::core::git;

pub const CONFIG_FILE_NAME: &str = ".i18n-rewrite.toml";
pub const STATE_DIR_NAME: &str = ".i18n-rewrite";
pub const CONFIG_VERSION: &str = "1.0";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum BackupStrategy {
    /// No backup is taken.
    Disabled,
    /// Backups live in memory for the lifetime of the engine.
    Memory,
    /// Backups are written under `.i18n-rewrite/backups`.
    File,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GlobalSettings {
    pub backup_strategy: BackupStrategy,
    pub verbose: bool,
    /// Refuse to rewrite a target that has uncommitted changes.
    #[serde(default)]
    pub require_clean: bool,
}

/// Contents of `.i18n-rewrite.toml`.
///
/// Field order matters for TOML output: plain values first, tables last.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RewriteConfig {
    pub version: String,
    /// Default file to rewrite, relative to the project root.
    pub target: String,
    /// Passes run by the `sequence` command, in order.
    pub sequence: Vec<String>,
    pub global_settings: GlobalSettings,
    /// Custom passes. A custom pass replaces a built-in pass of the same name.
    #[serde(default)]
    pub passes: Vec<RewritePass>,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            target: DEFAULT_TARGET.to_string(),
            sequence: DEFAULT_SEQUENCE.iter().map(|name| name.to_string()).collect(),
            global_settings: GlobalSettings {
                backup_strategy: BackupStrategy::File,
                verbose: false,
                require_clean: false,
            },
            passes: Vec::new(),
        }
    }
}

impl RewriteConfig {
    /// Built-in passes overlaid with the custom ones, built-ins first.
    pub fn available_passes(&self) -> Vec<RewritePass> {
        let mut passes: Vec<RewritePass> = catalog::builtin_passes()
            .into_iter()
            .map(|builtin| {
                self.passes
                    .iter()
                    .find(|custom| custom.name == builtin.name)
                    .cloned()
                    .unwrap_or(builtin)
            })
            .collect();

        for custom in &self.passes {
            if !passes.iter().any(|p| p.name == custom.name) {
                passes.push(custom.clone());
            }
        }
        passes
    }

    pub fn find_pass(&self, name: &str) -> Option<RewritePass> {
        self.available_passes().into_iter().find(|p| p.name == name)
    }

    /// Looks up each name, failing on the first unknown one.
    pub fn resolve_passes<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<RewritePass>> {
        let available = self.available_passes();
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                available
                    .iter()
                    .find(|p| p.name == name)
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("Unknown pass: {name} (see `i18n-rewrite list`)"))
            })
            .collect()
    }

    /// Adds or replaces custom passes by name.
    pub fn upsert_passes(&mut self, passes: Vec<RewritePass>) {
        for pass in passes {
            match self.passes.iter_mut().find(|p| p.name == pass.name) {
                Some(existing) => *existing = pass,
                None => self.passes.push(pass),
            }
        }
    }
}

pub struct ConfigManager {
    config_path: PathBuf,
    project_root: PathBuf,
}

impl ConfigManager {
    /// Uses the enclosing git work tree as the project root, or the current
    /// directory when there is none.
    pub fn new() -> Result<Self> {
        let current_dir = std::env::current_dir().context("Failed to read current directory")?;
        Self::new_at(git::discover_project_root(&current_dir))
    }

    pub fn new_at(project_root: PathBuf) -> Result<Self> {
        if !project_root.is_dir() {
            anyhow::bail!("Project root {} is not a directory", project_root.display());
        }
        let config_path = project_root.join(CONFIG_FILE_NAME);
        Ok(Self {
            config_path,
            project_root,
        })
    }

    /// Writes the default config unless one exists. Returns `true` when a
    /// new file was written.
    pub fn initialize(&self) -> Result<bool> {
        if self.config_path.exists() {
            return Ok(false);
        }
        self.save_config(&RewriteConfig::default())?;
        Ok(true)
    }

    pub fn validate_config(&self) -> Result<()> {
        let config = self.load_config()?;
        let validator = StandardValidator::new(self.project_root.clone());
        let issues = validator.validate_config(&config)?;

        if issues.is_empty() {
            println!("✓ Configuration is valid.");
            Ok(())
        } else {
            println!("⚠️  Found issues in configuration:");
            for issue in issues {
                println!("  - {issue}");
            }
            anyhow::bail!("Configuration validation failed.");
        }
    }

    pub fn list_passes(&self, show_rules: bool) -> Result<()> {
        let config = self.load_config()?;

        for pass in config.available_passes() {
            let position = config
                .sequence
                .iter()
                .position(|name| name == &pass.name)
                .map(|i| format!("#{}", i + 1))
                .unwrap_or_else(|| "--".to_string());
            let custom = if config.passes.iter().any(|p| p.name == pass.name) {
                " (custom)"
            } else {
                ""
            };
            println!(
                "\n📦 {position} {}{custom} | {} rules | {}",
                pass.name,
                pass.rules.len(),
                pass.description
            );
            if let Some(target) = &pass.target {
                println!("   target: {target}");
            }
            if show_rules {
                for rule in &pass.rules {
                    println!(
                        "  🔍 {} | {} | {} => {}",
                        rule.id, rule.kind, rule.pattern, rule.replacement
                    );
                }
            }
        }
        Ok(())
    }

    /// Imports passes from a file and stores them as custom passes. Returns
    /// the names of the imported passes.
    pub fn import_passes(&mut self, file_path: &Path, import_type: &str) -> Result<Vec<String>> {
        let importer = FileImporter::new();
        let passes = importer.import_from_file(file_path, import_type)?;
        let names = passes.iter().map(|p| p.name.clone()).collect();

        let mut config = self.load_config()?;
        config.upsert_passes(passes);
        self.save_config(&config)?;
        Ok(names)
    }

    pub fn export_pass(&self, name: &str, file_path: &Path, format: &str) -> Result<()> {
        let config = self.load_config()?;
        let pass = config
            .find_pass(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown pass: {name}"))?;
        let bundle = PassBundle { passes: vec![pass] };

        let content = match format {
            "json" => serde_json::to_string_pretty(&bundle).context("Failed to serialize to JSON")?,
            "yaml" => serde_yaml::to_string(&bundle).context("Failed to serialize to YAML")?,
            _ => toml::to_string_pretty(&bundle).context("Failed to serialize to TOML")?,
        };

        fs::write(file_path, content).context("Failed to write export file")?;
        Ok(())
    }

    /// Resolves the file to rewrite: explicit path, then the passes' own
    /// target, then the configured target. Relative paths are taken from the
    /// project root.
    pub fn resolve_target(&self, explicit: Option<&Path>, passes: &[RewritePass]) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(self.absolutize(path));
        }

        let first = passes.first().and_then(|p| p.target.as_deref());
        if passes.iter().any(|p| p.target.as_deref() != first) {
            anyhow::bail!("The selected passes target different files; pass --file to pick one");
        }
        match first {
            Some(target) => Ok(self.absolutize(Path::new(target))),
            None => {
                let config = self.load_config()?;
                Ok(self.absolutize(Path::new(&config.target)))
            }
        }
    }

    /// Like [`ConfigManager::resolve_target`] for a single optional pass
    /// name, so files such as the API client's can be reached by pass.
    pub fn resolve_pass_target(&self, explicit: Option<&Path>, pass: Option<&str>) -> Result<PathBuf> {
        let passes = match pass {
            Some(name) => self.load_config()?.resolve_passes(&[name])?,
            None => Vec::new(),
        };
        self.resolve_target(explicit, &passes)
    }

    fn absolutize(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    pub fn get_project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.project_root.join(STATE_DIR_NAME).join("backups")
    }
}

/// On-disk shape of exported and imported pass files.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PassBundle {
    pub passes: Vec<RewritePass>,
}

pub trait ConfigProvider {
    fn load_config(&self) -> Result<RewriteConfig>;
    fn save_config(&self, config: &RewriteConfig) -> Result<()>;
    fn get_config_path(&self) -> &Path;
}

impl ConfigProvider for ConfigManager {
    fn load_config(&self) -> Result<RewriteConfig> {
        if !self.config_path.exists() {
            return Ok(RewriteConfig::default());
        }

        let content = fs::read_to_string(&self.config_path).context("Failed to read config file")?;

        toml::from_str(&content).context("Failed to parse config file")
    }

    fn save_config(&self, config: &RewriteConfig) -> Result<()> {
        let content = toml::to_string_pretty(config).context("Failed to serialize config")?;

        write_atomic(&self.config_path, &content).context("Failed to write config file")?;

        Ok(())
    }

    fn get_config_path(&self) -> &Path {
        &self.config_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::rules::RewriteRule;
    use tempfile::tempdir;

    #[test]
    fn test_initialize_writes_default_once() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new_at(dir.path().to_path_buf()).unwrap();

        assert!(manager.initialize().unwrap());
        assert!(!manager.initialize().unwrap());

        let config = manager.load_config().unwrap();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.target, DEFAULT_TARGET);
        assert_eq!(config.sequence.len(), DEFAULT_SEQUENCE.len());
        assert_eq!(config.global_settings.backup_strategy, BackupStrategy::File);
    }

    #[test]
    fn test_config_with_custom_pass_survives_toml() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new_at(dir.path().to_path_buf()).unwrap();
        let mut config = RewriteConfig::default();
        config.upsert_passes(vec![RewritePass::new(
            "custom",
            "",
            "ok",
            vec![RewriteRule::regex("c1", "a(b)", "${1}").skip_after("x")],
        )]);
        manager.save_config(&config).unwrap();

        let loaded = manager.load_config().unwrap();
        assert_eq!(loaded.passes, config.passes);
    }

    #[test]
    fn test_custom_pass_overrides_builtin() {
        let mut config = RewriteConfig::default();
        config.upsert_passes(vec![RewritePass::new("syntax-ops", "mine", "ok", vec![])]);

        let pass = config.find_pass("syntax-ops").unwrap();
        assert_eq!(pass.description, "mine");
        let names: Vec<_> = config.available_passes().into_iter().map(|p| p.name).collect();
        assert_eq!(names.iter().filter(|n| *n == "syntax-ops").count(), 1);
    }

    #[test]
    fn test_resolve_passes_rejects_unknown() {
        let config = RewriteConfig::default();
        assert!(config.resolve_passes(&["translations"]).is_ok());
        assert!(config.resolve_passes(&["nope"]).is_err());
    }

    #[test]
    fn test_resolve_target_prefers_pass_target() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new_at(dir.path().to_path_buf()).unwrap();
        let config = RewriteConfig::default();

        let api = config.resolve_passes(&["api-cleanup"]).unwrap();
        assert_eq!(
            manager.resolve_target(None, &api).unwrap(),
            dir.path().join(catalog::API_TARGET)
        );

        let page = config.resolve_passes(&["translations"]).unwrap();
        assert_eq!(
            manager.resolve_target(None, &page).unwrap(),
            dir.path().join(DEFAULT_TARGET)
        );

        let mixed = config.resolve_passes(&["translations", "api-cleanup"]).unwrap();
        assert!(manager.resolve_target(None, &mixed).is_err());
        assert_eq!(
            manager.resolve_target(Some(Path::new("x.jsx")), &mixed).unwrap(),
            dir.path().join("x.jsx")
        );
    }

    #[test]
    fn test_resolve_pass_target_reaches_api_client() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new_at(dir.path().to_path_buf()).unwrap();

        assert_eq!(
            manager.resolve_pass_target(None, Some("api-cleanup")).unwrap(),
            dir.path().join(catalog::API_TARGET)
        );
        assert_eq!(
            manager.resolve_pass_target(None, None).unwrap(),
            dir.path().join(DEFAULT_TARGET)
        );
        assert_eq!(
            manager
                .resolve_pass_target(Some(Path::new("x.jsx")), Some("api-cleanup"))
                .unwrap(),
            dir.path().join("x.jsx")
        );
        assert!(manager.resolve_pass_target(None, Some("nope")).is_err());
    }
}
