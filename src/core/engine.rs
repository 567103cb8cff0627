use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::builders::passes::{CompiledPass, PassOutcome, RewritePass};
use crate::builders::storage::{
    BackupData, FileStorage, MemoryStorage, NoStorage, StorageProvider, write_atomic,
};
use crate::builders::validator::non_idempotent_rules;
use crate::core::config::{BackupStrategy, ConfigManager, ConfigProvider, GlobalSettings};
use crate::core::git::{Git2WorkingTree, WorkingTree};

/// What a run did to one target file.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub target: PathBuf,
    /// Final text after every pass.
    pub text: String,
    pub passes: Vec<PassOutcome>,
    /// The final text differs from what was on disk.
    pub changed: bool,
    /// The file on disk was replaced.
    pub written: bool,
}

pub struct RewriteEngine {
    config_manager: ConfigManager,
    settings: GlobalSettings,
    storage: Box<dyn StorageProvider>,
}

impl RewriteEngine {
    pub fn new(config_manager: ConfigManager) -> Result<Self> {
        let config = config_manager.load_config()?;

        // Choose storage strategy based on config
        let storage: Box<dyn StorageProvider> = match config.global_settings.backup_strategy {
            BackupStrategy::Disabled => Box::new(NoStorage),
            BackupStrategy::Memory => Box::new(MemoryStorage::new()),
            BackupStrategy::File => Box::new(FileStorage::new(config_manager.backup_dir())?),
        };

        Ok(Self {
            config_manager,
            settings: config.global_settings,
            storage,
        })
    }

    pub fn config_manager(&self) -> &ConfigManager {
        &self.config_manager
    }

    pub fn settings(&self) -> &GlobalSettings {
        &self.settings
    }

    /// Applies `passes` to `text` in order without touching the disk.
    ///
    /// Every pass is compiled before any of them runs, so a broken rule
    /// anywhere in the list stops the run before it starts.
    pub fn apply(&self, text: &str, passes: &[RewritePass]) -> Result<(String, Vec<PassOutcome>)> {
        let compiled = compile_all(passes)?;

        let mut current = text.to_string();
        let mut outcomes = Vec::with_capacity(compiled.len());
        for pass in &compiled {
            let (next, outcome) = pass.apply(&current);
            tracing::debug!(
                "Pass {} made {} replacement(s)",
                outcome.pass,
                outcome.total_replacements()
            );
            current = next;
            outcomes.push(outcome);
        }
        Ok((current, outcomes))
    }

    /// Reads `target`, applies `passes`, and (unless `dry_run`) backs up the
    /// original and atomically writes the result.
    ///
    /// Nothing is written when the passes leave the text unchanged.
    pub fn run(&mut self, passes: &[RewritePass], target: &Path, dry_run: bool) -> Result<RunOutcome> {
        let original = fs::read_to_string(target)
            .with_context(|| format!("Failed to read {}", target.display()))?;
        let (text, outcomes) = self.apply(&original, passes)?;
        let changed = text != original;

        let written = changed && !dry_run;
        if written {
            self.check_working_tree(target)?;

            let key = self.storage_key(target);
            let names = passes.iter().map(|p| p.name.clone()).collect();
            let backup = BackupData::new(Path::new(&key), names, original);
            self.storage
                .store_backup(&key, backup)
                .context("Failed to back up target before rewriting")?;

            write_atomic(target, &text)?;
            tracing::info!("Rewrote {}", target.display());
        } else if !changed {
            tracing::info!("{} already up to date", target.display());
        }

        Ok(RunOutcome {
            target: target.to_path_buf(),
            text,
            passes: outcomes,
            changed,
            written,
        })
    }

    /// For each pass, the ids of rules that are not idempotent on the text
    /// they would see when the passes run in order over `target`.
    pub fn check_idempotence(&self, passes: &[RewritePass], target: &Path) -> Result<Vec<(String, Vec<String>)>> {
        let mut current = fs::read_to_string(target)
            .with_context(|| format!("Failed to read {}", target.display()))?;

        let mut report = Vec::new();
        for pass in compile_all(passes)? {
            report.push((pass.name.clone(), non_idempotent_rules(&pass, &current)));
            current = pass.apply(&current).0;
        }
        Ok(report)
    }

    /// Puts the newest backup of `target` back in place.
    ///
    /// A backup recorded for another file is put back into storage and the
    /// restore fails without touching `target`.
    pub fn restore(&mut self, target: &Path) -> Result<Option<BackupData>> {
        let key = self.storage_key(target);
        let Some(backup) = self.storage.restore_backup(&key)? else {
            return Ok(None);
        };
        if backup.target != Path::new(&key) {
            let recorded = backup.target.display().to_string();
            self.storage.store_backup(&key, backup)?;
            anyhow::bail!(
                "Newest backup under {key} was taken of {recorded}; refusing to restore it over {}",
                target.display()
            );
        }
        write_atomic(target, &backup.original_content)?;
        tracing::info!("Restored {} from backup {}", target.display(), backup.id);
        Ok(Some(backup))
    }

    pub fn backups(&self, target: &Path) -> Result<Vec<BackupData>> {
        self.storage.list_backups(&self.storage_key(target))
    }

    pub fn prune_backups(&mut self) -> Result<()> {
        self.storage.cleanup()
    }

    /// Backups are keyed by the path relative to the project root when
    /// possible, so the key survives moving the checkout.
    fn storage_key(&self, target: &Path) -> String {
        let root = self.config_manager.get_project_root();
        target
            .strip_prefix(root)
            .unwrap_or(target)
            .to_string_lossy()
            .into_owned()
    }

    fn check_working_tree(&self, target: &Path) -> Result<()> {
        let start = target.parent().unwrap_or(target);
        let Some(tree) = Git2WorkingTree::discover(start) else {
            return Ok(());
        };

        match tree.has_uncommitted_changes(target) {
            Ok(true) if self.settings.require_clean => anyhow::bail!(
                "{} has uncommitted changes; commit them or set require_clean = false",
                target.display()
            ),
            Ok(true) => {
                tracing::warn!("{} has uncommitted changes", target.display());
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(e) => {
                tracing::debug!("Skipping git status check: {e:#}");
                Ok(())
            }
        }
    }
}

fn compile_all(passes: &[RewritePass]) -> Result<Vec<CompiledPass>> {
    passes
        .iter()
        .map(|pass| {
            pass.compile()
                .with_context(|| format!("Failed to compile pass {}", pass.name))
        })
        .collect()
}
