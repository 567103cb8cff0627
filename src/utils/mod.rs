use anyhow::Result;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::builders::reporter::{ConsoleReporter, RunReporter, RunSummary};
use crate::core::config::{ConfigManager, ConfigProvider};
use crate::core::engine::RewriteEngine;

/// Sends diagnostics to stderr. `RUST_LOG` wins over `--verbose`.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "i18n_rewrite=debug" } else { "i18n_rewrite=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub fn initialize_project() -> Result<()> {
    let config_manager = get_config_manager()?;
    if config_manager.initialize()? {
        println!(
            "✓ Wrote {}",
            config_manager.get_config_path().display()
        );
    } else {
        println!(
            "ℹ️  {} already exists",
            config_manager.get_config_path().display()
        );
    }
    println!("Run 'i18n-rewrite list' to see the available passes");
    Ok(())
}

pub fn list_passes(show_rules: bool) -> Result<()> {
    get_config_manager()?.list_passes(show_rules)
}

pub fn validate() -> Result<()> {
    get_config_manager()?.validate_config()
}

/// Runs the named passes in the given order.
pub fn run_passes(names: &[String], file: Option<&Path>, dry_run: bool, verbose: bool) -> Result<()> {
    let mut engine = RewriteEngine::new(get_config_manager()?)?;
    let passes = engine.config_manager().load_config()?.resolve_passes(names)?;
    let target = engine.config_manager().resolve_target(file, &passes)?;
    let verbose = verbose || engine.settings().verbose;

    let outcome = engine.run(&passes, &target, dry_run)?;

    let reporter = ConsoleReporter::new();
    if dry_run || verbose {
        reporter.report_summary(&RunSummary {
            target: &outcome.target,
            passes: &outcome.passes,
            changed: outcome.changed,
            dry_run,
        });
    }
    if !dry_run {
        for pass in &outcome.passes {
            reporter.report_pass(pass, verbose);
        }
    }
    Ok(())
}

/// Runs the configured sequence.
pub fn run_sequence(file: Option<&Path>, dry_run: bool, verbose: bool) -> Result<()> {
    let config = get_config_manager()?.load_config()?;
    if config.sequence.is_empty() {
        anyhow::bail!("The configured sequence is empty");
    }
    run_passes(&config.sequence, file, dry_run, verbose)
}

/// Dry run plus idempotence check. Fails when any rule is not idempotent.
pub fn check(names: &[String], file: Option<&Path>) -> Result<()> {
    let config_manager = get_config_manager()?;
    let config = config_manager.load_config()?;
    let names = if names.is_empty() { config.sequence.clone() } else { names.to_vec() };
    let passes = config.resolve_passes(names.as_slice())?;
    let target = config_manager.resolve_target(file, &passes)?;

    let mut engine = RewriteEngine::new(config_manager)?;
    let outcome = engine.run(&passes, &target, true)?;
    let reporter = ConsoleReporter::new();
    reporter.report_summary(&RunSummary {
        target: &outcome.target,
        passes: &outcome.passes,
        changed: outcome.changed,
        dry_run: true,
    });

    println!();
    let mut clean = true;
    for (pass, offenders) in engine.check_idempotence(&passes, &target)? {
        clean &= offenders.is_empty();
        reporter.report_non_idempotent(&pass, &offenders);
    }
    if !clean {
        anyhow::bail!("Some rules are not idempotent on {}", target.display());
    }
    Ok(())
}

pub fn import_passes(file: &Path, format: &str) -> Result<()> {
    let mut config_manager = get_config_manager()?;
    let names = config_manager.import_passes(file, format)?;
    println!("✓ Imported {} pass(es): {}", names.len(), names.join(", "));
    Ok(())
}

pub fn export_pass(name: &str, out: &Path, format: &str) -> Result<()> {
    get_config_manager()?.export_pass(name, out, format)?;
    println!("✓ Exported {name} to {}", out.display());
    Ok(())
}

/// `pass` picks the target of that pass, e.g. `api-cleanup` for the API client.
pub fn restore(file: Option<&Path>, pass: Option<&str>, list: bool) -> Result<()> {
    let config_manager = get_config_manager()?;
    let target = config_manager.resolve_pass_target(file, pass)?;
    let mut engine = RewriteEngine::new(config_manager)?;

    if list {
        let backups = engine.backups(&target)?;
        if backups.is_empty() {
            println!("No backups for {}", target.display());
        }
        for backup in backups.iter().rev() {
            println!(
                "💾 {} | {} | {}",
                backup.created_at.format("%Y-%m-%d %H:%M:%S"),
                backup.id,
                backup.passes.join(", ")
            );
        }
        return Ok(());
    }

    match engine.restore(&target)? {
        Some(backup) => println!(
            "✓ Restored {} to its state before: {}",
            target.display(),
            backup.passes.join(", ")
        ),
        None => println!("{}", format!("No backup found for {}", target.display()).yellow()),
    }
    Ok(())
}

pub fn prune_backups() -> Result<()> {
    let mut engine = RewriteEngine::new(get_config_manager()?)?;
    engine.prune_backups()?;
    println!("✓ Removed all backups");
    Ok(())
}

// Helper function to create ConfigManager instance
fn get_config_manager() -> Result<ConfigManager> {
    match std::env::var_os("I18N_REWRITE_ROOT") {
        Some(root) => ConfigManager::new_at(PathBuf::from(root)),
        None => ConfigManager::new(),
    }
}
