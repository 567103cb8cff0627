/// Moves the hardcoded Arabic strings of the exam result page behind
/// `t('key')` lookups by running ordered passes of text substitutions
/// over the file, then repairs the JSX the earlier passes broke.
/// Each pass can be run alone, the whole sequence can be run in one go,
/// and every write is backed up so it can be undone.
use anyhow::Result;
use clap::{Parser, Subcommand};
use i18n_rewrite::utils;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "i18n-rewrite")]
#[command(about = "Rewrite hardcoded UI strings into i18n calls, pass by pass")]
struct Cli {
    /// Print per-rule hit counts and debug logs
    #[arg(
        short,
        long,
        global = true,
        env = "I18N_REWRITE_VERBOSE",
        action = clap::ArgAction::SetTrue,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default .i18n-rewrite.toml at the project root
    Init,
    /// List the available passes
    List {
        /// Also print every rule
        #[arg(long)]
        rules: bool,
    },
    /// Run one or more passes in the given order
    Run {
        /// Pass names, e.g. translations certificate
        #[arg(required = true)]
        passes: Vec<String>,
        /// File to rewrite instead of the configured target
        #[arg(short, long, env = "I18N_REWRITE_TARGET")]
        file: Option<PathBuf>,
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Run the configured sequence of passes
    Sequence {
        #[arg(short, long, env = "I18N_REWRITE_TARGET")]
        file: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Dry run that also fails on rules that are not idempotent
    Check {
        /// Pass names; defaults to the configured sequence
        passes: Vec<String>,
        #[arg(short, long, env = "I18N_REWRITE_TARGET")]
        file: Option<PathBuf>,
    },
    /// Validate the configuration and every rule table
    Validate,
    /// Import passes from a file
    Import {
        file: PathBuf,
        /// Format: custom, toml, json or yaml
        #[arg(long, default_value = "custom")]
        format: String,
    },
    /// Export a pass to a file
    Export {
        pass: String,
        output: PathBuf,
        /// Format: toml, json or yaml
        #[arg(long, default_value = "toml")]
        format: String,
    },
    /// Put the newest backup of the target back in place
    ///
    /// Without --file or --pass this is the configured page target; backups
    /// taken by api-cleanup need `--pass api-cleanup`.
    Restore {
        #[arg(short, long, env = "I18N_REWRITE_TARGET")]
        file: Option<PathBuf>,
        /// Use the target of this pass
        #[arg(short, long)]
        pass: Option<String>,
        /// List the backups instead of restoring one
        #[arg(long)]
        list: bool,
        /// Delete every stored backup
        #[arg(long, conflicts_with = "list")]
        prune: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    utils::init_logging(cli.verbose);

    match cli.command {
        Commands::Init => utils::initialize_project(),
        Commands::List { rules } => utils::list_passes(rules),
        Commands::Run {
            passes,
            file,
            dry_run,
        } => utils::run_passes(&passes, file.as_deref(), dry_run, cli.verbose),
        Commands::Sequence { file, dry_run } => {
            utils::run_sequence(file.as_deref(), dry_run, cli.verbose)
        }
        Commands::Check { passes, file } => utils::check(&passes, file.as_deref()),
        Commands::Validate => utils::validate(),
        Commands::Import { file, format } => utils::import_passes(&file, &format),
        Commands::Export {
            pass,
            output,
            format,
        } => utils::export_pass(&pass, &output, &format),
        Commands::Restore {
            file,
            pass,
            list,
            prune,
        } => {
            if prune {
                utils::prune_backups()
            } else {
                utils::restore(file.as_deref(), pass.as_deref(), list)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_env_values_and_restore_pass() {
        // SAFETY: this is the only test in the binary that parses arguments,
        // so nothing reads the environment concurrently.
        unsafe { std::env::set_var("I18N_REWRITE_VERBOSE", "1") };
        let cli = Cli::try_parse_from(["i18n-rewrite", "restore", "--pass", "api-cleanup", "--list"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Restore { pass, list, .. } => {
                assert_eq!(pass.as_deref(), Some("api-cleanup"));
                assert!(list);
            }
            _ => panic!("expected restore"),
        }

        unsafe { std::env::set_var("I18N_REWRITE_VERBOSE", "off") };
        let cli = Cli::try_parse_from(["i18n-rewrite", "list"]).unwrap();
        assert!(!cli.verbose);
        unsafe { std::env::remove_var("I18N_REWRITE_VERBOSE") };
    }
}
