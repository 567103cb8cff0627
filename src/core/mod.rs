// This file is the module declaration file for the `core` module.
// It holds the pieces that tie the rule tables to an actual project on disk.

// `config` module:
// Defines the `.i18n-rewrite.toml` data structures (`RewriteConfig`,
// `GlobalSettings`), the `ConfigProvider` trait, and the `ConfigManager`
// that loads, saves, validates, imports and exports passes.
pub mod config;

// `engine` module:
// The `RewriteEngine` reads the target file, runs the passes, backs up the
// original and writes the result atomically. It also restores backups.
pub mod engine;

// `git` module:
// Finds the project root through the enclosing git work tree and tells the
// engine whether a target has uncommitted changes.
pub mod git;
