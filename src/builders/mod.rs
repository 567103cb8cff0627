// This file is the module declaration file for the `builders` module.
// It declares the rule machinery and the helpers built around it.

// `rules` module:
// The `RewriteRule` data type, its compiled form, and the `TextRewriter`
// trait that applies one rule to a text buffer.
pub mod rules;

// `passes` module:
// `RewritePass` groups rules into an ordered table that is applied in one go
// and reports how many replacements each rule made.
pub mod passes;

// `catalog` module:
// The built-in passes for the exam result page and the API client, plus the
// default target and the default pass sequence.
pub mod catalog;

// `importer` module:
// Reads passes from the custom line format or from TOML/JSON/YAML bundles.
pub mod importer;

// `reporter` module:
// The `RunReporter` trait and its `ConsoleReporter` implementation, which
// prints confirmations, per-rule hit counts and unmatched rules.
pub mod reporter;

// `storage` module:
// Backups of the target taken before each write (`StorageProvider` with file
// and in-memory implementations) and the atomic write helper.
pub mod storage;

// `validator` module:
// Static checks for rule tables and the config, and the idempotence check
// run against real file content.
pub mod validator;
