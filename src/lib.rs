//! Ordered, idempotent rewrite passes that move hardcoded UI strings of a
//! front-end page behind `t('key')` translation calls.
//!
//! A pass is a flat table of literal or regex substitutions applied in
//! order to the whole file. See [`builders::catalog`] for the built-in
//! passes and [`crate::core::engine::RewriteEngine`] for running them.

pub mod builders;
pub mod core;
pub mod utils;

#[cfg(test)]
mod tests;
