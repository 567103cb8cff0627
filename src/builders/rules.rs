use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// How far back (in bytes) a `skip_after` guard looks before a candidate match.
pub const LOOKBEHIND_WINDOW: usize = 64;

/// An enum that defines how a rule's `pattern` is interpreted.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    /// The pattern is matched byte-for-byte and the replacement is inserted
    /// verbatim, `$` included.
    Literal,
    /// The pattern is a regular expression. The replacement may reference
    /// capture groups with `${1}` or `${name}`; `$$` is a literal dollar.
    Regex,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Literal => write!(f, "literal"),
            RuleKind::Regex => write!(f, "regex"),
        }
    }
}

/// Errors raised while turning a [`RewriteRule`] into something that can run.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid rule kind '{0}' (expected 'literal' or 'regex')")]
    UnknownKind(String),
    #[error("rule {id}: empty pattern")]
    EmptyPattern { id: String },
    #[error("rule {id}: invalid pattern: {source}")]
    InvalidPattern {
        id: String,
        #[source]
        source: regex::Error,
    },
    #[error("rule {id}: invalid skip_after guard: {source}")]
    InvalidGuard {
        id: String,
        #[source]
        source: regex::Error,
    },
}

/// A single substitution in a rewrite pass.
///
/// Rules are plain data so they can live in the config file and in imported
/// bundles. Call [`RewriteRule::compile`] to get a [`CompiledRule`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RewriteRule {
    /// Identifier used in reports and validation messages.
    #[serde(default = "new_rule_id")]
    pub id: String,
    pub kind: RuleKind,
    pub pattern: String,
    pub replacement: String,
    /// A match is skipped when the text right before it ends with a match of
    /// this regex. Stands in for negative lookbehind, e.g. `[{A-Za-z0-9_]`
    /// keeps an already-braced `{t(...)}` from being wrapped again.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_after: Option<String>,
    /// Maximum number of replacements. `None` replaces every match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

fn new_rule_id() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("rule-{}", &uuid[..8])
}

impl RewriteRule {
    /// Creates a rule from a kind name ("literal" or "regex").
    pub fn new(kind: &str, pattern: impl Into<String>, replacement: impl Into<String>) -> Result<Self, RuleError> {
        let kind = match kind {
            "literal" => RuleKind::Literal,
            "regex" => RuleKind::Regex,
            other => return Err(RuleError::UnknownKind(other.to_string())),
        };
        Ok(Self {
            id: new_rule_id(),
            kind,
            pattern: pattern.into(),
            replacement: replacement.into(),
            skip_after: None,
            limit: None,
            note: None,
        })
    }

    pub fn literal(id: &str, pattern: &str, replacement: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: RuleKind::Literal,
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
            skip_after: None,
            limit: None,
            note: None,
        }
    }

    pub fn regex(id: &str, pattern: &str, replacement: &str) -> Self {
        Self {
            kind: RuleKind::Regex,
            ..Self::literal(id, pattern, replacement)
        }
    }

    pub fn skip_after(mut self, guard: &str) -> Self {
        self.skip_after = Some(guard.to_string());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn note(mut self, note: &str) -> Self {
        self.note = Some(note.to_string());
        self
    }

    /// Compiles the pattern (and guard, if any).
    ///
    /// Literal patterns are escaped and go through the same regex machinery,
    /// which keeps guards and limits working the same way for both kinds.
    pub fn compile(&self) -> Result<CompiledRule, RuleError> {
        if self.pattern.is_empty() {
            return Err(RuleError::EmptyPattern { id: self.id.clone() });
        }

        let source = match self.kind {
            RuleKind::Literal => regex::escape(&self.pattern),
            RuleKind::Regex => self.pattern.clone(),
        };
        let matcher = Regex::new(&source).map_err(|source| RuleError::InvalidPattern {
            id: self.id.clone(),
            source,
        })?;

        let guard = match &self.skip_after {
            Some(guard) => Some(Regex::new(&format!("(?:{guard})$")).map_err(|source| {
                RuleError::InvalidGuard {
                    id: self.id.clone(),
                    source,
                }
            })?),
            None => None,
        };

        Ok(CompiledRule {
            id: self.id.clone(),
            kind: self.kind,
            matcher,
            replacement: self.replacement.clone(),
            guard,
            limit: self.limit,
        })
    }
}

/// The result of running one rule over a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub text: String,
    pub replacements: usize,
}

/// The `TextRewriter` trait is the seam between a rule and the pass that
/// runs it. Anything that can turn a buffer into a new buffer and say how
/// many spans it touched can take part in a pass.
pub trait TextRewriter {
    fn rewrite(&self, text: &str) -> Rewrite;

    /// `true` when running the rewriter on its own output changes nothing.
    fn is_idempotent_on(&self, text: &str) -> bool {
        let once = self.rewrite(text);
        let twice = self.rewrite(&once.text);
        once.text == twice.text
    }
}

/// A rule ready to run: pattern and guard compiled once.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub id: String,
    pub kind: RuleKind,
    matcher: Regex,
    replacement: String,
    guard: Option<Regex>,
    limit: Option<usize>,
}

impl CompiledRule {
    pub fn matcher(&self) -> &Regex {
        &self.matcher
    }

    /// Checks the text immediately before `start` against the guard.
    fn is_guarded(&self, text: &str, start: usize) -> bool {
        let Some(guard) = &self.guard else {
            return false;
        };
        let mut window_start = start.saturating_sub(LOOKBEHIND_WINDOW);
        while !text.is_char_boundary(window_start) {
            window_start -= 1;
        }
        guard.is_match(&text[window_start..start])
    }

    fn push_replacement(&self, caps: &Captures<'_>, out: &mut String) {
        match self.kind {
            RuleKind::Literal => out.push_str(&self.replacement),
            RuleKind::Regex => caps.expand(&self.replacement, out),
        }
    }
}

impl TextRewriter for CompiledRule {
    /// Replaces every non-overlapping match, left to right.
    ///
    /// A match vetoed by the guard is left as is and scanning resumes after
    /// it. Guards always look at the input text, never at replacements made
    /// earlier in the same call.
    fn rewrite(&self, text: &str) -> Rewrite {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        let mut replacements = 0;

        for caps in self.matcher.captures_iter(text) {
            if self.limit.is_some_and(|limit| replacements >= limit) {
                break;
            }
            let Some(whole) = caps.get(0) else {
                continue;
            };
            if self.is_guarded(text, whole.start()) {
                continue;
            }
            out.push_str(&text[last..whole.start()]);
            self.push_replacement(&caps, &mut out);
            last = whole.end();
            replacements += 1;
        }

        if replacements == 0 {
            return Rewrite {
                text: text.to_string(),
                replacements,
            };
        }
        out.push_str(&text[last..]);
        Rewrite {
            text: out,
            replacements,
        }
    }
}
