//! Header stripping for reposted text.
//!
//! Channels often open every post with a fixed banner line ("📢 Breaking news",
//! "Forwarded message", ...). Those banners are noise once the text is reposted
//! somewhere else, so each configured prefix is removed when it sits alone at
//! the very top of the text.

use regex::Regex;

use crate::{errors::Error, Result};

/// Header stripped when no prefixes are configured.
pub const DEFAULT_PREFIX: &str = "Forwarded message";

#[derive(Clone, Debug)]
pub struct Sanitizer {
    rules: Vec<Regex>,
}

impl Sanitizer {
    /// Compile one rule per non-blank prefix, preserving order.
    pub fn new<S: AsRef<str>>(prefixes: &[S]) -> Result<Self> {
        let mut rules = Vec::new();
        for prefix in prefixes {
            let prefix = prefix.as_ref().trim();
            if prefix.is_empty() {
                continue;
            }
            rules.push(compile_rule(prefix)?);
        }
        if rules.is_empty() {
            rules.push(compile_rule(DEFAULT_PREFIX)?);
        }
        Ok(Self { rules })
    }

    /// Remove leading header lines and trim the remainder.
    ///
    /// Rules run in configured order, each on the previous result, and the pass
    /// repeats until no rule matches, so `clean(clean(t)) == clean(t)`.
    pub fn clean(&self, text: &str) -> String {
        let mut out = text;
        loop {
            let mut changed = false;
            for rule in &self.rules {
                if let Some(m) = rule.find(out) {
                    out = &out[m.end()..];
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        out.trim().to_string()
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self {
            rules: vec![rule_for(DEFAULT_PREFIX)],
        }
    }
}

fn compile_rule(prefix: &str) -> Result<Regex> {
    Regex::new(&rule_pattern(prefix))
        .map_err(|e| Error::Config(format!("invalid strip prefix {prefix:?}: {e}")))
}

fn rule_for(prefix: &str) -> Regex {
    Regex::new(&rule_pattern(prefix)).expect("escaped prefix is a valid regex")
}

// Leading emoji/symbols (variation selectors and ZWJ are word chars for the
// regex crate, hence the explicit alternatives), then the literal header, then
// at least one line break.
fn rule_pattern(prefix: &str) -> String {
    format!(
        r"(?i)^\s*(?:[^\w\s]|\x{{FE0F}}|\x{{FE0E}}|\x{{200D}})*\s*{}[ \t]*(?:\r?\n)+",
        regex::escape(prefix)
    )
}
