//! Media URL rewrite rule.
//!
//! An entry qualifies when its body links to the decommissioned bucket and
//! does not already reference the bare target domain (those entries were
//! hand-edited and need a human look). Qualifying bodies have every legacy
//! prefix replaced with the canonical one.
//!
//! Matching and substitution work on raw bytes. Entry bodies are not
//! guaranteed to be UTF-8, and bytes outside the replaced prefixes are
//! written back exactly as they were read.

use memchr::memmem;

pub const LEGACY_BUCKET_PREFIX: &str = "https://s3.eu-central-1.amazonaws.com/";
pub const BARE_DOMAIN_PREFIX: &str = "https://artyukh.hu/";
pub const CANONICAL_PREFIX: &str = "https://www.artyukh.hu/lj/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRule {
    trigger_prefix: String,
    conflict_marker: Option<String>,
    legacy_prefixes: Vec<String>,
    target_prefix: String,
}

impl RewriteRule {
    /// Rule that rewrites `trigger_prefix` to `target_prefix` and nothing else.
    pub fn new(trigger_prefix: impl Into<String>, target_prefix: impl Into<String>) -> Self {
        let trigger_prefix = trigger_prefix.into();
        Self {
            legacy_prefixes: vec![trigger_prefix.clone()],
            trigger_prefix,
            conflict_marker: None,
            target_prefix: target_prefix.into(),
        }
    }

    /// Bodies containing `marker` are left alone.
    pub fn with_conflict_marker(mut self, marker: impl Into<String>) -> Self {
        self.conflict_marker = Some(marker.into());
        self
    }

    /// Also replaces `prefix` once the rule has matched.
    pub fn with_legacy_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        if !self.legacy_prefixes.contains(&prefix) {
            self.legacy_prefixes.push(prefix);
        }
        self
    }

    pub fn matches(&self, body: &str) -> bool {
        self.matches_bytes(body.as_bytes())
    }

    pub fn matches_bytes(&self, body: &[u8]) -> bool {
        if !contains(body, self.trigger_prefix.as_bytes()) {
            return false;
        }
        match &self.conflict_marker {
            Some(marker) => !contains(body, marker.as_bytes()),
            None => true,
        }
    }

    /// Rewritten body, or `None` when the rule does not apply.
    pub fn rewrite(&self, body: &str) -> Option<String> {
        self.rewrite_bytes(body.as_bytes())
            .and_then(|bytes| String::from_utf8(bytes).ok())
    }

    /// Byte-level [`rewrite`](Self::rewrite); bytes outside the legacy
    /// prefixes are copied unchanged.
    pub fn rewrite_bytes(&self, body: &[u8]) -> Option<Vec<u8>> {
        if !self.matches_bytes(body) {
            return None;
        }

        let target = self.target_prefix.as_bytes();
        let rewritten = self
            .legacy_prefixes
            .iter()
            .fold(body.to_vec(), |bytes, prefix| {
                replace_all(&bytes, prefix.as_bytes(), target)
            });
        Some(rewritten)
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    memmem::find(haystack, needle).is_some()
}

fn replace_all(haystack: &[u8], from: &[u8], to: &[u8]) -> Vec<u8> {
    if from.is_empty() {
        return haystack.to_vec();
    }

    let mut out = Vec::with_capacity(haystack.len());
    let mut copied = 0;
    for start in memmem::find_iter(haystack, from) {
        out.extend_from_slice(&haystack[copied..start]);
        out.extend_from_slice(to);
        copied = start + from.len();
    }
    out.extend_from_slice(&haystack[copied..]);
    out
}

impl Default for RewriteRule {
    fn default() -> Self {
        RewriteRule::new(LEGACY_BUCKET_PREFIX, CANONICAL_PREFIX)
            .with_conflict_marker(BARE_DOMAIN_PREFIX)
            .with_legacy_prefix(BARE_DOMAIN_PREFIX)
    }
}
