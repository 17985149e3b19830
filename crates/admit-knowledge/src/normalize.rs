//! Text normalisation shared by queries, keywords and FAQ triggers.
//!
//! Everything that is compared against user input goes through the same
//! [`Normalizer`], so `"10+2"` in a keyword and `"10 + 2"` in a query end up
//! as the same token sequence.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

static NON_ALNUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("Invalid normalisation regex"));

/// Lowercase `text`, replace every non-alphanumeric run with a space and
/// collapse whitespace. No alias expansion.
pub fn fold(text: &str) -> String {
    let lowered = text.to_lowercase();
    let spaced = NON_ALNUM_RE.replace_all(&lowered, " ");
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Folds text and expands single-token aliases.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    aliases: BTreeMap<String, String>,
}

impl Normalizer {
    /// Build a normalizer from an alias table.
    ///
    /// Keys and expansions are folded first; keys that fold to nothing are
    /// dropped.
    pub fn new(aliases: &BTreeMap<String, String>) -> Self {
        let aliases = aliases
            .iter()
            .map(|(k, v)| (fold(k), fold(v)))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        Self { aliases }
    }

    /// Normalise into a single space-separated string.
    pub fn normalize(&self, text: &str) -> String {
        self.tokens(text).join(" ")
    }

    /// Normalise into tokens, expanding each aliased token in place.
    pub fn tokens(&self, text: &str) -> Vec<String> {
        let folded = fold(text);
        let mut out = Vec::new();
        for token in folded.split(' ').filter(|t| !t.is_empty()) {
            match self.aliases.get(token) {
                Some(expansion) => out.extend(expansion.split(' ').map(str::to_string)),
                None => out.push(token.to_string()),
            }
        }
        out
    }

    /// Number of configured aliases.
    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }
}

/// Whether `needle` occurs in `haystack` on token boundaries.
///
/// Both arguments must already be normalised.
pub fn contains_phrase(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    format!(" {} ", haystack).contains(&format!(" {} ", needle))
}
