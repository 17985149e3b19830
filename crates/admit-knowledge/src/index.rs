//! Keyword index: normalised keyword -> topics it signals.

use std::collections::{BTreeMap, BTreeSet};

use admit_core::Topic;
use tracing::debug;

use crate::normalize::Normalizer;
use crate::store::KnowledgeBase;

/// Weight of a keyword with no configured weight. Equal for every keyword,
/// so unweighted ties fall through to topic order.
pub const DEFAULT_WEIGHT: f32 = 1.0;

/// One indexed keyword.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordEntry {
    /// Topics declaring this keyword, in registration order.
    pub topics: BTreeSet<Topic>,
    /// Specificity weight used to break score ties.
    pub weight: f32,
    /// Number of tokens in the normalised keyword.
    pub words: usize,
}

/// Immutable lookup table built once from the knowledge base keyword lists.
#[derive(Debug, Clone, Default)]
pub struct KeywordIndex {
    entries: BTreeMap<String, KeywordEntry>,
    longest_phrase: usize,
}

impl KeywordIndex {
    /// Build the index from the knowledge base keyword table.
    ///
    /// Keywords are normalised with the knowledge base's alias table so they
    /// line up with normalised queries. `weights` overrides
    /// [`DEFAULT_WEIGHT`]; its keys are normalised the same way.
    pub fn build(kb: &KnowledgeBase, weights: &BTreeMap<String, f32>) -> Self {
        Self::from_keywords(kb.keywords(), kb.normalizer(), weights)
    }

    /// Build from a raw keyword table.
    pub fn from_keywords(
        keywords: &BTreeMap<Topic, Vec<String>>,
        normalizer: &Normalizer,
        weights: &BTreeMap<String, f32>,
    ) -> Self {
        let weights: BTreeMap<String, f32> = weights
            .iter()
            .map(|(k, w)| (normalizer.normalize(k), *w))
            .collect();

        let mut entries: BTreeMap<String, KeywordEntry> = BTreeMap::new();
        for (topic, terms) in keywords {
            for term in terms {
                let key = normalizer.normalize(term);
                if key.is_empty() {
                    continue;
                }
                let words = key.split(' ').count();
                let weight = weights.get(&key).copied().unwrap_or(DEFAULT_WEIGHT);
                entries
                    .entry(key)
                    .or_insert_with(|| KeywordEntry {
                        topics: BTreeSet::new(),
                        weight,
                        words,
                    })
                    .topics
                    .insert(*topic);
            }
        }

        let longest_phrase = entries.values().map(|e| e.words).max().unwrap_or(0);
        debug!(
            keywords = entries.len(),
            longest_phrase, "Keyword index built"
        );
        Self {
            entries,
            longest_phrase,
        }
    }

    /// Look up an already-normalised phrase.
    pub fn get(&self, phrase: &str) -> Option<&KeywordEntry> {
        self.entries.get(phrase)
    }

    /// Token count of the longest indexed keyword.
    pub fn longest_phrase(&self) -> usize {
        self.longest_phrase
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keywords declared by exactly one topic.
    pub fn exclusive_keywords(&self) -> impl Iterator<Item = (&str, Topic)> {
        self.entries.iter().filter_map(|(k, e)| {
            if e.topics.len() == 1 {
                e.topics.iter().next().map(|t| (k.as_str(), *t))
            } else {
                None
            }
        })
    }
}
