//! Keyword-overlap intent classifier.
//!
//! Scores every topic by the number of keyword occurrences found in the
//! normalised query, looking at single tokens and short phrases.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use admit_core::config::ClassifierConfig;
use admit_core::Topic;
use admit_knowledge::{KeywordIndex, KnowledgeBase};

use crate::types::{preview, ClassificationResult, TopicScore};

// =============================================================================
// IntentClassifier
// =============================================================================

/// Maps raw query text to a ranked list of topics.
pub struct IntentClassifier {
    kb: Arc<KnowledgeBase>,
    index: KeywordIndex,
    max_phrase_words: usize,
}

impl IntentClassifier {
    pub fn new(kb: Arc<KnowledgeBase>, config: &ClassifierConfig) -> Self {
        let index = KeywordIndex::build(&kb, &config.keyword_weights);
        Self {
            kb,
            index,
            max_phrase_words: config.max_phrase_words.max(1),
        }
    }

    pub fn index(&self) -> &KeywordIndex {
        &self.index
    }

    /// Classify a query.
    ///
    /// Topics are ordered by match count, then summed keyword weight, then
    /// registration order. Without configured weights every keyword weighs
    /// the same, so equal counts fall straight to registration order.
    /// Topics with no matches are omitted, so an empty result means the
    /// query was not recognised.
    pub fn classify(&self, query: &str) -> ClassificationResult {
        let tokens = self.kb.normalizer().tokens(query);
        let normalized = tokens.join(" ");
        let max_words = self.max_phrase_words.min(self.index.longest_phrase());

        let mut totals: BTreeMap<Topic, (u32, f32)> = BTreeMap::new();
        for start in 0..tokens.len() {
            for len in 1..=max_words {
                let end = start + len;
                if end > tokens.len() {
                    break;
                }
                let phrase = tokens[start..end].join(" ");
                if let Some(entry) = self.index.get(&phrase) {
                    for topic in &entry.topics {
                        let slot = totals.entry(*topic).or_insert((0, 0.0));
                        slot.0 += 1;
                        slot.1 += entry.weight;
                    }
                }
            }
        }

        let mut scores: Vec<TopicScore> = totals
            .into_iter()
            .map(|(topic, (count, weight))| TopicScore {
                topic,
                count,
                weight,
            })
            .collect();
        scores.sort_by(rank);

        debug!(
            query = %preview(query, 100),
            topics = ?scores.iter().map(|s| s.topic).collect::<Vec<_>>(),
            "Query classified"
        );

        ClassificationResult { normalized, scores }
    }
}

fn rank(a: &TopicScore, b: &TopicScore) -> Ordering {
    b.count
        .cmp(&a.count)
        .then_with(|| b.weight.total_cmp(&a.weight))
        .then_with(|| a.topic.cmp(&b.topic))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kb_with_keywords(keywords: serde_json::Value) -> Arc<KnowledgeBase> {
        let doc = json!({
            "university": {"name": "Test Institute", "location": "Springfield"},
            "keywords": keywords,
            "aliases": {"cse": "computer science"}
        });
        Arc::new(KnowledgeBase::from_json(&doc.to_string()).unwrap())
    }

    fn test_keywords() -> serde_json::Value {
        json!({
            "university": ["university", "about"],
            "courses": ["course", "branch", "computer science", "seats"],
            "eligibility": ["eligibility", "marks", "10+2"],
            "fees": ["fee", "fees", "fee structure", "hostel fee", "hostel"],
            "dates": ["date", "deadline", "last date"],
            "process": ["process", "apply"],
            "contact": ["contact", "phone"],
            "facilities": ["hostel", "library"],
            "placement": ["placement", "package"]
        })
    }

    fn classifier() -> IntentClassifier {
        IntentClassifier::new(kb_with_keywords(test_keywords()), &ClassifierConfig::default())
    }

    fn topics(result: &ClassificationResult) -> Vec<Topic> {
        result.scores.iter().map(|s| s.topic).collect()
    }

    // ---- Basic scoring ----

    #[test]
    fn test_fee_structure_classifies_as_fees() {
        let result = classifier().classify("What is the fee structure?");
        assert_eq!(result.top_topic(), Some(Topic::Fees));
        // "fee" and "fee structure" both match
        assert_eq!(result.top().unwrap().count, 2);
        assert_eq!(result.normalized, "what is the fee structure");
    }

    #[test]
    fn test_gibberish_is_empty() {
        let result = classifier().classify("asdkjasd");
        assert!(result.is_empty());
    }

    #[test]
    fn test_empty_and_punctuation_only_input() {
        assert!(classifier().classify("").is_empty());
        assert!(classifier().classify("?!?").is_empty());
    }

    #[test]
    fn test_exclusive_keyword_wins() {
        let c = classifier();
        for (keyword, topic) in c.index().exclusive_keywords() {
            let result = c.classify(&format!("tell me the {}", keyword));
            assert_eq!(result.top_topic(), Some(topic), "keyword '{}'", keyword);
        }
    }

    #[test]
    fn test_sorted_descending_by_count() {
        let result = classifier().classify("placement package and the fee deadline");
        assert_eq!(topics(&result), vec![Topic::Placement, Topic::Fees, Topic::Dates]);
        assert_eq!(result.scores[0].count, 2);
    }

    #[test]
    fn test_repeated_keyword_counts_each_occurrence() {
        let result = classifier().classify("fee fee fee");
        assert_eq!(result.top().unwrap().count, 3);
    }

    #[test]
    fn test_normalisation_handles_symbols_and_case() {
        let result = classifier().classify("Is 10+2 ENOUGH?");
        assert_eq!(result.top_topic(), Some(Topic::Eligibility));
    }

    #[test]
    fn test_alias_expansion_reaches_multi_word_keyword() {
        let result = classifier().classify("seats in CSE");
        assert_eq!(result.top_topic(), Some(Topic::Courses));
        assert_eq!(result.top().unwrap().count, 2);
    }

    // ---- Tie-breaking ----

    #[test]
    fn test_shared_keyword_ties_break_on_registration_order() {
        // "library" is facilities only; "hostel" is shared by fees and facilities
        let result = classifier().classify("hostel");
        assert_eq!(topics(&result), vec![Topic::Fees, Topic::Facilities]);
    }

    #[test]
    fn test_ties_break_on_weight_first() {
        let mut config = ClassifierConfig::default();
        config.keyword_weights.insert("phone".to_string(), 4.0);
        let c = IntentClassifier::new(kb_with_keywords(test_keywords()), &config);
        // One match each: contact's "phone" outweighs fees' "fee"
        let result = c.classify("fee phone");
        assert_eq!(topics(&result), vec![Topic::Contact, Topic::Fees]);
    }

    #[test]
    fn test_unweighted_count_tie_breaks_on_topic_order() {
        // dates: "last date" + "date"; courses: "course" + "branch"
        let result = classifier().classify("last date course branch");
        assert_eq!(result.scores[0].count, 2);
        assert_eq!(result.scores[1].count, 2);
        assert_eq!(topics(&result), vec![Topic::Courses, Topic::Dates]);
    }

    #[test]
    fn test_bundled_unweighted_tie_serves_earlier_topic() {
        let kb = Arc::new(
            KnowledgeBase::from_json(include_str!("../../../data/knowledge_base.json")).unwrap(),
        );
        let c = IntentClassifier::new(kb, &ClassifierConfig::default());
        let result = c.classify("course branch last date");
        assert_eq!(result.scores[0].count, result.scores[1].count);
        assert_eq!(result.top_topic(), Some(Topic::Courses));
    }

    // ---- Phrase length ----

    #[test]
    fn test_max_phrase_words_limits_lookup() {
        let config = ClassifierConfig {
            max_phrase_words: 1,
            ..ClassifierConfig::default()
        };
        let c = IntentClassifier::new(kb_with_keywords(test_keywords()), &config);
        let result = c.classify("fee structure");
        assert_eq!(result.top().unwrap().count, 1);
    }

    #[test]
    fn test_classification_is_pure() {
        let c = classifier();
        let a = c.classify("hostel fee deadline");
        let b = c.classify("hostel fee deadline");
        assert_eq!(a, b);
    }
}
