//! Knowledge base document, loader and load-time validation.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use admit_core::Topic;

use crate::error::KnowledgeError;
use crate::normalize::{fold, Normalizer};
use crate::records::{
    Contact, Courses, Eligibility, FacilityGroup, Fees, ImportantDates, PlacementRecord, Process,
    TopicRecord, UniversityInfo,
};

// =============================================================================
// Document schema
// =============================================================================

/// How an FAQ entry's question and triggers are compared to a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Normalised query equals a pattern.
    #[default]
    Exact,
    /// Normalised query contains a pattern on token boundaries.
    Contains,
}

/// A pre-authored answer to a frequently asked question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
    pub topic: Topic,
    /// Extra phrasings that trigger this entry besides the question itself.
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub match_mode: MatchMode,
}

/// On-disk JSON layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct KnowledgeDocument {
    university: UniversityInfo,
    #[serde(default)]
    courses: Option<Courses>,
    #[serde(default)]
    eligibility: Option<Eligibility>,
    #[serde(default)]
    fees: Option<Fees>,
    #[serde(default)]
    dates: Option<ImportantDates>,
    #[serde(default)]
    process: Option<Process>,
    #[serde(default)]
    contact: Option<Contact>,
    #[serde(default)]
    facilities: Option<Vec<FacilityGroup>>,
    #[serde(default)]
    placement: Option<PlacementRecord>,
    #[serde(default)]
    keywords: BTreeMap<Topic, Vec<String>>,
    #[serde(default)]
    aliases: BTreeMap<String, String>,
    #[serde(default)]
    faq: Vec<FaqEntry>,
    #[serde(default)]
    quick_answers: BTreeMap<Topic, String>,
}

/// FAQ entry with its match patterns and question tokens precomputed.
#[derive(Debug, Clone)]
pub struct CompiledFaq {
    pub entry: FaqEntry,
    /// Normalised question followed by normalised triggers.
    pub patterns: Vec<String>,
    /// Distinct tokens of the normalised question.
    pub question_tokens: BTreeSet<String>,
}

// =============================================================================
// KnowledgeBase
// =============================================================================

/// Immutable, validated knowledge base.
///
/// Shared read-only across requests once loaded.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    doc: KnowledgeDocument,
    normalizer: Normalizer,
    faqs: Vec<CompiledFaq>,
}

impl KnowledgeBase {
    /// Load and validate the knowledge base from a JSON file.
    pub fn load(path: &Path) -> Result<Self, KnowledgeError> {
        let content = std::fs::read_to_string(path).map_err(|source| KnowledgeError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let kb = Self::from_json(&content)?;
        info!(
            path = %path.display(),
            topics = kb.available_topics().len(),
            faqs = kb.faqs.len(),
            quick_answers = kb.doc.quick_answers.len(),
            "Knowledge base loaded"
        );
        Ok(kb)
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, KnowledgeError> {
        let doc: KnowledgeDocument = serde_json::from_str(json)?;
        validate(&doc)?;

        let normalizer = Normalizer::new(&doc.aliases);
        let faqs = doc
            .faq
            .iter()
            .map(|entry| {
                let question = normalizer.normalize(&entry.question);
                let question_tokens = question.split(' ').map(str::to_string).collect();
                let mut patterns = vec![question];
                patterns.extend(
                    entry
                        .triggers
                        .iter()
                        .map(|t| normalizer.normalize(t))
                        .filter(|t| !t.is_empty()),
                );
                CompiledFaq {
                    entry: entry.clone(),
                    patterns,
                    question_tokens,
                }
            })
            .collect();

        Ok(Self {
            doc,
            normalizer,
            faqs,
        })
    }

    /// Record stored for `topic`, or `None` when the section is absent.
    pub fn get(&self, topic: Topic) -> Option<TopicRecord<'_>> {
        match topic {
            Topic::University => Some(TopicRecord::University(&self.doc.university)),
            Topic::Courses => self.doc.courses.as_ref().map(TopicRecord::Courses),
            Topic::Eligibility => self.doc.eligibility.as_ref().map(TopicRecord::Eligibility),
            Topic::Fees => self.doc.fees.as_ref().map(TopicRecord::Fees),
            Topic::Dates => self.doc.dates.as_ref().map(TopicRecord::Dates),
            Topic::Process => self.doc.process.as_ref().map(TopicRecord::Process),
            Topic::Contact => self.doc.contact.as_ref().map(TopicRecord::Contact),
            Topic::Facilities => self.doc.facilities.as_deref().map(TopicRecord::Facilities),
            Topic::Placement => self.doc.placement.as_ref().map(TopicRecord::Placement),
        }
    }

    /// Topics that have a record, in registration order.
    pub fn available_topics(&self) -> Vec<Topic> {
        Topic::ALL
            .iter()
            .copied()
            .filter(|t| self.get(*t).is_some())
            .collect()
    }

    pub fn university(&self) -> &UniversityInfo {
        &self.doc.university
    }

    pub fn keywords(&self) -> &BTreeMap<Topic, Vec<String>> {
        &self.doc.keywords
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Normalise user text with this knowledge base's alias table.
    pub fn normalize(&self, text: &str) -> String {
        self.normalizer.normalize(text)
    }

    /// FAQ entries in declaration order.
    pub fn faqs(&self) -> &[CompiledFaq] {
        &self.faqs
    }

    /// Canned summary answer for `topic`, if one is configured.
    pub fn quick_answer(&self, topic: Topic) -> Option<&str> {
        self.doc.quick_answers.get(&topic).map(String::as_str)
    }
}

// =============================================================================
// Validation
// =============================================================================

fn invalid(msg: impl Into<String>) -> KnowledgeError {
    KnowledgeError::Invalid(msg.into())
}

fn validate(doc: &KnowledgeDocument) -> Result<(), KnowledgeError> {
    if doc.university.name.trim().is_empty() {
        return Err(invalid("university name is empty"));
    }

    for topic in Topic::ALL {
        let terms = doc.keywords.get(&topic).map(Vec::as_slice).unwrap_or(&[]);
        if terms.is_empty() {
            return Err(invalid(format!("topic '{}' has no keywords", topic)));
        }
        if terms.iter().any(|t| fold(t).is_empty()) {
            return Err(invalid(format!("topic '{}' has an empty keyword", topic)));
        }
    }

    for alias in doc.aliases.keys() {
        let folded = fold(alias);
        if folded.is_empty() || folded.contains(' ') {
            return Err(invalid(format!(
                "alias '{}' must be a single word",
                alias
            )));
        }
    }

    for (i, faq) in doc.faq.iter().enumerate() {
        if fold(&faq.question).is_empty() {
            return Err(invalid(format!("faq entry {} has an empty question", i)));
        }
        if faq.answer.trim().is_empty() {
            return Err(invalid(format!("faq entry {} has an empty answer", i)));
        }
    }

    for (topic, answer) in &doc.quick_answers {
        if answer.trim().is_empty() {
            return Err(invalid(format!("quick answer for '{}' is empty", topic)));
        }
    }

    if let Some(courses) = &doc.courses {
        for program in &courses.undergraduate {
            if program.seats == 0 {
                return Err(invalid(format!("program '{}' has zero seats", program.name)));
            }
        }
        for program in &courses.postgraduate {
            if program.seats == Some(0) {
                return Err(invalid(format!("program '{}' has zero seats", program.name)));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn all_keywords() -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for topic in Topic::ALL {
            map.insert(topic.as_str().to_string(), json!([topic.as_str()]));
        }
        serde_json::Value::Object(map)
    }

    fn minimal_doc() -> serde_json::Value {
        json!({
            "university": {"name": "Test Institute", "location": "Springfield"},
            "fees": {"annual_fee": 88000},
            "keywords": all_keywords(),
            "aliases": {"cse": "computer science"},
            "faq": [{
                "question": "What is the fee structure for B.Tech?",
                "answer": "The annual academic fee is INR 88000.",
                "topic": "fees",
                "triggers": ["btech fees"],
                "match_mode": "contains"
            }],
            "quick_answers": {"fees": "Annual fee: INR 88000."}
        })
    }

    fn load_value(value: &serde_json::Value) -> Result<KnowledgeBase, KnowledgeError> {
        KnowledgeBase::from_json(&value.to_string())
    }

    // ---- Loading ----

    #[test]
    fn test_load_minimal_document() {
        let kb = load_value(&minimal_doc()).unwrap();
        assert_eq!(kb.university().name, "Test Institute");
        assert_eq!(kb.available_topics(), vec![Topic::University, Topic::Fees]);
        assert_eq!(kb.quick_answer(Topic::Fees), Some("Annual fee: INR 88000."));
        assert_eq!(kb.quick_answer(Topic::Courses), None);
    }

    #[test]
    fn test_get_absent_topic_is_none() {
        let kb = load_value(&minimal_doc()).unwrap();
        assert!(kb.get(Topic::Placement).is_none());
        assert!(kb.get(Topic::University).is_some());
        match kb.get(Topic::Fees) {
            Some(TopicRecord::Fees(fees)) => assert_eq!(fees.annual_fee, 88000),
            other => panic!("expected fees record, got {:?}", other),
        }
    }

    #[test]
    fn test_faq_patterns_are_normalised() {
        let kb = load_value(&minimal_doc()).unwrap();
        let faq = &kb.faqs()[0];
        assert_eq!(
            faq.patterns,
            vec!["what is the fee structure for b tech", "btech fees"]
        );
        assert!(faq.question_tokens.contains("fee"));
        assert_eq!(faq.entry.match_mode, MatchMode::Contains);
    }

    #[test]
    fn test_normalize_uses_aliases() {
        let kb = load_value(&minimal_doc()).unwrap();
        assert_eq!(kb.normalize("Seats in CSE?"), "seats in computer science");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(minimal_doc().to_string().as_bytes()).unwrap();
        let kb = KnowledgeBase::load(file.path()).unwrap();
        assert_eq!(kb.faqs().len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let err = KnowledgeBase::load(Path::new("/nonexistent/kb.json")).unwrap_err();
        assert!(matches!(err, KnowledgeError::Read { .. }));
    }

    #[test]
    fn test_load_malformed_json() {
        let err = KnowledgeBase::from_json("{ not json").unwrap_err();
        assert!(matches!(err, KnowledgeError::Parse(_)));
    }

    #[test]
    fn test_missing_university_is_parse_error() {
        let mut doc = minimal_doc();
        doc.as_object_mut().unwrap().remove("university");
        assert!(matches!(load_value(&doc), Err(KnowledgeError::Parse(_))));
    }

    #[test]
    fn test_wrongly_typed_fee_is_parse_error() {
        let mut doc = minimal_doc();
        doc["fees"]["annual_fee"] = json!("eighty eight thousand");
        assert!(matches!(load_value(&doc), Err(KnowledgeError::Parse(_))));
    }

    // ---- Validation ----

    fn assert_invalid(doc: serde_json::Value, needle: &str) {
        match load_value(&doc) {
            Err(KnowledgeError::Invalid(msg)) => {
                assert!(msg.contains(needle), "message '{}' lacks '{}'", msg, needle)
            }
            other => panic!("expected validation error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_rejects_empty_university_name() {
        let mut doc = minimal_doc();
        doc["university"]["name"] = json!("  ");
        assert_invalid(doc, "university name");
    }

    #[test]
    fn test_rejects_topic_without_keywords() {
        let mut doc = minimal_doc();
        doc["keywords"].as_object_mut().unwrap().remove("placement");
        assert_invalid(doc, "'placement' has no keywords");
    }

    #[test]
    fn test_rejects_empty_keyword() {
        let mut doc = minimal_doc();
        doc["keywords"]["dates"] = json!(["deadline", "?!"]);
        assert_invalid(doc, "'dates' has an empty keyword");
    }

    #[test]
    fn test_rejects_multi_word_alias() {
        let mut doc = minimal_doc();
        doc["aliases"] = json!({"b tech": "bachelor of technology"});
        assert_invalid(doc, "single word");
    }

    #[test]
    fn test_rejects_empty_faq_answer() {
        let mut doc = minimal_doc();
        doc["faq"][0]["answer"] = json!("");
        assert_invalid(doc, "empty answer");
    }

    #[test]
    fn test_rejects_empty_quick_answer() {
        let mut doc = minimal_doc();
        doc["quick_answers"]["contact"] = json!(" ");
        assert_invalid(doc, "quick answer for 'contact'");
    }

    #[test]
    fn test_rejects_zero_seats() {
        let mut doc = minimal_doc();
        doc["courses"] = json!({
            "undergraduate": [{"name": "Civil Engineering", "duration": "4 years", "seats": 0}]
        });
        assert_invalid(doc, "zero seats");
    }

    #[test]
    fn test_rejects_unknown_topic_key() {
        let mut doc = minimal_doc();
        doc["quick_answers"]["hostel"] = json!("Separate hostels for boys and girls.");
        assert!(matches!(load_value(&doc), Err(KnowledgeError::Parse(_))));
    }

    // ---- Bundled data ----

    #[test]
    fn test_bundled_knowledge_base_is_valid() {
        let kb = KnowledgeBase::from_json(include_str!("../../../data/knowledge_base.json"))
            .unwrap();
        assert_eq!(kb.available_topics(), Topic::ALL.to_vec());
        match kb.get(Topic::Fees) {
            Some(TopicRecord::Fees(fees)) => assert_eq!(fees.annual_fee, 88000),
            other => panic!("expected fees record, got {:?}", other),
        }
        assert!(kb.quick_answer(Topic::Fees).unwrap().contains("88000"));
    }
}
