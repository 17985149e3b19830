//! Read-only admissions knowledge base.
//!
//! Loads the typed per-topic records from JSON, validates them once at
//! startup, and exposes the keyword, alias, FAQ and quick-answer tables the
//! query pipeline reads from.

pub mod error;
pub mod index;
pub mod normalize;
pub mod records;
pub mod store;

pub use error::KnowledgeError;
pub use index::{KeywordEntry, KeywordIndex};
pub use normalize::Normalizer;
pub use records::{
    Contact, Courses, DateEntry, Eligibility, EligibilityRule, FacilityGroup, FeeItem, Fees,
    ImportantDates, PlacementRecord, PostgraduateProgram, Process, TopicRecord,
    UndergraduateProgram, UniversityInfo,
};
pub use store::{FaqEntry, KnowledgeBase, MatchMode};
