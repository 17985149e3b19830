use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AdmitError;

/// Label used wherever a reply carries no topic classification.
pub const UNCLASSIFIED: &str = "unclassified";

// =============================================================================
// Enums
// =============================================================================

/// One of the fixed admission information categories.
///
/// Declaration order doubles as registration order: when two topics score
/// the same during classification, the one declared first wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    /// General university overview (name, location, establishment).
    University,
    /// Programs, branches and seat counts.
    Courses,
    /// Academic requirements and entrance exams.
    Eligibility,
    /// Fee structure, hostel and payment modes.
    Fees,
    /// Important admission dates and deadlines.
    Dates,
    /// Step-by-step admission procedure and documents.
    Process,
    /// Admission office contact details.
    Contact,
    /// Campus facilities and infrastructure.
    Facilities,
    /// Placement statistics and recruiters.
    Placement,
}

impl Topic {
    /// Every topic, in registration order.
    pub const ALL: [Topic; 9] = [
        Topic::University,
        Topic::Courses,
        Topic::Eligibility,
        Topic::Fees,
        Topic::Dates,
        Topic::Process,
        Topic::Contact,
        Topic::Facilities,
        Topic::Placement,
    ];

    /// Machine-readable name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::University => "university",
            Topic::Courses => "courses",
            Topic::Eligibility => "eligibility",
            Topic::Fees => "fees",
            Topic::Dates => "dates",
            Topic::Process => "process",
            Topic::Contact => "contact",
            Topic::Facilities => "facilities",
            Topic::Placement => "placement",
        }
    }

    /// Human-readable heading used in generated context blocks.
    pub fn heading(&self) -> &'static str {
        match self {
            Topic::University => "University Information",
            Topic::Courses => "Courses Offered",
            Topic::Eligibility => "Eligibility Criteria",
            Topic::Fees => "Fee Structure",
            Topic::Dates => "Important Dates",
            Topic::Process => "Admission Process",
            Topic::Contact => "Contact Information",
            Topic::Facilities => "Campus Facilities",
            Topic::Placement => "Placement Record",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = AdmitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Topic::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == needle)
            .ok_or_else(|| AdmitError::UnknownTopic(s.to_string()))
    }
}

/// Label for an optional topic, using [`UNCLASSIFIED`] when absent.
pub fn topic_label(topic: Option<Topic>) -> &'static str {
    topic.map(|t| t.as_str()).unwrap_or(UNCLASSIFIED)
}

/// How a reply was produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    /// Pre-authored answer served without calling the model.
    Quick,
    /// Text produced by the external completion service.
    Generated,
    /// Fixed graceful message substituted after a generation failure.
    Fallback,
}

impl ReplySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplySource::Quick => "quick",
            ReplySource::Generated => "generated",
            ReplySource::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ReplySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
