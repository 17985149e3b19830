//! Typed per-topic records.
//!
//! Each record renders itself to a short deterministic paragraph; the
//! context builder stitches these together for the generation prompt.

use serde::{Deserialize, Serialize};

use admit_core::Topic;

// =============================================================================
// Records
// =============================================================================

/// General university overview. The only mandatory section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniversityInfo {
    pub name: String,
    #[serde(default)]
    pub short_name: Option<String>,
    pub location: String,
    #[serde(default)]
    pub established: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub affiliation: Option<String>,
    #[serde(default)]
    pub ranking: Option<String>,
    #[serde(default)]
    pub campus_area: Option<String>,
}

impl UniversityInfo {
    fn render(&self) -> String {
        let mut out = match &self.short_name {
            Some(short) => format!("{} ({}) is located in {}.", self.name, short, self.location),
            None => format!("{} is located in {}.", self.name, self.location),
        };
        if let Some(year) = &self.established {
            out.push_str(&format!(" Established in {}.", year));
        }
        if let Some(kind) = &self.kind {
            out.push_str(&format!(" Type: {}.", kind));
        }
        if let Some(aff) = &self.affiliation {
            out.push_str(&format!(" Affiliation: {}.", aff));
        }
        if let Some(rank) = &self.ranking {
            out.push_str(&format!(" Ranking: {}.", rank));
        }
        if let Some(area) = &self.campus_area {
            out.push_str(&format!(" Campus area: {}.", area));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndergraduateProgram {
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    pub duration: String,
    pub seats: u32,
    #[serde(default)]
    pub specializations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostgraduateProgram {
    pub name: String,
    pub duration: String,
    #[serde(default)]
    pub seats: Option<u32>,
}

/// Programs offered, with per-branch seat counts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Courses {
    #[serde(default)]
    pub undergraduate: Vec<UndergraduateProgram>,
    #[serde(default)]
    pub postgraduate: Vec<PostgraduateProgram>,
}

impl Courses {
    fn render(&self) -> String {
        let mut parts = Vec::new();
        if !self.undergraduate.is_empty() {
            let branches: Vec<String> = self
                .undergraduate
                .iter()
                .map(|p| {
                    let label = match &p.code {
                        Some(code) => format!("{} ({})", p.name, code),
                        None => p.name.clone(),
                    };
                    let mut s = format!("{}: {} seats, {}", label, p.seats, p.duration);
                    if !p.specializations.is_empty() {
                        s.push_str(&format!(", specializations {}", p.specializations.join(", ")));
                    }
                    s
                })
                .collect();
            parts.push(format!("Undergraduate programs: {}.", branches.join("; ")));
        }
        if !self.postgraduate.is_empty() {
            let programs: Vec<String> = self
                .postgraduate
                .iter()
                .map(|p| match p.seats {
                    Some(seats) => format!("{} ({}, {} seats)", p.name, p.duration, seats),
                    None => format!("{} ({})", p.name, p.duration),
                })
                .collect();
            parts.push(format!("Postgraduate programs: {}.", programs.join("; ")));
        }
        parts.join(" ")
    }

    /// Total undergraduate intake.
    pub fn undergraduate_seats(&self) -> u32 {
        self.undergraduate.iter().map(|p| p.seats).sum()
    }
}

/// Requirements for one program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityRule {
    pub program: String,
    pub qualification: String,
    /// Category -> minimum marks, e.g. `general` -> `75%`.
    #[serde(default)]
    pub minimum_marks: Vec<(String, String)>,
    #[serde(default)]
    pub entrance_exam: Option<String>,
    #[serde(default)]
    pub age_limit: Option<String>,
    #[serde(default)]
    pub counseling: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Eligibility {
    #[serde(default)]
    pub programs: Vec<EligibilityRule>,
}

impl Eligibility {
    fn render(&self) -> String {
        self.programs
            .iter()
            .map(|rule| {
                let mut s = format!("{}: {}.", rule.program, rule.qualification);
                if !rule.minimum_marks.is_empty() {
                    let marks: Vec<String> = rule
                        .minimum_marks
                        .iter()
                        .map(|(category, marks)| format!("{} {}", category, marks))
                        .collect();
                    s.push_str(&format!(" Minimum marks: {}.", marks.join(", ")));
                }
                if let Some(exam) = &rule.entrance_exam {
                    s.push_str(&format!(" Entrance exam: {}.", exam));
                }
                if let Some(age) = &rule.age_limit {
                    s.push_str(&format!(" Age limit: {}.", age));
                }
                if let Some(c) = &rule.counseling {
                    s.push_str(&format!(" Counseling: {}.", c));
                }
                s
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeItem {
    pub item: String,
    pub amount: u64,
}

/// Fee structure. Amounts are whole currency units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fees {
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Total academic fee per year.
    pub annual_fee: u64,
    #[serde(default)]
    pub breakdown: Vec<FeeItem>,
    #[serde(default)]
    pub hostel_fee: Option<u64>,
    #[serde(default)]
    pub mess_fee: Option<u64>,
    #[serde(default)]
    pub payment_modes: Vec<String>,
    #[serde(default)]
    pub scholarships: Option<String>,
}

fn default_currency() -> String {
    "INR".to_string()
}

impl Fees {
    /// Annual fee including hostel and mess where configured.
    pub fn annual_total_with_hostel(&self) -> u64 {
        self.annual_fee + self.hostel_fee.unwrap_or(0) + self.mess_fee.unwrap_or(0)
    }

    fn render(&self) -> String {
        let mut out = format!("Annual academic fee: {} {}.", self.currency, self.annual_fee);
        if !self.breakdown.is_empty() {
            let items: Vec<String> = self
                .breakdown
                .iter()
                .map(|f| format!("{} {}", f.item, f.amount))
                .collect();
            out.push_str(&format!(" Breakdown: {}.", items.join(", ")));
        }
        if let Some(hostel) = self.hostel_fee {
            out.push_str(&format!(" Hostel fee: {} {} per year.", self.currency, hostel));
        }
        if let Some(mess) = self.mess_fee {
            out.push_str(&format!(" Mess fee: {} {} per year.", self.currency, mess));
        }
        if self.hostel_fee.is_some() || self.mess_fee.is_some() {
            out.push_str(&format!(
                " Total with hostel: {} {} per year.",
                self.currency,
                self.annual_total_with_hostel()
            ));
        }
        if !self.payment_modes.is_empty() {
            out.push_str(&format!(" Payment modes: {}.", self.payment_modes.join(", ")));
        }
        if let Some(s) = &self.scholarships {
            out.push_str(&format!(" Scholarships: {}.", s));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateEntry {
    pub event: String,
    pub date: String,
}

/// Admission calendar for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportantDates {
    pub session: String,
    #[serde(default)]
    pub events: Vec<DateEntry>,
}

impl ImportantDates {
    fn render(&self) -> String {
        let events: Vec<String> = self
            .events
            .iter()
            .map(|e| format!("{}: {}", e.event, e.date))
            .collect();
        format!("Admission session {}. {}.", self.session, events.join("; "))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Process {
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub documents: Vec<String>,
}

impl Process {
    fn render(&self) -> String {
        let mut parts = Vec::new();
        if !self.steps.is_empty() {
            let steps: Vec<String> = self
                .steps
                .iter()
                .enumerate()
                .map(|(i, s)| format!("{}. {}", i + 1, s))
                .collect();
            parts.push(format!("Steps: {}.", steps.join(" ")));
        }
        if !self.documents.is_empty() {
            parts.push(format!("Required documents: {}.", self.documents.join(", ")));
        }
        parts.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub phone: String,
    pub email: String,
    #[serde(default)]
    pub timings: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

impl Contact {
    fn render(&self) -> String {
        let mut out = format!("Admission office phone: {}. Email: {}.", self.phone, self.email);
        if let Some(t) = &self.timings {
            out.push_str(&format!(" Office hours: {}.", t));
        }
        if let Some(a) = &self.address {
            out.push_str(&format!(" Address: {}.", a));
        }
        if let Some(w) = &self.website {
            out.push_str(&format!(" Website: {}.", w));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityGroup {
    pub category: String,
    pub items: Vec<String>,
}

fn render_facilities(groups: &[FacilityGroup]) -> String {
    groups
        .iter()
        .map(|g| format!("{}: {}.", g.category, g.items.join(", ")))
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementRecord {
    pub year: String,
    #[serde(default)]
    pub placement_rate: Option<String>,
    #[serde(default)]
    pub total_offers: Option<u32>,
    #[serde(default)]
    pub companies_visited: Option<u32>,
    #[serde(default)]
    pub highest_package: Option<String>,
    #[serde(default)]
    pub average_package: Option<String>,
    #[serde(default)]
    pub median_package: Option<String>,
    #[serde(default)]
    pub top_recruiters: Vec<String>,
    #[serde(default)]
    pub support: Vec<String>,
}

impl PlacementRecord {
    fn render(&self) -> String {
        let mut out = format!("Placement statistics for {}:", self.year);
        if let Some(rate) = &self.placement_rate {
            out.push_str(&format!(" placement rate {},", rate));
        }
        if let Some(offers) = self.total_offers {
            out.push_str(&format!(" {} offers,", offers));
        }
        if let Some(companies) = self.companies_visited {
            out.push_str(&format!(" {} companies visited,", companies));
        }
        if let Some(p) = &self.highest_package {
            out.push_str(&format!(" highest package {},", p));
        }
        if let Some(p) = &self.average_package {
            out.push_str(&format!(" average package {},", p));
        }
        if let Some(p) = &self.median_package {
            out.push_str(&format!(" median package {},", p));
        }
        // Replace the trailing separator with a full stop
        if out.ends_with(',') || out.ends_with(':') {
            out.pop();
        }
        out.push('.');
        if !self.top_recruiters.is_empty() {
            out.push_str(&format!(" Top recruiters: {}.", self.top_recruiters.join(", ")));
        }
        if !self.support.is_empty() {
            out.push_str(&format!(" Placement support: {}.", self.support.join(", ")));
        }
        out
    }
}

// =============================================================================
// TopicRecord
// =============================================================================

/// Borrowed view of the record stored for one topic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TopicRecord<'a> {
    University(&'a UniversityInfo),
    Courses(&'a Courses),
    Eligibility(&'a Eligibility),
    Fees(&'a Fees),
    Dates(&'a ImportantDates),
    Process(&'a Process),
    Contact(&'a Contact),
    Facilities(&'a [FacilityGroup]),
    Placement(&'a PlacementRecord),
}

impl TopicRecord<'_> {
    pub fn topic(&self) -> Topic {
        match self {
            TopicRecord::University(_) => Topic::University,
            TopicRecord::Courses(_) => Topic::Courses,
            TopicRecord::Eligibility(_) => Topic::Eligibility,
            TopicRecord::Fees(_) => Topic::Fees,
            TopicRecord::Dates(_) => Topic::Dates,
            TopicRecord::Process(_) => Topic::Process,
            TopicRecord::Contact(_) => Topic::Contact,
            TopicRecord::Facilities(_) => Topic::Facilities,
            TopicRecord::Placement(_) => Topic::Placement,
        }
    }

    /// Deterministic prose summary of the record.
    pub fn render(&self) -> String {
        match self {
            TopicRecord::University(r) => r.render(),
            TopicRecord::Courses(r) => r.render(),
            TopicRecord::Eligibility(r) => r.render(),
            TopicRecord::Fees(r) => r.render(),
            TopicRecord::Dates(r) => r.render(),
            TopicRecord::Process(r) => r.render(),
            TopicRecord::Contact(r) => r.render(),
            TopicRecord::Facilities(r) => render_facilities(r),
            TopicRecord::Placement(r) => r.render(),
        }
    }
}
