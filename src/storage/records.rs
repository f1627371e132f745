//! Domain records for inquiries, case studies, and testimonials.
//!
//! Every categorical field is a closed enum with a fixed kebab-case wire
//! name. Filter, group, and patch types are closed as well, so callers
//! cannot name a field the store does not support.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::SqlValue;

/// Declares a string-backed enum with `Display`, `FromStr`, and a list of
/// every variant in declaration order.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Every value of the domain, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire name of this value.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(format!("Unknown {}: {}", $label, s)),
                }
            }
        }

        impl From<$name> for SqlValue {
            fn from(value: $name) -> Self {
                SqlValue::Text(value.as_str().to_string())
            }
        }
    };
}

string_enum! {
    /// Triage state of an inquiry.
    InquiryStatus, "inquiry status" {
        #[default]
        New => "new",
        InProgress => "in-progress",
        Completed => "completed",
        Closed => "closed",
    }
}

string_enum! {
    /// Urgency assigned to an inquiry.
    Priority, "priority" {
        Low => "low",
        #[default]
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
}

string_enum! {
    /// Kind of work an inquiry asks for.
    ProjectType, "project type" {
        Mobile => "mobile",
        #[default]
        Web => "web",
        Both => "both",
        Consultation => "consultation",
        Other => "other",
    }
}

string_enum! {
    /// Budget bracket, shared by inquiries and case studies.
    Budget, "budget" {
        Under10k => "under-10k",
        From10kTo50k => "10k-50k",
        From50kTo100k => "50k-100k",
        Over100k => "100k-plus",
        #[default]
        Flexible => "flexible",
        Confidential => "confidential",
    }
}

string_enum! {
    /// Requested delivery timeline of an inquiry.
    Timeline, "timeline" {
        Asap => "asap",
        OneMonth => "1-month",
        TwoToThreeMonths => "2-3-months",
        ThreeToSixMonths => "3-6-months",
        OverSixMonths => "6-months-plus",
        #[default]
        Flexible => "flexible",
    }
}

string_enum! {
    /// Channel an inquiry arrived through.
    InquirySource, "inquiry source" {
        #[default]
        Website => "website",
        Referral => "referral",
        Social => "social",
        Email => "email",
        Phone => "phone",
        Other => "other",
    }
}

string_enum! {
    /// Delivery stage of a case study.
    CaseStudyStatus, "case study status" {
        #[default]
        Planning => "planning",
        Development => "development",
        Testing => "testing",
        Completed => "completed",
        Maintenance => "maintenance",
    }
}

string_enum! {
    /// Portfolio category of a case study.
    Category, "category" {
        Mobile => "mobile",
        #[default]
        Web => "web",
        Both => "both",
        Consultation => "consultation",
    }
}

string_enum! {
    /// Target platform of a case study.
    PlatformType, "project platform" {
        Ios => "ios",
        Android => "android",
        #[default]
        Web => "web",
        Pwa => "pwa",
        CrossPlatform => "cross-platform",
    }
}

/// Review score, always within 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rating(u8);

impl Rating {
    /// Lowest accepted score.
    pub const MIN: i64 = 1;
    /// Highest accepted score.
    pub const MAX: i64 = 5;

    /// Validate a score. Out-of-range values are rejected, never clamped.
    pub fn new(value: i64) -> Result<Self, String> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Rating(value as u8))
        } else {
            Err(format!(
                "rating must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                value
            ))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Rating::new(value)
    }
}

impl From<Rating> for i64 {
    fn from(rating: Rating) -> Self {
        i64::from(rating.0)
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Inquiry
// ============================================================================

/// A client project request submitted through the contact form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inquiry {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub project_type: ProjectType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<Budget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Timeline>,
    pub message: String,
    pub status: InquiryStatus,
    pub priority: Priority,
    pub source: InquirySource,
    /// External identity of the admin handling the inquiry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for a new inquiry.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInquiry {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub project_type: ProjectType,
    pub budget: Option<Budget>,
    pub timeline: Option<Timeline>,
    pub message: String,
    pub source: InquirySource,
}

/// Exact-match filters accepted for inquiries.
#[derive(Debug, Clone, PartialEq)]
pub enum InquiryFilter {
    Status(InquiryStatus),
    Priority(Priority),
    ProjectType(ProjectType),
}

/// Groupable inquiry fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InquiryField {
    Status,
    ProjectType,
}

/// Admin edits to an inquiry. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InquiryPatch {
    pub status: Option<InquiryStatus>,
    pub priority: Option<Priority>,
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub assigned_to: Option<String>,
}

// ============================================================================
// Case study
// ============================================================================

/// Image attached to a case study.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default)]
    pub is_main: bool,
}

/// External links of a case study.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_demo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub play_store: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_store: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub figma: Option<String>,
}

/// One measured result of a case study.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeMetric {
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub improvement: Option<String>,
}

/// Results section of a case study.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub metrics: Vec<OutcomeMetric>,
}

/// A portfolio project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseStudy {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    #[serde(rename = "type")]
    pub platform: PlatformType,
    pub tech_stack: Vec<String>,
    pub images: Vec<ImageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<ExternalLinks>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_industry: Option<String>,
    pub status: CaseStudyStatus,
    pub featured: bool,
    pub is_public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<Budget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Outcome>,
    pub tags: Vec<String>,
    /// Derived from the date range on every read; ignored on input.
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub duration_days: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Project length in whole days, when both ends of the date range are known.
pub fn span_days(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<i64> {
    match (start, end) {
        (Some(start), Some(end)) => Some((end - start).num_days().abs()),
        _ => None,
    }
}

/// Validated input for a new case study.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCaseStudy {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub platform: PlatformType,
    pub tech_stack: Vec<String>,
    pub images: Vec<ImageRef>,
    pub links: Option<ExternalLinks>,
    pub client_name: Option<String>,
    pub client_company: Option<String>,
    pub client_industry: Option<String>,
    pub status: CaseStudyStatus,
    pub featured: bool,
    pub is_public: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget: Option<Budget>,
    pub results: Option<Outcome>,
    pub tags: Vec<String>,
}

impl NewCaseStudy {
    /// Minimal case study with defaults for every optional field.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        category: Category,
        platform: PlatformType,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            category,
            platform,
            tech_stack: Vec::new(),
            images: Vec::new(),
            links: None,
            client_name: None,
            client_company: None,
            client_industry: None,
            status: CaseStudyStatus::default(),
            featured: false,
            is_public: true,
            start_date: None,
            end_date: None,
            budget: None,
            results: None,
            tags: Vec::new(),
        }
    }
}

/// Exact-match filters accepted for case studies.
#[derive(Debug, Clone, PartialEq)]
pub enum CaseStudyFilter {
    Status(CaseStudyStatus),
    Featured(bool),
    Category(Category),
    Platform(PlatformType),
    Public(bool),
}

/// Groupable case study fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseStudyField {
    Status,
    Category,
    Platform,
}

/// Admin edits to a case study.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseStudyPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub platform: Option<PlatformType>,
    pub status: Option<CaseStudyStatus>,
    pub featured: Option<bool>,
    pub is_public: Option<bool>,
    pub tech_stack: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

// ============================================================================
// Testimonial
// ============================================================================

/// A client review, optionally tied to one case study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Testimonial {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub review: String,
    pub rating: Rating,
    pub featured: bool,
    pub is_public: bool,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_study_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for a new testimonial.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTestimonial {
    pub name: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub review: String,
    pub rating: Rating,
    pub featured: bool,
    pub is_public: bool,
    pub verified: bool,
    pub case_study_id: Option<String>,
}

impl NewTestimonial {
    /// Public, unverified, non-featured testimonial.
    pub fn new(name: impl Into<String>, review: impl Into<String>, rating: Rating) -> Self {
        Self {
            name: name.into(),
            title: None,
            company: None,
            review: review.into(),
            rating,
            featured: false,
            is_public: true,
            verified: false,
            case_study_id: None,
        }
    }
}

/// Exact-match filters accepted for testimonials.
#[derive(Debug, Clone, PartialEq)]
pub enum TestimonialFilter {
    Featured(bool),
    Verified(bool),
    Public(bool),
    Rating(Rating),
    CaseStudy(String),
}

/// Groupable testimonial fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestimonialField {
    Rating,
}

/// Admin edits to a testimonial.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestimonialPatch {
    pub review: Option<String>,
    pub rating: Option<Rating>,
    pub featured: Option<bool>,
    pub is_public: Option<bool>,
    pub verified: Option<bool>,
}
