//! Conversion of raw request parameters into typed queries, patches, and new
//! records.
//!
//! Parameters arrive as a flat JSON object. Values may be native JSON or
//! strings (as they would be in a query string). Listing parameters fail with
//! `InvalidQuery`; write parameters fail with `InvalidValue` naming the field.
//! Unknown keys are ignored.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::storage::{
    CaseStudyFilter, CaseStudyPatch, InquiryFilter, InquiryPatch, NewCaseStudy, NewInquiry,
    NewTestimonial, Rating, RecordQuery, TestimonialFilter, TestimonialPatch,
};

/// Flat parameter object of one request.
pub type Params = Map<String, Value>;

/// Keys consumed by the request layer itself, never treated as filters.
const RESERVED_KEYS: &[&str] = &["principal", "id", "search", "page", "limit", "page_size"];

/// A validated page position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u64,
    pub page_size: u64,
}

impl PageRequest {
    /// Page position; a page below 1 becomes 1 and a size below 1 becomes 1.
    pub fn new(page: u64, page_size: u64) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    /// First page with the given size.
    pub fn first(page_size: u64) -> Self {
        Self::new(1, page_size)
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

/// An exact-match filter that can be read from one request parameter.
pub trait FilterParam: Sized {
    /// Parse `key = value`; `None` when `key` is not a filter of this kind.
    fn parse_param(key: &str, value: &Value) -> Option<Result<Self, String>>;
}

impl FilterParam for InquiryFilter {
    fn parse_param(key: &str, value: &Value) -> Option<Result<Self, String>> {
        match key {
            "status" => Some(enum_value(value).map(InquiryFilter::Status)),
            "priority" => Some(enum_value(value).map(InquiryFilter::Priority)),
            "project_type" => Some(enum_value(value).map(InquiryFilter::ProjectType)),
            _ => None,
        }
    }
}

impl FilterParam for CaseStudyFilter {
    fn parse_param(key: &str, value: &Value) -> Option<Result<Self, String>> {
        match key {
            "status" => Some(enum_value(value).map(CaseStudyFilter::Status)),
            "featured" => Some(bool_value(value).map(CaseStudyFilter::Featured)),
            "category" => Some(enum_value(value).map(CaseStudyFilter::Category)),
            "type" => Some(enum_value(value).map(CaseStudyFilter::Platform)),
            "is_public" => Some(bool_value(value).map(CaseStudyFilter::Public)),
            _ => None,
        }
    }
}

impl FilterParam for TestimonialFilter {
    fn parse_param(key: &str, value: &Value) -> Option<Result<Self, String>> {
        match key {
            "featured" => Some(bool_value(value).map(TestimonialFilter::Featured)),
            "verified" => Some(bool_value(value).map(TestimonialFilter::Verified)),
            "is_public" => Some(bool_value(value).map(TestimonialFilter::Public)),
            "rating" => Some(
                int_value(value)
                    .and_then(Rating::new)
                    .map(TestimonialFilter::Rating),
            ),
            "case_study_id" => Some(
                text_value(value).map(|id| TestimonialFilter::CaseStudy(id.to_string())),
            ),
            _ => None,
        }
    }
}

/// Build a record query from listing parameters.
///
/// Recognized filter keys with an empty value are skipped, matching an
/// empty query-string field.
pub fn record_query<F: FilterParam>(params: &Params) -> AppResult<RecordQuery<F>> {
    let mut query = RecordQuery::all();

    for (key, value) in params {
        if RESERVED_KEYS.contains(&key.as_str()) || is_blank(value) {
            continue;
        }
        match F::parse_param(key, value) {
            Some(Ok(filter)) => query.filters.push(filter),
            Some(Err(message)) => {
                return Err(AppError::invalid_query(format!("{}: {}", key, message)))
            }
            None => debug!(key = %key, "Ignoring unrecognized filter parameter"),
        }
    }

    if let Some(value) = params.get("search").filter(|v| !v.is_null()) {
        let term = text_value(value)
            .map_err(|message| AppError::invalid_query(format!("search: {}", message)))?;
        query.search = Some(term.to_string());
    }

    Ok(query)
}

/// Read `page` and `page_size` (or its alias `limit`).
///
/// Pages below 1 are treated as 1. A size below 1 is rejected; sizes above
/// `max_size` are clamped.
pub fn page_request(params: &Params, default_size: u32, max_size: u32) -> AppResult<PageRequest> {
    let page = match present(params, "page") {
        Some(value) => int_value(value)
            .map_err(|message| AppError::invalid_query(format!("page: {}", message)))?,
        None => 1,
    };

    let size_param = present(params, "page_size").or_else(|| present(params, "limit"));
    let page_size = match size_param {
        Some(value) => {
            let size = int_value(value)
                .map_err(|message| AppError::invalid_query(format!("page_size: {}", message)))?;
            if size < 1 {
                return Err(AppError::invalid_query(format!(
                    "page_size must be at least 1, got {}",
                    size
                )));
            }
            size.min(i64::from(max_size))
        }
        None => i64::from(default_size.min(max_size)),
    };

    Ok(PageRequest::new(
        u64::try_from(page).unwrap_or(1),
        u64::try_from(page_size).unwrap_or(1),
    ))
}

// ============================================================================
// Patches
// ============================================================================

/// Read admin edits to an inquiry.
pub fn inquiry_patch(params: &Params) -> AppResult<InquiryPatch> {
    log_unknown(
        params,
        &["status", "priority", "notes", "follow_up_date", "assigned_to"],
    );
    Ok(InquiryPatch {
        status: optional_enum(params, "status")?,
        priority: optional_enum(params, "priority")?,
        notes: optional_text(params, "notes")?,
        follow_up_date: optional_date(params, "follow_up_date")?,
        assigned_to: optional_text(params, "assigned_to")?,
    })
}

/// Read admin edits to a case study.
pub fn case_study_patch(params: &Params) -> AppResult<CaseStudyPatch> {
    log_unknown(
        params,
        &[
            "title",
            "description",
            "category",
            "type",
            "status",
            "featured",
            "is_public",
            "tech_stack",
            "tags",
        ],
    );
    Ok(CaseStudyPatch {
        title: nonblank_text(params, "title")?,
        description: nonblank_text(params, "description")?,
        category: optional_enum(params, "category")?,
        platform: optional_enum(params, "type")?,
        status: optional_enum(params, "status")?,
        featured: optional_bool(params, "featured")?,
        is_public: optional_bool(params, "is_public")?,
        tech_stack: string_list(params, "tech_stack")?,
        tags: string_list(params, "tags")?,
    })
}

/// Read admin edits to a testimonial.
pub fn testimonial_patch(params: &Params) -> AppResult<TestimonialPatch> {
    log_unknown(
        params,
        &["review", "rating", "featured", "is_public", "verified"],
    );
    Ok(TestimonialPatch {
        review: nonblank_text(params, "review")?,
        rating: optional_rating(params, "rating")?,
        featured: optional_bool(params, "featured")?,
        is_public: optional_bool(params, "is_public")?,
        verified: optional_bool(params, "verified")?,
    })
}

// ============================================================================
// New records
// ============================================================================

/// Read a contact-form submission.
pub fn new_inquiry(params: &Params) -> AppResult<NewInquiry> {
    let email = required_text(params, "email")?.to_lowercase();
    if !looks_like_email(&email) {
        return Err(AppError::invalid_value(
            "email",
            "must be a valid email address",
        ));
    }

    Ok(NewInquiry {
        name: required_text(params, "name")?,
        email,
        phone: optional_text(params, "phone")?,
        company: optional_text(params, "company")?,
        project_type: required_enum(params, "project_type")?,
        budget: optional_enum(params, "budget")?,
        timeline: optional_enum(params, "timeline")?,
        message: required_text(params, "message")?,
        source: optional_enum(params, "source")?.unwrap_or_default(),
    })
}

/// Read a new case study.
pub fn new_case_study(params: &Params) -> AppResult<NewCaseStudy> {
    let mut study = NewCaseStudy::new(
        required_text(params, "title")?,
        required_text(params, "description")?,
        required_enum(params, "category")?,
        required_enum(params, "type")?,
    );

    study.tech_stack = string_list(params, "tech_stack")?.unwrap_or_default();
    study.images = json_field(params, "images")?.unwrap_or_default();
    study.links = json_field(params, "links")?;
    study.client_name = optional_text(params, "client_name")?;
    study.client_company = optional_text(params, "client_company")?;
    study.client_industry = optional_text(params, "client_industry")?;
    study.status = optional_enum(params, "status")?.unwrap_or_default();
    study.featured = optional_bool(params, "featured")?.unwrap_or(false);
    study.is_public = optional_bool(params, "is_public")?.unwrap_or(true);
    study.start_date = optional_date(params, "start_date")?;
    study.end_date = optional_date(params, "end_date")?;
    study.budget = optional_enum(params, "budget")?;
    study.results = json_field(params, "results")?;
    study.tags = string_list(params, "tags")?.unwrap_or_default();

    if let (Some(start), Some(end)) = (study.start_date, study.end_date) {
        if end < start {
            return Err(AppError::invalid_value(
                "end_date",
                "must not be before start_date",
            ));
        }
    }

    Ok(study)
}

/// Read a new testimonial.
pub fn new_testimonial(params: &Params) -> AppResult<NewTestimonial> {
    let rating = optional_rating(params, "rating")?
        .ok_or_else(|| AppError::invalid_value("rating", "is required"))?;

    let mut testimonial = NewTestimonial::new(
        required_text(params, "name")?,
        required_text(params, "review")?,
        rating,
    );
    testimonial.title = optional_text(params, "title")?;
    testimonial.company = optional_text(params, "company")?;
    testimonial.featured = optional_bool(params, "featured")?.unwrap_or(false);
    testimonial.is_public = optional_bool(params, "is_public")?.unwrap_or(true);
    testimonial.verified = optional_bool(params, "verified")?.unwrap_or(false);
    testimonial.case_study_id = optional_text(params, "case_study_id")?;

    Ok(testimonial)
}

// ============================================================================
// Field readers
// ============================================================================

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// The value under `key`, unless absent, null, or an empty string.
fn present<'a>(params: &'a Params, key: &str) -> Option<&'a Value> {
    params.get(key).filter(|value| !is_blank(value))
}

fn log_unknown(params: &Params, known: &[&str]) {
    for key in params.keys() {
        if !known.contains(&key.as_str()) && !RESERVED_KEYS.contains(&key.as_str()) {
            debug!(key = %key, "Ignoring unrecognized field");
        }
    }
}

fn text_value(value: &Value) -> Result<&str, String> {
    value
        .as_str()
        .map(str::trim)
        .ok_or_else(|| format!("expected a string, got {}", value))
}

fn enum_value<T: FromStr<Err = String>>(value: &Value) -> Result<T, String> {
    text_value(value)?.parse()
}

fn bool_value(value: &Value) -> Result<bool, String> {
    match value {
        Value::Bool(flag) => Ok(*flag),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(format!("expected true or false, got '{}'", s)),
        },
        other => Err(format!("expected a boolean, got {}", other)),
    }
}

fn int_value(value: &Value) -> Result<i64, String> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| format!("expected an integer, got {}", n)),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| format!("expected an integer, got '{}'", s)),
        other => Err(format!("expected an integer, got {}", other)),
    }
}

fn required_text(params: &Params, field: &str) -> AppResult<String> {
    match params.get(field) {
        None | Some(Value::Null) => Err(AppError::invalid_value(field, "is required")),
        Some(value) => {
            let text = text_value(value).map_err(|m| AppError::invalid_value(field, m))?;
            if text.is_empty() {
                return Err(AppError::invalid_value(field, "must not be blank"));
            }
            Ok(text.to_string())
        }
    }
}

/// Optional text; a blank string reads as absent.
fn optional_text(params: &Params, field: &str) -> AppResult<Option<String>> {
    match present(params, field) {
        Some(value) => text_value(value)
            .map(|text| Some(text.to_string()))
            .map_err(|m| AppError::invalid_value(field, m)),
        None => Ok(None),
    }
}

/// Optional text that must not be blank when given.
fn nonblank_text(params: &Params, field: &str) -> AppResult<Option<String>> {
    match params.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => required_text(params, field).map(Some),
    }
}

fn required_enum<T: FromStr<Err = String>>(params: &Params, field: &str) -> AppResult<T> {
    optional_enum(params, field)?.ok_or_else(|| AppError::invalid_value(field, "is required"))
}

fn optional_enum<T: FromStr<Err = String>>(params: &Params, field: &str) -> AppResult<Option<T>> {
    present(params, field)
        .map(|value| enum_value(value).map_err(|m| AppError::invalid_value(field, m)))
        .transpose()
}

fn optional_bool(params: &Params, field: &str) -> AppResult<Option<bool>> {
    present(params, field)
        .map(|value| bool_value(value).map_err(|m| AppError::invalid_value(field, m)))
        .transpose()
}

fn optional_rating(params: &Params, field: &str) -> AppResult<Option<Rating>> {
    present(params, field)
        .map(|value| {
            int_value(value)
                .and_then(Rating::new)
                .map_err(|m| AppError::invalid_value(field, m))
        })
        .transpose()
}

/// A calendar date, given either as `YYYY-MM-DD` or as an RFC 3339 timestamp.
fn optional_date(params: &Params, field: &str) -> AppResult<Option<NaiveDate>> {
    present(params, field)
        .map(|value| {
            let text = text_value(value).map_err(|m| AppError::invalid_value(field, m))?;
            text.parse::<NaiveDate>()
                .or_else(|_| DateTime::parse_from_rfc3339(text).map(|dt| dt.date_naive()))
                .map_err(|_| AppError::invalid_value(field, format!("not a date: '{}'", text)))
        })
        .transpose()
}

/// A list of strings; entries are trimmed and empty ones dropped.
fn string_list(params: &Params, field: &str) -> AppResult<Option<Vec<String>>> {
    match params.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| text_value(item).map_err(|m| AppError::invalid_value(field, m)))
            .filter(|item| !matches!(item, Ok(text) if text.is_empty()))
            .map(|item| item.map(str::to_string))
            .collect::<AppResult<Vec<_>>>()
            .map(Some),
        Some(other) => Err(AppError::invalid_value(
            field,
            format!("expected a list of strings, got {}", other),
        )),
    }
}

fn json_field<T: DeserializeOwned>(params: &Params, field: &str) -> AppResult<Option<T>> {
    match params.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| AppError::invalid_value(field, e.to_string())),
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}
