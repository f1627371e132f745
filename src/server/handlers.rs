use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use super::SharedState;
use crate::config::Environment;
use crate::error::{AppError, ProtocolError, ProtocolResult};
use crate::services::{params, zero_fill, zero_fill_months, Params, Principal};
use crate::storage::{CaseStudy, Inquiry, Testimonial};

/// Role allowed to call admin operations.
pub const ADMIN_ROLE: &str = "admin";

/// A callable operation.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Operation {
    pub name: &'static str,
    pub description: &'static str,
    /// Whether a `principal` with the admin role is required.
    pub admin: bool,
}

const fn admin(name: &'static str, description: &'static str) -> Operation {
    Operation {
        name,
        description,
        admin: true,
    }
}

const fn public(name: &'static str, description: &'static str) -> Operation {
    Operation {
        name,
        description,
        admin: false,
    }
}

/// Every operation served, in listing order.
pub const OPERATIONS: &[Operation] = &[
    admin("admin.dashboard", "Composed dashboard: totals, breakdowns, series, recent records"),
    admin("admin.stats", "System totals, status and category breakdowns, 30-day counts"),
    admin("admin.inquiries.list", "Filtered, searched, paginated inquiries"),
    admin("admin.inquiries.get", "One inquiry by id"),
    admin("admin.inquiries.update", "Edit status, priority, notes, follow-up date, assignee"),
    admin("admin.inquiries.delete", "Delete one inquiry"),
    admin("admin.inquiries.stats", "Inquiry summary with zero-filled status counts and series"),
    admin("admin.case_studies.list", "Filtered, searched, paginated case studies"),
    admin("admin.case_studies.get", "One case study by id"),
    admin("admin.case_studies.create", "Create a case study"),
    admin("admin.case_studies.update", "Edit a case study"),
    admin("admin.case_studies.delete", "Delete a case study and detach its testimonials"),
    admin("admin.case_studies.stats", "Case study summary with zero-filled status counts"),
    admin("admin.testimonials.list", "Filtered, searched, paginated testimonials"),
    admin("admin.testimonials.get", "One testimonial by id"),
    admin("admin.testimonials.create", "Create a testimonial"),
    admin("admin.testimonials.update", "Edit review, rating, and flags"),
    admin("admin.testimonials.delete", "Delete one testimonial"),
    admin("admin.testimonials.stats", "Testimonial summary with rating average"),
    public("inquiries.submit", "Submit a contact-form inquiry"),
    public("case_studies.list_public", "Public case studies, paginated"),
    public("case_studies.featured", "Newest public featured case studies"),
    public("case_studies.get_public", "One public case study by id"),
    public("case_studies.categories", "Categories, types, and tags of public case studies"),
    public("testimonials.list_public", "Public testimonials, paginated"),
    public("testimonials.featured", "Newest public featured testimonials"),
    public("testimonials.get_public", "One public testimonial by id"),
];

/// Look up an operation by method name.
pub fn find_operation(method: &str) -> Option<&'static Operation> {
    OPERATIONS.iter().find(|op| op.name == method)
}

/// Uniform operation result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    pub fn ok(data: Value, message: Option<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message,
            error: None,
        }
    }

    /// Failure envelope; the detailed error is included outside production.
    pub fn failure(message: impl Into<String>, detail: String, environment: Environment) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            error: environment.exposes_error_detail().then_some(detail),
        }
    }
}

/// Successful handler output.
struct Reply {
    data: Value,
    message: Option<String>,
}

impl Reply {
    fn data<T: Serialize>(value: T) -> ProtocolResult<Self> {
        Ok(Self {
            data: serde_json::to_value(value)?,
            message: None,
        })
    }

    fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }
}

/// Route an operation call and wrap its outcome in an [`Envelope`].
///
/// Malformed parameters and unknown methods are returned as protocol errors;
/// every other failure becomes a `success: false` envelope.
pub async fn handle_operation(
    state: &SharedState,
    method: &str,
    params: Option<Value>,
) -> ProtocolResult<Envelope> {
    let start = Instant::now();
    let operation = find_operation(method).ok_or_else(|| ProtocolError::UnknownMethod {
        method: method.to_string(),
    })?;
    let params = object_params(method, params)?;

    let principal = if operation.admin {
        match require_principal(&params) {
            Ok(principal) => Some(principal),
            Err(e) => {
                warn!(method = %method, error = %e, "Admin operation refused");
                return Ok(Envelope::failure(
                    "Access denied",
                    e.to_string(),
                    state.config.environment,
                ));
            }
        }
    } else {
        None
    };

    info!(
        method = %method,
        principal = principal.as_ref().map(|p| p.id.as_str()).unwrap_or("-"),
        "Routing operation"
    );

    let deadline = Duration::from_millis(state.config.request.timeout_ms);
    let outcome = match tokio::time::timeout(
        deadline,
        dispatch(state, method, principal.as_ref(), &params),
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(_) => Err(ProtocolError::Operation(AppError::StoreUnavailable {
            message: format!("request timed out after {} ms", state.config.request.timeout_ms),
        })),
    };

    let elapsed_ms = start.elapsed().as_millis() as u64;
    match outcome {
        Ok(reply) => {
            info!(method = %method, elapsed_ms, "Operation completed");
            Ok(Envelope::ok(reply.data, reply.message))
        }
        Err(ProtocolError::Operation(err)) => {
            match &err {
                AppError::StoreUnavailable { .. }
                | AppError::Internal { .. }
                | AppError::Config { .. } => {
                    error!(method = %method, elapsed_ms, error = %err, "Operation failed")
                }
                _ => warn!(method = %method, elapsed_ms, error = %err, "Operation rejected"),
            }
            Ok(Envelope::failure(
                err.public_message(),
                err.to_string(),
                state.config.environment,
            ))
        }
        Err(other) => Err(other),
    }
}

async fn dispatch(
    state: &SharedState,
    method: &str,
    principal: Option<&Principal>,
    params: &Params,
) -> ProtocolResult<Reply> {
    // Admin operations are only reached with a principal.
    let admin = || {
        principal.ok_or_else(|| ProtocolError::Unauthorized {
            message: "principal required".to_string(),
        })
    };

    match method {
        "admin.dashboard" => {
            let window = state.report_window();
            Reply::data(state.dashboard.compose(&window).await?)
        }
        "admin.stats" => {
            let window = state.report_window();
            Reply::data(state.aggregation.system_stats(&window).await?)
        }

        // Inquiries
        "admin.inquiries.list" => {
            Reply::data(state.listing.list_from_params::<Inquiry>(params).await?)
        }
        "admin.inquiries.get" => {
            let id = require_id(method, params)?;
            Reply::data(state.mutation.get::<Inquiry>(&id).await?)
        }
        "admin.inquiries.update" => {
            let id = require_id(method, params)?;
            let patch = params::inquiry_patch(params)?;
            let updated = state.mutation.update::<Inquiry>(admin()?, &id, &patch).await?;
            Ok(Reply::data(updated)?.with_message("Inquiry updated successfully"))
        }
        "admin.inquiries.delete" => {
            let id = require_id(method, params)?;
            state.mutation.delete::<Inquiry>(admin()?, &id).await?;
            Ok(Reply::data(serde_json::json!({ "id": id }))?
                .with_message("Inquiry deleted successfully"))
        }
        "admin.inquiries.stats" => {
            let window = state.report_window();
            let summary = state.aggregation.inquiry_summary(&window).await?;
            let status_counts = state.aggregation.inquiry_status_counts().await?;
            let monthly = zero_fill_months(&window, &summary.monthly);
            Reply::data(serde_json::json!({
                "summary": summary,
                "status_counts": status_counts,
                "monthly": monthly,
            }))
        }

        // Case studies
        "admin.case_studies.list" => {
            Reply::data(state.listing.list_from_params::<CaseStudy>(params).await?)
        }
        "admin.case_studies.get" => {
            let id = require_id(method, params)?;
            Reply::data(state.mutation.get::<CaseStudy>(&id).await?)
        }
        "admin.case_studies.create" => {
            let study = params::new_case_study(params)?;
            let created = state.mutation.create_case_study(admin()?, &study).await?;
            Ok(Reply::data(created)?.with_message("Case study created successfully"))
        }
        "admin.case_studies.update" => {
            let id = require_id(method, params)?;
            let patch = params::case_study_patch(params)?;
            let updated = state
                .mutation
                .update::<CaseStudy>(admin()?, &id, &patch)
                .await?;
            Ok(Reply::data(updated)?.with_message("Case study updated successfully"))
        }
        "admin.case_studies.delete" => {
            let id = require_id(method, params)?;
            state.mutation.delete::<CaseStudy>(admin()?, &id).await?;
            Ok(Reply::data(serde_json::json!({ "id": id }))?
                .with_message("Case study deleted successfully"))
        }
        "admin.case_studies.stats" => {
            let window = state.report_window();
            let summary = state.aggregation.case_study_summary(&window).await?;
            let status_counts = state.aggregation.case_study_status_counts().await?;
            let monthly = zero_fill_months(&window, &summary.monthly);
            Reply::data(serde_json::json!({
                "summary": summary,
                "status_counts": status_counts,
                "monthly": monthly,
            }))
        }

        // Testimonials
        "admin.testimonials.list" => {
            Reply::data(state.listing.list_from_params::<Testimonial>(params).await?)
        }
        "admin.testimonials.get" => {
            let id = require_id(method, params)?;
            Reply::data(state.mutation.get::<Testimonial>(&id).await?)
        }
        "admin.testimonials.create" => {
            let testimonial = params::new_testimonial(params)?;
            let created = state
                .mutation
                .create_testimonial(admin()?, &testimonial)
                .await?;
            Ok(Reply::data(created)?.with_message("Testimonial created successfully"))
        }
        "admin.testimonials.update" => {
            let id = require_id(method, params)?;
            let patch = params::testimonial_patch(params)?;
            let updated = state
                .mutation
                .update::<Testimonial>(admin()?, &id, &patch)
                .await?;
            Ok(Reply::data(updated)?.with_message("Testimonial updated successfully"))
        }
        "admin.testimonials.delete" => {
            let id = require_id(method, params)?;
            state.mutation.delete::<Testimonial>(admin()?, &id).await?;
            Ok(Reply::data(serde_json::json!({ "id": id }))?
                .with_message("Testimonial deleted successfully"))
        }
        "admin.testimonials.stats" => {
            let window = state.report_window();
            let summary = state.aggregation.testimonial_summary(&window).await?;
            let by_rating = zero_fill(&summary.by_rating, ["5", "4", "3", "2", "1"]);
            Reply::data(serde_json::json!({
                "summary": summary,
                "rating_counts": by_rating,
            }))
        }

        // Public surface
        "inquiries.submit" => {
            let inquiry = params::new_inquiry(params)?;
            let created = state.mutation.submit_inquiry(&inquiry).await?;
            Ok(Reply::data(serde_json::json!({
                "id": created.id,
                "created_at": created.created_at,
            }))?
            .with_message("Thank you for your inquiry. We'll get back to you soon."))
        }
        "case_studies.list_public" => {
            Reply::data(state.listing.list_public_case_studies(params).await?)
        }
        "case_studies.featured" => Reply::data(state.listing.featured_case_studies().await?),
        "case_studies.get_public" => {
            let id = require_id(method, params)?;
            Reply::data(state.listing.get_public_case_study(&id).await?)
        }
        "case_studies.categories" => Reply::data(state.listing.case_study_catalog().await?),
        "testimonials.list_public" => {
            Reply::data(state.listing.list_public_testimonials(params).await?)
        }
        "testimonials.featured" => Reply::data(state.listing.featured_testimonials().await?),
        "testimonials.get_public" => {
            let id = require_id(method, params)?;
            Reply::data(state.listing.get_public_testimonial(&id).await?)
        }

        _ => Err(ProtocolError::UnknownMethod {
            method: method.to_string(),
        }),
    }
}

/// Parameters as a flat object; absent params read as empty.
fn object_params(method: &str, params: Option<Value>) -> ProtocolResult<Params> {
    match params {
        None | Some(Value::Null) => Ok(Params::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(ProtocolError::InvalidParameters {
            method: method.to_string(),
            message: format!("params must be an object, got {}", other),
        }),
    }
}

fn require_id(method: &str, params: &Params) -> ProtocolResult<String> {
    params
        .get("id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ProtocolError::InvalidParameters {
            method: method.to_string(),
            message: "missing string field `id`".to_string(),
        })
}

fn require_principal(params: &Params) -> ProtocolResult<Principal> {
    let value = params
        .get("principal")
        .cloned()
        .ok_or_else(|| ProtocolError::Unauthorized {
            message: "principal required".to_string(),
        })?;
    let principal: Principal =
        serde_json::from_value(value).map_err(|e| ProtocolError::Unauthorized {
            message: format!("malformed principal: {}", e),
        })?;

    if principal.id.trim().is_empty() {
        return Err(ProtocolError::Unauthorized {
            message: "principal id is empty".to_string(),
        });
    }
    if principal.role != ADMIN_ROLE {
        return Err(ProtocolError::Unauthorized {
            message: format!("role '{}' may not call admin operations", principal.role),
        });
    }
    Ok(principal)
}
