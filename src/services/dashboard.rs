//! Composed admin dashboard.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::aggregation::{
    AggregationService, CaseStudySummary, InquirySummary, KindCounts, ReportWindow,
    TestimonialSummary,
};
use super::listing::ListingService;
use crate::error::AppResult;
use crate::storage::{CaseStudy, Inquiry, Testimonial};

/// Newest records of each kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentRecords {
    pub inquiries: Vec<Inquiry>,
    pub case_studies: Vec<CaseStudy>,
    pub testimonials: Vec<Testimonial>,
}

/// The admin home view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub generated_at: DateTime<Utc>,
    pub totals: KindCounts,
    pub inquiries: InquirySummary,
    pub case_studies: CaseStudySummary,
    pub testimonials: TestimonialSummary,
    pub recent: RecentRecords,
}

/// Runs the aggregation and listing calls concurrently and merges them.
#[derive(Clone)]
pub struct DashboardComposer {
    aggregation: AggregationService,
    listing: ListingService,
    recent_limit: u64,
}

impl DashboardComposer {
    pub fn new(aggregation: AggregationService, listing: ListingService, recent_limit: u32) -> Self {
        Self {
            aggregation,
            listing,
            recent_limit: u64::from(recent_limit),
        }
    }

    /// Build the dashboard. Fails with the first sub-call error.
    pub async fn compose(&self, window: &ReportWindow) -> AppResult<Dashboard> {
        let (inquiries, case_studies, testimonials, recent_inquiries, recent_studies, recent_reviews) =
            tokio::try_join!(
                self.aggregation.inquiry_summary(window),
                self.aggregation.case_study_summary(window),
                self.aggregation.testimonial_summary(window),
                self.listing.recent::<Inquiry>(self.recent_limit),
                self.listing.recent::<CaseStudy>(self.recent_limit),
                self.listing.recent::<Testimonial>(self.recent_limit),
            )?;

        info!(
            inquiries = inquiries.total,
            case_studies = case_studies.total,
            testimonials = testimonials.total,
            "Dashboard composed"
        );

        Ok(Dashboard {
            generated_at: window.now,
            totals: KindCounts {
                inquiries: inquiries.total,
                case_studies: case_studies.total,
                testimonials: testimonials.total,
            },
            inquiries,
            case_studies,
            testimonials,
            recent: RecentRecords {
                inquiries: recent_inquiries,
                case_studies: recent_studies,
                testimonials: recent_reviews,
            },
        })
    }
}
