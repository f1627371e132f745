//! Dashboard statistics: totals, breakdowns, trailing windows, and monthly
//! series.
//!
//! Each per-kind summary is computed inside one read snapshot, so the
//! numbers within a summary are mutually consistent. Summaries of different
//! kinds may come from different snapshots.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::storage::{
    CaseStudy, CaseStudyField, CaseStudyFilter, CaseStudyStatus, GroupCount, Inquiry,
    InquiryField, InquiryFilter, InquiryStatus, MonthlyCount, RecordQuery, RecordReader,
    RecordStore, SqliteStorage, Testimonial, TestimonialField, TestimonialFilter,
};

/// Number of calendar months in a monthly series, current month included.
pub const SERIES_MONTHS: u32 = 6;
/// Length of the "recent" trailing window.
pub const RECENT_WINDOW_DAYS: i64 = 30;

/// The reference instant and calendar offset a report is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub now: DateTime<Utc>,
    pub utc_offset: FixedOffset,
}

impl ReportWindow {
    pub fn new(now: DateTime<Utc>, utc_offset: FixedOffset) -> Self {
        Self { now, utc_offset }
    }

    /// Midnight on the first day of the month `months_back` months before
    /// the current one, in the reporting offset.
    pub fn month_start(&self, months_back: u32) -> AppResult<DateTime<Utc>> {
        let local = self.now.with_timezone(&self.utc_offset);
        let index = local.year() * 12 + local.month0() as i32 - months_back as i32;
        let (year, month) = (index.div_euclid(12), index.rem_euclid(12) as u32 + 1);

        let midnight = NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .ok_or_else(|| AppError::Internal {
                message: format!("no calendar month {}-{:02}", year, month),
            })?;

        self.utc_offset
            .from_local_datetime(&midnight)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| AppError::Internal {
                message: format!("ambiguous local time {}", midnight),
            })
    }

    /// Start of the current calendar month.
    pub fn this_month_start(&self) -> AppResult<DateTime<Utc>> {
        self.month_start(0)
    }

    /// Start of the trailing "recent" window.
    pub fn recent_start(&self) -> DateTime<Utc> {
        self.now - Duration::days(RECENT_WINDOW_DAYS)
    }

    /// Start of the first month of the monthly series.
    pub fn series_start(&self) -> AppResult<DateTime<Utc>> {
        self.month_start(SERIES_MONTHS - 1)
    }
}

/// Inquiry statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InquirySummary {
    pub total: u64,
    pub new: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub this_month: u64,
    pub recent: u64,
    pub by_status: Vec<GroupCount>,
    pub by_project_type: Vec<GroupCount>,
    pub monthly: Vec<MonthlyCount>,
}

/// Case study statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseStudySummary {
    pub total: u64,
    pub featured: u64,
    pub public: u64,
    pub this_month: u64,
    pub recent: u64,
    pub by_status: Vec<GroupCount>,
    pub by_category: Vec<GroupCount>,
    pub monthly: Vec<MonthlyCount>,
}

/// Testimonial statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestimonialSummary {
    pub total: u64,
    pub public: u64,
    pub featured: u64,
    pub verified: u64,
    pub this_month: u64,
    pub recent: u64,
    pub by_rating: Vec<GroupCount>,
    /// Mean rating to one decimal, 0 without testimonials.
    pub average_rating: f64,
    pub total_ratings: u64,
    pub monthly: Vec<MonthlyCount>,
}

/// Record counts per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindCounts {
    pub inquiries: u64,
    pub case_studies: u64,
    pub testimonials: u64,
}

/// Store-wide totals for the admin stats view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemStats {
    pub totals: KindCounts,
    pub inquiries_by_status: Vec<GroupCount>,
    pub case_studies_by_status: Vec<GroupCount>,
    pub case_studies_by_category: Vec<GroupCount>,
    /// Records created in the trailing 30 days.
    pub recent: KindCounts,
}

/// Round to one decimal place.
fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub async fn summarize_inquiries<S: RecordReader>(
    reader: &S,
    window: &ReportWindow,
) -> AppResult<InquirySummary> {
    let all = RecordQuery::<InquiryFilter>::all();
    let with_status =
        |status: InquiryStatus| RecordQuery::all().with_filter(InquiryFilter::Status(status));

    Ok(InquirySummary {
        total: reader.count::<Inquiry>(&all).await?,
        new: reader
            .count::<Inquiry>(&with_status(InquiryStatus::New))
            .await?,
        in_progress: reader
            .count::<Inquiry>(&with_status(InquiryStatus::InProgress))
            .await?,
        completed: reader
            .count::<Inquiry>(&with_status(InquiryStatus::Completed))
            .await?,
        this_month: reader
            .count::<Inquiry>(&RecordQuery::all().created_since(window.this_month_start()?))
            .await?,
        recent: reader
            .count::<Inquiry>(&RecordQuery::all().created_since(window.recent_start()))
            .await?,
        by_status: reader
            .group_count::<Inquiry>(InquiryField::Status, &all)
            .await?,
        by_project_type: reader
            .group_count::<Inquiry>(InquiryField::ProjectType, &all)
            .await?,
        monthly: reader
            .monthly_counts::<Inquiry>(
                &RecordQuery::all().created_since(window.series_start()?),
                window.utc_offset,
            )
            .await?,
    })
}

pub async fn summarize_case_studies<S: RecordReader>(
    reader: &S,
    window: &ReportWindow,
) -> AppResult<CaseStudySummary> {
    let all = RecordQuery::<CaseStudyFilter>::all();

    Ok(CaseStudySummary {
        total: reader.count::<CaseStudy>(&all).await?,
        featured: reader
            .count::<CaseStudy>(&RecordQuery::all().with_filter(CaseStudyFilter::Featured(true)))
            .await?,
        public: reader
            .count::<CaseStudy>(&RecordQuery::all().with_filter(CaseStudyFilter::Public(true)))
            .await?,
        this_month: reader
            .count::<CaseStudy>(&RecordQuery::all().created_since(window.this_month_start()?))
            .await?,
        recent: reader
            .count::<CaseStudy>(&RecordQuery::all().created_since(window.recent_start()))
            .await?,
        by_status: reader
            .group_count::<CaseStudy>(CaseStudyField::Status, &all)
            .await?,
        by_category: reader
            .group_count::<CaseStudy>(CaseStudyField::Category, &all)
            .await?,
        monthly: reader
            .monthly_counts::<CaseStudy>(
                &RecordQuery::all().created_since(window.series_start()?),
                window.utc_offset,
            )
            .await?,
    })
}

pub async fn summarize_testimonials<S: RecordReader>(
    reader: &S,
    window: &ReportWindow,
) -> AppResult<TestimonialSummary> {
    let all = RecordQuery::<TestimonialFilter>::all();
    let ratings = reader.rating_stats(&all).await?;

    Ok(TestimonialSummary {
        total: reader.count::<Testimonial>(&all).await?,
        public: reader
            .count::<Testimonial>(&RecordQuery::all().with_filter(TestimonialFilter::Public(true)))
            .await?,
        featured: reader
            .count::<Testimonial>(
                &RecordQuery::all().with_filter(TestimonialFilter::Featured(true)),
            )
            .await?,
        verified: reader
            .count::<Testimonial>(
                &RecordQuery::all().with_filter(TestimonialFilter::Verified(true)),
            )
            .await?,
        this_month: reader
            .count::<Testimonial>(&RecordQuery::all().created_since(window.this_month_start()?))
            .await?,
        recent: reader
            .count::<Testimonial>(&RecordQuery::all().created_since(window.recent_start()))
            .await?,
        by_rating: reader
            .group_count::<Testimonial>(TestimonialField::Rating, &all)
            .await?,
        average_rating: ratings.average.map(round_tenth).unwrap_or(0.0),
        total_ratings: ratings.total,
        monthly: reader
            .monthly_counts::<Testimonial>(
                &RecordQuery::all().created_since(window.series_start()?),
                window.utc_offset,
            )
            .await?,
    })
}

pub async fn collect_system_stats<S: RecordReader>(
    reader: &S,
    window: &ReportWindow,
) -> AppResult<SystemStats> {
    let recent_since = window.recent_start();

    let totals = KindCounts {
        inquiries: reader.count::<Inquiry>(&RecordQuery::all()).await?,
        case_studies: reader.count::<CaseStudy>(&RecordQuery::all()).await?,
        testimonials: reader.count::<Testimonial>(&RecordQuery::all()).await?,
    };
    let recent = KindCounts {
        inquiries: reader
            .count::<Inquiry>(&RecordQuery::all().created_since(recent_since))
            .await?,
        case_studies: reader
            .count::<CaseStudy>(&RecordQuery::all().created_since(recent_since))
            .await?,
        testimonials: reader
            .count::<Testimonial>(&RecordQuery::all().created_since(recent_since))
            .await?,
    };

    Ok(SystemStats {
        totals,
        inquiries_by_status: reader
            .group_count::<Inquiry>(InquiryField::Status, &RecordQuery::all())
            .await?,
        case_studies_by_status: reader
            .group_count::<CaseStudy>(CaseStudyField::Status, &RecordQuery::all())
            .await?,
        case_studies_by_category: reader
            .group_count::<CaseStudy>(CaseStudyField::Category, &RecordQuery::all())
            .await?,
        recent,
    })
}

/// Aggregation service; each report runs in its own read snapshot.
#[derive(Clone)]
pub struct AggregationService {
    storage: SqliteStorage,
}

impl AggregationService {
    pub fn new(storage: SqliteStorage) -> Self {
        Self { storage }
    }

    pub async fn inquiry_summary(&self, window: &ReportWindow) -> AppResult<InquirySummary> {
        let snapshot = self.storage.snapshot().await?;
        let summary = summarize_inquiries(&snapshot, window).await?;
        snapshot.close().await?;
        debug!(total = summary.total, "Inquiry summary computed");
        Ok(summary)
    }

    pub async fn case_study_summary(&self, window: &ReportWindow) -> AppResult<CaseStudySummary> {
        let snapshot = self.storage.snapshot().await?;
        let summary = summarize_case_studies(&snapshot, window).await?;
        snapshot.close().await?;
        debug!(total = summary.total, "Case study summary computed");
        Ok(summary)
    }

    pub async fn testimonial_summary(
        &self,
        window: &ReportWindow,
    ) -> AppResult<TestimonialSummary> {
        let snapshot = self.storage.snapshot().await?;
        let summary = summarize_testimonials(&snapshot, window).await?;
        snapshot.close().await?;
        debug!(total = summary.total, "Testimonial summary computed");
        Ok(summary)
    }

    pub async fn system_stats(&self, window: &ReportWindow) -> AppResult<SystemStats> {
        let snapshot = self.storage.snapshot().await?;
        let stats = collect_system_stats(&snapshot, window).await?;
        snapshot.close().await?;
        Ok(stats)
    }

    /// Inquiry status breakdown with every status present, zero-filled.
    pub async fn inquiry_status_counts(&self) -> AppResult<Vec<GroupCount>> {
        let counted = self
            .storage
            .group_count::<Inquiry>(InquiryField::Status, &RecordQuery::all())
            .await?;
        Ok(zero_fill(&counted, InquiryStatus::ALL.iter().map(|s| s.as_str())))
    }

    /// Case-study status breakdown with every status present, zero-filled.
    pub async fn case_study_status_counts(&self) -> AppResult<Vec<GroupCount>> {
        let counted = self
            .storage
            .group_count::<CaseStudy>(CaseStudyField::Status, &RecordQuery::all())
            .await?;
        Ok(zero_fill(
            &counted,
            CaseStudyStatus::ALL.iter().map(|s| s.as_str()),
        ))
    }
}

/// One entry per domain value, in domain order; missing values count zero.
pub fn zero_fill<'a>(
    counted: &[GroupCount],
    domain: impl IntoIterator<Item = &'a str>,
) -> Vec<GroupCount> {
    domain
        .into_iter()
        .map(|value| {
            let count = counted
                .iter()
                .find(|group| group.value == value)
                .map_or(0, |group| group.count);
            GroupCount::new(value, count)
        })
        .collect()
}

/// Dense month-by-month series ending at the window's current month.
pub fn zero_fill_months(
    window: &ReportWindow,
    counted: &[MonthlyCount],
) -> Vec<MonthlyCount> {
    let local = window.now.with_timezone(&window.utc_offset);
    let current = local.year() * 12 + local.month0() as i32;

    (0..SERIES_MONTHS as i32)
        .rev()
        .map(|back| {
            let index = current - back;
            let (year, month) = (index.div_euclid(12), index.rem_euclid(12) as u32 + 1);
            let count = counted
                .iter()
                .find(|m| m.year == year && m.month == month)
                .map_or(0, |m| m.count);
            MonthlyCount { year, month, count }
        })
        .collect()
}
