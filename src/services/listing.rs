//! Paginated, filtered listings.
//!
//! Every listing counts and fetches inside one read snapshot, so a page's
//! `total_count` always agrees with the items it was cut from.

use serde::Serialize;
use tracing::debug;

use super::params::{self, FilterParam, PageRequest, Params};
use crate::config::ListingConfig;
use crate::error::{AppError, AppResult};
use crate::storage::{
    CaseStudy, CaseStudyField, CaseStudyFilter, Record, RecordQuery, RecordReader, RecordStore,
    SqliteStorage, Testimonial, TestimonialFilter,
};

/// Default page size of the public case-study listing.
pub const PUBLIC_CASE_STUDY_PAGE_SIZE: u32 = 12;
/// Default page size of the public testimonial listing.
pub const PUBLIC_TESTIMONIAL_PAGE_SIZE: u32 = 10;
/// Maximum number of records returned by the featured shortcuts.
pub const FEATURED_LIMIT: u64 = 6;
/// Maximum number of tags in the case-study catalog.
pub const CATALOG_TAG_LIMIT: u64 = 20;

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page_count: u64,
    pub current_page: u64,
    pub page_size: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: u64, request: PageRequest) -> Self {
        Self {
            items,
            total_count,
            page_count: total_count.div_ceil(request.page_size),
            current_page: request.page,
            page_size: request.page_size,
        }
    }
}

/// Distinct values available to the public case-study filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CaseStudyCatalog {
    pub categories: Vec<String>,
    pub types: Vec<String>,
    pub tags: Vec<String>,
}

/// Run one page of a listing against any reader.
pub async fn fetch_page<R, S>(
    reader: &S,
    query: &RecordQuery<R::Filter>,
    request: PageRequest,
) -> AppResult<Page<R>>
where
    R: Record,
    S: RecordReader,
{
    let total_count = reader.count::<R>(query).await?;
    let items = reader
        .find_many::<R>(query, request.offset(), request.page_size)
        .await?;
    Ok(Page::new(items, total_count, request))
}

/// Listing service for admin and public read paths.
#[derive(Clone)]
pub struct ListingService {
    storage: SqliteStorage,
    config: ListingConfig,
}

impl ListingService {
    pub fn new(storage: SqliteStorage, config: ListingConfig) -> Self {
        Self { storage, config }
    }

    /// One page of records matching a typed query.
    pub async fn list<R: Record>(
        &self,
        query: &RecordQuery<R::Filter>,
        request: PageRequest,
    ) -> AppResult<Page<R>> {
        let snapshot = self.storage.snapshot().await?;
        let page = fetch_page::<R, _>(&snapshot, query, request).await?;
        snapshot.close().await?;

        debug!(
            entity = R::ENTITY,
            total = page.total_count,
            page = page.current_page,
            returned = page.items.len(),
            "Listing fetched"
        );
        Ok(page)
    }

    /// One page of records, with filters, search, and paging read from raw parameters.
    pub async fn list_from_params<R>(&self, params: &Params) -> AppResult<Page<R>>
    where
        R: Record,
        R::Filter: FilterParam,
    {
        let query = params::record_query::<R::Filter>(params)?;
        let request = params::page_request(
            params,
            self.config.default_page_size,
            self.config.max_page_size,
        )?;
        self.list::<R>(&query, request).await
    }

    /// The newest `limit` records of one kind.
    pub async fn recent<R: Record>(&self, limit: u64) -> AppResult<Vec<R>> {
        let page = self
            .list::<R>(&RecordQuery::all(), PageRequest::first(limit))
            .await?;
        Ok(page.items)
    }

    /// Public case-study listing; non-public records are never returned.
    pub async fn list_public_case_studies(&self, params: &Params) -> AppResult<Page<CaseStudy>> {
        let query = public_only(
            params::record_query::<CaseStudyFilter>(params)?,
            |f| matches!(f, CaseStudyFilter::Public(_)),
            CaseStudyFilter::Public(true),
        );
        let request = params::page_request(
            params,
            PUBLIC_CASE_STUDY_PAGE_SIZE,
            self.config.max_page_size,
        )?;
        self.list::<CaseStudy>(&query, request).await
    }

    /// Public testimonial listing; non-public records are never returned.
    pub async fn list_public_testimonials(&self, params: &Params) -> AppResult<Page<Testimonial>> {
        let query = public_only(
            params::record_query::<TestimonialFilter>(params)?,
            |f| matches!(f, TestimonialFilter::Public(_)),
            TestimonialFilter::Public(true),
        );
        let request = params::page_request(
            params,
            PUBLIC_TESTIMONIAL_PAGE_SIZE,
            self.config.max_page_size,
        )?;
        self.list::<Testimonial>(&query, request).await
    }

    /// Newest public featured case studies.
    pub async fn featured_case_studies(&self) -> AppResult<Vec<CaseStudy>> {
        let query = RecordQuery::all()
            .with_filter(CaseStudyFilter::Featured(true))
            .with_filter(CaseStudyFilter::Public(true));
        let page = self
            .list::<CaseStudy>(&query, PageRequest::first(FEATURED_LIMIT))
            .await?;
        Ok(page.items)
    }

    /// Newest public featured testimonials.
    pub async fn featured_testimonials(&self) -> AppResult<Vec<Testimonial>> {
        let query = RecordQuery::all()
            .with_filter(TestimonialFilter::Featured(true))
            .with_filter(TestimonialFilter::Public(true));
        let page = self
            .list::<Testimonial>(&query, PageRequest::first(FEATURED_LIMIT))
            .await?;
        Ok(page.items)
    }

    /// A public case study by id. Non-public records read as not found.
    pub async fn get_public_case_study(&self, id: &str) -> AppResult<CaseStudy> {
        match self.storage.find_by_id::<CaseStudy>(id).await? {
            Some(study) if study.is_public => Ok(study),
            _ => Err(not_found::<CaseStudy>(id)),
        }
    }

    /// A public testimonial by id. Non-public records read as not found.
    pub async fn get_public_testimonial(&self, id: &str) -> AppResult<Testimonial> {
        match self.storage.find_by_id::<Testimonial>(id).await? {
            Some(testimonial) if testimonial.is_public => Ok(testimonial),
            _ => Err(not_found::<Testimonial>(id)),
        }
    }

    /// Categories, types, and tags in use across public case studies.
    pub async fn case_study_catalog(&self) -> AppResult<CaseStudyCatalog> {
        let query = RecordQuery::all().with_filter(CaseStudyFilter::Public(true));

        let snapshot = self.storage.snapshot().await?;
        let categories = snapshot
            .distinct_values::<CaseStudy>(CaseStudyField::Category, &query)
            .await?;
        let types = snapshot
            .distinct_values::<CaseStudy>(CaseStudyField::Platform, &query)
            .await?;
        let tags = snapshot.case_study_tags(&query, CATALOG_TAG_LIMIT).await?;
        snapshot.close().await?;

        Ok(CaseStudyCatalog {
            categories,
            types,
            tags,
        })
    }
}

/// Replace any caller-supplied visibility filter with `public`.
fn public_only<F>(
    mut query: RecordQuery<F>,
    is_visibility: impl Fn(&F) -> bool,
    public: F,
) -> RecordQuery<F> {
    query.filters.retain(|f| !is_visibility(f));
    query.filters.push(public);
    query
}

pub(crate) fn not_found<R: Record>(id: &str) -> AppError {
    AppError::NotFound {
        entity: R::ENTITY,
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count_rounds_up() {
        let page: Page<()> = Page::new(vec![], 5, PageRequest::new(2, 2));
        assert_eq!(page.page_count, 3);
        assert_eq!(page.current_page, 2);
        assert_eq!(page.page_size, 2);

        let empty: Page<()> = Page::new(vec![], 0, PageRequest::first(20));
        assert_eq!(empty.page_count, 0);
    }

    #[test]
    fn test_public_only_overrides_caller_visibility() {
        let query = RecordQuery::all()
            .with_filter(CaseStudyFilter::Public(false))
            .with_filter(CaseStudyFilter::Featured(true));
        let query = public_only(
            query,
            |f| matches!(f, CaseStudyFilter::Public(_)),
            CaseStudyFilter::Public(true),
        );
        assert_eq!(
            query.filters,
            vec![
                CaseStudyFilter::Featured(true),
                CaseStudyFilter::Public(true)
            ]
        );
    }
}
