//! Storage layer for portfolio records.
//!
//! This module provides typed, SQLite-backed access to the three record
//! collections (inquiries, case studies, testimonials). Reads go through
//! [`RecordReader`], which is implemented both by the pooled store and by a
//! read-transaction snapshot, so one report can be computed against a single
//! consistent view of the data.

mod records;
mod sqlite;


pub use records::*;
pub use sqlite::{SqliteSnapshot, SqliteStorage};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;

use crate::error::StorageResult;

/// Source of store-assigned timestamps.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A value bound into a generated SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Text(String),
    Integer(i64),
    Bool(bool),
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<Rating> for SqlValue {
    fn from(value: Rating) -> Self {
        SqlValue::Integer(i64::from(value))
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

impl SqlValue {
    /// Encode a list or nested structure as JSON text.
    pub fn json<T: Serialize>(value: &T) -> Self {
        serde_json::to_string(value).map_or(SqlValue::Null, SqlValue::Text)
    }
}

/// An exact-match predicate on one column.
pub trait FieldFilter: std::fmt::Debug + Clone + Send + Sync + 'static {
    fn column(&self) -> &'static str;
    fn value(&self) -> SqlValue;
}

/// A categorical column that can be grouped and counted.
pub trait GroupField: std::fmt::Debug + Copy + Send + Sync + 'static {
    fn column(self) -> &'static str;
}

/// A partial update expressed as column assignments.
pub trait RecordPatch: Send + Sync {
    /// Columns to overwrite, in a stable order. Absent fields are not listed.
    fn assignments(&self) -> Vec<(&'static str, SqlValue)>;
}

/// A column of a new record that must name an existing row elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference<'a> {
    pub column: &'static str,
    pub table: &'static str,
    pub id: &'a str,
}

/// Validated input for a record insert.
pub trait NewRecord: Send + Sync {
    type Output: Record;

    /// Column values, excluding the id and timestamps the store assigns.
    fn values(&self) -> Vec<(&'static str, SqlValue)>;

    /// References checked inside the insert transaction.
    fn references(&self) -> Vec<Reference<'_>> {
        Vec::new()
    }
}

/// A stored record kind and how it maps onto its table.
pub trait Record: Sized + Send + Sync + Unpin + 'static {
    type Row: for<'r> sqlx::FromRow<'r, SqliteRow> + Send + Unpin;
    type Filter: FieldFilter;
    type Field: GroupField;
    type Patch: RecordPatch;

    /// Human-readable kind name used in errors and logs.
    const ENTITY: &'static str;
    const TABLE: &'static str;
    const COLUMNS: &'static str;
    /// Text columns matched by free-text search.
    const SEARCH_COLUMNS: &'static [&'static str];
    /// `(table, column)` references to null out when a record is deleted.
    const DETACH_ON_DELETE: &'static [(&'static str, &'static str)] = &[];

    fn from_row(row: Self::Row) -> StorageResult<Self>;
    fn id(&self) -> &str;
}

/// Filters, search, and lower time bound applied to one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery<F> {
    pub filters: Vec<F>,
    pub search: Option<String>,
    pub created_since: Option<DateTime<Utc>>,
}

impl<F> Default for RecordQuery<F> {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            search: None,
            created_since: None,
        }
    }
}

impl<F> RecordQuery<F> {
    /// Query matching every record.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: F) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn created_since(mut self, since: DateTime<Utc>) -> Self {
        self.created_since = Some(since);
        self
    }

    /// Trimmed search term, or `None` when blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }
}

/// Number of records holding one value of a grouped field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCount {
    pub value: String,
    pub count: u64,
}

impl GroupCount {
    pub fn new(value: impl Into<String>, count: u64) -> Self {
        Self {
            value: value.into(),
            count,
        }
    }
}

/// Number of records created in one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonthlyCount {
    pub year: i32,
    pub month: u32,
    pub count: u64,
}

/// Mean and number of testimonial ratings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingStats {
    /// Arithmetic mean, `None` when there are no ratings.
    pub average: Option<f64>,
    pub total: u64,
}

/// Read operations shared by the pooled store and snapshots.
#[async_trait]
pub trait RecordReader: Send + Sync {
    /// Count records matching the query.
    async fn count<R: Record>(&self, query: &RecordQuery<R::Filter>) -> StorageResult<u64>;

    /// Fetch one page of matching records, newest first, ties broken by id descending.
    async fn find_many<R: Record>(
        &self,
        query: &RecordQuery<R::Filter>,
        offset: u64,
        limit: u64,
    ) -> StorageResult<Vec<R>>;

    /// Count matching records per value of `field`, largest group first.
    async fn group_count<R: Record>(
        &self,
        field: R::Field,
        query: &RecordQuery<R::Filter>,
    ) -> StorageResult<Vec<GroupCount>>;

    /// Count matching records per calendar month, ascending by (year, month).
    ///
    /// Months are taken in the given offset. Months with no records are
    /// not returned.
    async fn monthly_counts<R: Record>(
        &self,
        query: &RecordQuery<R::Filter>,
        utc_offset: FixedOffset,
    ) -> StorageResult<Vec<MonthlyCount>>;

    /// Distinct values of `field` among matching records, ascending.
    async fn distinct_values<R: Record>(
        &self,
        field: R::Field,
        query: &RecordQuery<R::Filter>,
    ) -> StorageResult<Vec<String>>;

    /// Look up one record.
    async fn find_by_id<R: Record>(&self, id: &str) -> StorageResult<Option<R>>;

    /// Rating mean and count over matching testimonials.
    async fn rating_stats(
        &self,
        query: &RecordQuery<TestimonialFilter>,
    ) -> StorageResult<RatingStats>;

    /// Distinct non-empty tags across matching case studies, ascending.
    async fn case_study_tags(
        &self,
        query: &RecordQuery<CaseStudyFilter>,
        limit: u64,
    ) -> StorageResult<Vec<String>>;
}

/// Full store: reads, writes, and snapshots.
#[async_trait]
pub trait RecordStore: RecordReader {
    type Snapshot: RecordReader;

    /// Open a read transaction; all reads through it see one consistent state.
    async fn snapshot(&self) -> StorageResult<Self::Snapshot>;

    /// Insert a record, assigning its id and timestamps.
    ///
    /// Fails with `StorageError::MissingReference` and writes nothing when a
    /// referenced row does not exist.
    async fn insert<N: NewRecord>(&self, record: &N) -> StorageResult<N::Output>;

    /// Apply a partial update. Returns `None` when the id does not exist.
    async fn update<R: Record>(&self, id: &str, patch: &R::Patch) -> StorageResult<Option<R>>;

    /// Delete a record. Returns `false` when the id does not exist.
    async fn delete<R: Record>(&self, id: &str) -> StorageResult<bool>;
}
