use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
};
use sqlx::{QueryBuilder, Row, Sqlite, Transaction};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    CaseStudy, CaseStudyField, CaseStudyFilter, CaseStudyPatch, Clock, FieldFilter, GroupCount,
    GroupField, Inquiry, InquiryField, InquiryFilter, InquiryPatch, InquiryStatus, MonthlyCount,
    NewCaseStudy, NewInquiry, NewRecord, NewTestimonial, Priority, Rating, RatingStats, Record,
    RecordPatch, Reference, RecordQuery, RecordReader, RecordStore, SqlValue, SystemClock, Testimonial,
    TestimonialField, TestimonialFilter, TestimonialPatch, span_days,
};
use crate::config::DatabaseConfig;
use crate::error::{StorageError, StorageResult};

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed record store
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqliteStorage {
    /// Create a new SQLite storage instance
    pub async fn new(config: &DatabaseConfig) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        Self::from_pool(pool).await
    }

    /// Create an in-memory database, mainly for tests.
    ///
    /// The pool holds exactly one connection that is never recycled, since
    /// an in-memory database lives only as long as its connection.
    pub async fn new_in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
            StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            }
        })?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to open in-memory database: {}", e),
            })?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> StorageResult<Self> {
        let storage = Self {
            pool,
            clock: Arc::new(SystemClock),
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Replace the clock used for `created_at` / `updated_at`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Clock used for record timestamps.
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Run database migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> StorageResult<()> {
        info!("Running database migrations...");

        MIGRATOR.run(&self.pool).await.map_err(|e| StorageError::Migration {
            message: format!("Failed to run migrations: {}", e),
        })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

}

/// A read transaction over the store.
///
/// Every read made through one snapshot sees the same committed state.
/// Dropping it rolls the transaction back.
pub struct SqliteSnapshot {
    tx: Mutex<Transaction<'static, Sqlite>>,
}

impl SqliteSnapshot {
    /// End the read transaction.
    pub async fn close(self) -> StorageResult<()> {
        self.tx.into_inner().rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl RecordReader for SqliteStorage {
    async fn count<R: Record>(&self, query: &RecordQuery<R::Filter>) -> StorageResult<u64> {
        let mut conn = self.pool.acquire().await?;
        count_on::<R>(&mut conn, query).await
    }

    async fn find_many<R: Record>(
        &self,
        query: &RecordQuery<R::Filter>,
        offset: u64,
        limit: u64,
    ) -> StorageResult<Vec<R>> {
        let mut conn = self.pool.acquire().await?;
        find_many_on::<R>(&mut conn, query, offset, limit).await
    }

    async fn group_count<R: Record>(
        &self,
        field: R::Field,
        query: &RecordQuery<R::Filter>,
    ) -> StorageResult<Vec<GroupCount>> {
        let mut conn = self.pool.acquire().await?;
        group_count_on::<R>(&mut conn, field, query).await
    }

    async fn monthly_counts<R: Record>(
        &self,
        query: &RecordQuery<R::Filter>,
        utc_offset: FixedOffset,
    ) -> StorageResult<Vec<MonthlyCount>> {
        let mut conn = self.pool.acquire().await?;
        monthly_counts_on::<R>(&mut conn, query, utc_offset).await
    }

    async fn distinct_values<R: Record>(
        &self,
        field: R::Field,
        query: &RecordQuery<R::Filter>,
    ) -> StorageResult<Vec<String>> {
        let mut conn = self.pool.acquire().await?;
        distinct_values_on::<R>(&mut conn, field, query).await
    }

    async fn find_by_id<R: Record>(&self, id: &str) -> StorageResult<Option<R>> {
        let mut conn = self.pool.acquire().await?;
        find_by_id_on::<R>(&mut conn, id).await
    }

    async fn rating_stats(
        &self,
        query: &RecordQuery<TestimonialFilter>,
    ) -> StorageResult<RatingStats> {
        let mut conn = self.pool.acquire().await?;
        rating_stats_on(&mut conn, query).await
    }

    async fn case_study_tags(
        &self,
        query: &RecordQuery<CaseStudyFilter>,
        limit: u64,
    ) -> StorageResult<Vec<String>> {
        let mut conn = self.pool.acquire().await?;
        case_study_tags_on(&mut conn, query, limit).await
    }
}

#[async_trait]
impl RecordReader for SqliteSnapshot {
    async fn count<R: Record>(&self, query: &RecordQuery<R::Filter>) -> StorageResult<u64> {
        let mut tx = self.tx.lock().await;
        count_on::<R>(&mut tx, query).await
    }

    async fn find_many<R: Record>(
        &self,
        query: &RecordQuery<R::Filter>,
        offset: u64,
        limit: u64,
    ) -> StorageResult<Vec<R>> {
        let mut tx = self.tx.lock().await;
        find_many_on::<R>(&mut tx, query, offset, limit).await
    }

    async fn group_count<R: Record>(
        &self,
        field: R::Field,
        query: &RecordQuery<R::Filter>,
    ) -> StorageResult<Vec<GroupCount>> {
        let mut tx = self.tx.lock().await;
        group_count_on::<R>(&mut tx, field, query).await
    }

    async fn monthly_counts<R: Record>(
        &self,
        query: &RecordQuery<R::Filter>,
        utc_offset: FixedOffset,
    ) -> StorageResult<Vec<MonthlyCount>> {
        let mut tx = self.tx.lock().await;
        monthly_counts_on::<R>(&mut tx, query, utc_offset).await
    }

    async fn distinct_values<R: Record>(
        &self,
        field: R::Field,
        query: &RecordQuery<R::Filter>,
    ) -> StorageResult<Vec<String>> {
        let mut tx = self.tx.lock().await;
        distinct_values_on::<R>(&mut tx, field, query).await
    }

    async fn find_by_id<R: Record>(&self, id: &str) -> StorageResult<Option<R>> {
        let mut tx = self.tx.lock().await;
        find_by_id_on::<R>(&mut tx, id).await
    }

    async fn rating_stats(
        &self,
        query: &RecordQuery<TestimonialFilter>,
    ) -> StorageResult<RatingStats> {
        let mut tx = self.tx.lock().await;
        rating_stats_on(&mut tx, query).await
    }

    async fn case_study_tags(
        &self,
        query: &RecordQuery<CaseStudyFilter>,
        limit: u64,
    ) -> StorageResult<Vec<String>> {
        let mut tx = self.tx.lock().await;
        case_study_tags_on(&mut tx, query, limit).await
    }
}

#[async_trait]
impl RecordStore for SqliteStorage {
    type Snapshot = SqliteSnapshot;

    async fn snapshot(&self) -> StorageResult<SqliteSnapshot> {
        let tx = self.pool.begin().await?;
        Ok(SqliteSnapshot { tx: Mutex::new(tx) })
    }

    async fn insert<N: NewRecord>(&self, record: &N) -> StorageResult<N::Output> {
        let table = <N::Output as Record>::TABLE;
        let id = Uuid::new_v4().to_string();
        let now = encode_timestamp(self.clock.now());
        let values = record.values();

        let mut builder = QueryBuilder::<Sqlite>::new(format!("INSERT INTO {} (id", table));
        for (column, _) in &values {
            builder.push(", ").push(*column);
        }
        builder.push(", created_at, updated_at) VALUES (");
        builder.push_bind(id.clone());
        for (_, value) in values {
            builder.push(", ");
            push_value(&mut builder, value);
        }
        builder.push(", ").push_bind(now.clone());
        builder.push(", ").push_bind(now);
        builder.push(")");

        // The INSERT takes the write lock, so a referenced row seen below
        // cannot be deleted before this transaction commits.
        let mut tx = self.pool.begin().await?;
        builder.build().execute(&mut *tx).await?;

        for reference in record.references() {
            let sql = format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?)",
                reference.table
            );
            let exists: i64 = sqlx::query_scalar(&sql)
                .bind(reference.id)
                .fetch_one(&mut *tx)
                .await?;
            if exists == 0 {
                tx.rollback().await?;
                return Err(StorageError::MissingReference {
                    column: reference.column,
                    id: reference.id.to_string(),
                });
            }
        }

        refresh_search_text::<N::Output>(&mut tx, &id).await?;
        let created = find_by_id_on::<N::Output>(&mut tx, &id)
            .await?
            .ok_or_else(|| StorageError::Query {
                message: format!("{} row {} missing after insert", table, id),
            })?;
        tx.commit().await?;

        debug!(table, id = %id, "Record inserted");
        Ok(created)
    }

    async fn update<R: Record>(&self, id: &str, patch: &R::Patch) -> StorageResult<Option<R>> {
        let assignments = patch.assignments();
        if assignments.is_empty() {
            return self.find_by_id::<R>(id).await;
        }
        let touches_search = assignments
            .iter()
            .any(|(column, _)| R::SEARCH_COLUMNS.contains(column));

        // The UPDATE takes the write lock first, so the re-read below cannot
        // observe another writer's change.
        let mut tx = self.pool.begin().await?;

        let mut builder = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET ", R::TABLE));
        for (column, value) in assignments {
            builder.push(column).push(" = ");
            push_value(&mut builder, value);
            builder.push(", ");
        }
        builder
            .push("updated_at = ")
            .push_bind(encode_timestamp(self.clock.now()));
        builder.push(" WHERE id = ").push_bind(id.to_string());

        let result = builder.build().execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }
        if touches_search {
            refresh_search_text::<R>(&mut tx, id).await?;
        }

        let updated = find_by_id_on::<R>(&mut tx, id).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn delete<R: Record>(&self, id: &str) -> StorageResult<bool> {
        let now = encode_timestamp(self.clock.now());
        let mut tx = self.pool.begin().await?;

        for (table, column) in R::DETACH_ON_DELETE {
            let sql = format!(
                "UPDATE {} SET {} = NULL, updated_at = ? WHERE {} = ?",
                table, column, column
            );
            let detached = sqlx::query(&sql)
                .bind(now.as_str())
                .bind(id)
                .execute(&mut *tx)
                .await?;
            debug!(table, rows = detached.rows_affected(), "Detached references");
        }

        let sql = format!("DELETE FROM {} WHERE id = ?", R::TABLE);
        let result = sqlx::query(&sql).bind(id).execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }
}

// ============================================================================
// Query building
// ============================================================================

/// Fixed-width UTC encoding; stored timestamps compare correctly as text.
pub(crate) fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn push_value(builder: &mut QueryBuilder<'_, Sqlite>, value: SqlValue) {
    match value {
        SqlValue::Null => builder.push_bind(Option::<String>::None),
        SqlValue::Text(text) => builder.push_bind(text),
        SqlValue::Integer(number) => builder.push_bind(number),
        SqlValue::Bool(flag) => builder.push_bind(flag),
    };
}

/// Separates fields in the search column so a match cannot span two of them.
const SEARCH_SEPARATOR: &str = "\u{1f}";

/// Lowercased search text for a record's searchable fields.
///
/// SQLite's `LIKE` folds ASCII case only, so both sides are lowercased here
/// with full Unicode rules.
fn search_text<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    fields
        .into_iter()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(SEARCH_SEPARATOR)
}

/// Rebuild the `search_text` column of one row from its current text fields.
async fn refresh_search_text<R: Record>(
    conn: &mut SqliteConnection,
    id: &str,
) -> StorageResult<()> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = ?",
        R::SEARCH_COLUMNS.join(", "),
        R::TABLE
    );
    let row = match sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await? {
        Some(row) => row,
        None => return Ok(()),
    };

    let mut fields = Vec::with_capacity(R::SEARCH_COLUMNS.len());
    for index in 0..R::SEARCH_COLUMNS.len() {
        let value: Option<String> = row.try_get(index)?;
        fields.extend(value);
    }

    let sql = format!("UPDATE {} SET search_text = ? WHERE id = ?", R::TABLE);
    sqlx::query(&sql)
        .bind(search_text(fields.iter().map(String::as_str)))
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Escape LIKE wildcards so the search term matches literally.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// Append `WHERE` for filters (AND), search, and time bound.
fn push_conditions<F: FieldFilter>(
    builder: &mut QueryBuilder<'_, Sqlite>,
    query: &RecordQuery<F>,
) {
    builder.push(" WHERE 1 = 1");

    for filter in &query.filters {
        builder.push(" AND ").push(filter.column()).push(" = ");
        push_value(builder, filter.value());
    }

    if let Some(term) = query.search_term() {
        builder
            .push(" AND search_text LIKE ")
            .push_bind(like_pattern(&term.to_lowercase()))
            .push(" ESCAPE '\\'");
    }

    if let Some(since) = query.created_since {
        builder
            .push(" AND created_at >= ")
            .push_bind(encode_timestamp(since));
    }
}

fn to_count(raw: i64) -> u64 {
    u64::try_from(raw).unwrap_or(0)
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

async fn count_on<R: Record>(
    conn: &mut SqliteConnection,
    query: &RecordQuery<R::Filter>,
) -> StorageResult<u64> {
    let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) FROM {}", R::TABLE));
    push_conditions(&mut builder, query);

    let count: i64 = builder.build_query_scalar().fetch_one(&mut *conn).await?;
    Ok(to_count(count))
}

async fn find_many_on<R: Record>(
    conn: &mut SqliteConnection,
    query: &RecordQuery<R::Filter>,
    offset: u64,
    limit: u64,
) -> StorageResult<Vec<R>> {
    let mut builder =
        QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM {}", R::COLUMNS, R::TABLE));
    push_conditions(&mut builder, query);
    builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
    builder.push_bind(to_sql_int(limit));
    builder.push(" OFFSET ");
    builder.push_bind(to_sql_int(offset));

    let rows: Vec<R::Row> = builder.build_query_as().fetch_all(&mut *conn).await?;
    rows.into_iter().map(R::from_row).collect()
}

async fn group_count_on<R: Record>(
    conn: &mut SqliteConnection,
    field: R::Field,
    query: &RecordQuery<R::Filter>,
) -> StorageResult<Vec<GroupCount>> {
    let column = field.column();
    let mut builder = QueryBuilder::<Sqlite>::new(format!(
        "SELECT CAST({} AS TEXT) AS value, COUNT(*) AS count FROM {}",
        column,
        R::TABLE
    ));
    push_conditions(&mut builder, query);
    builder.push(format!(" GROUP BY {} ORDER BY count DESC, value ASC", column));

    let rows: Vec<(String, i64)> = builder.build_query_as().fetch_all(&mut *conn).await?;
    Ok(rows
        .into_iter()
        .map(|(value, count)| GroupCount::new(value, to_count(count)))
        .collect())
}

async fn monthly_counts_on<R: Record>(
    conn: &mut SqliteConnection,
    query: &RecordQuery<R::Filter>,
    utc_offset: FixedOffset,
) -> StorageResult<Vec<MonthlyCount>> {
    // SQLite date modifier shifting stored UTC into the reporting offset.
    let modifier = format!("{:+} minutes", utc_offset.local_minus_utc() / 60);

    let mut builder = QueryBuilder::<Sqlite>::new("SELECT CAST(strftime('%Y', created_at, ");
    builder.push_bind(modifier.clone());
    builder.push(") AS INTEGER) AS year, CAST(strftime('%m', created_at, ");
    builder.push_bind(modifier);
    builder.push(format!(
        ") AS INTEGER) AS month, COUNT(*) AS count FROM {}",
        R::TABLE
    ));
    push_conditions(&mut builder, query);
    builder.push(" GROUP BY year, month ORDER BY year ASC, month ASC");

    let rows: Vec<(i64, i64, i64)> = builder.build_query_as().fetch_all(&mut *conn).await?;
    rows.into_iter()
        .map(|(year, month, count)| {
            let year = i32::try_from(year).map_err(|_| StorageError::Query {
                message: format!("year out of range: {}", year),
            })?;
            let month = u32::try_from(month)
                .ok()
                .filter(|m| (1..=12).contains(m))
                .ok_or_else(|| StorageError::Query {
                    message: format!("month out of range: {}", month),
                })?;
            Ok(MonthlyCount {
                year,
                month,
                count: to_count(count),
            })
        })
        .collect()
}

async fn distinct_values_on<R: Record>(
    conn: &mut SqliteConnection,
    field: R::Field,
    query: &RecordQuery<R::Filter>,
) -> StorageResult<Vec<String>> {
    let mut builder = QueryBuilder::<Sqlite>::new(format!(
        "SELECT DISTINCT CAST({} AS TEXT) AS value FROM {}",
        field.column(),
        R::TABLE
    ));
    push_conditions(&mut builder, query);
    builder.push(" ORDER BY value ASC");

    let values: Vec<String> = builder.build_query_scalar().fetch_all(&mut *conn).await?;
    Ok(values)
}

async fn find_by_id_on<R: Record>(
    conn: &mut SqliteConnection,
    id: &str,
) -> StorageResult<Option<R>> {
    let sql = format!("SELECT {} FROM {} WHERE id = ?", R::COLUMNS, R::TABLE);
    let row = sqlx::query_as::<_, R::Row>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(R::from_row).transpose()
}

async fn rating_stats_on(
    conn: &mut SqliteConnection,
    query: &RecordQuery<TestimonialFilter>,
) -> StorageResult<RatingStats> {
    let mut builder = QueryBuilder::<Sqlite>::new(format!(
        "SELECT AVG(rating), COUNT(rating) FROM {}",
        Testimonial::TABLE
    ));
    push_conditions(&mut builder, query);

    let (average, total): (Option<f64>, i64) =
        builder.build_query_as().fetch_one(&mut *conn).await?;
    Ok(RatingStats {
        average,
        total: to_count(total),
    })
}

async fn case_study_tags_on(
    conn: &mut SqliteConnection,
    query: &RecordQuery<CaseStudyFilter>,
    limit: u64,
) -> StorageResult<Vec<String>> {
    let mut builder = QueryBuilder::<Sqlite>::new(format!(
        "SELECT DISTINCT tag.value FROM {table}, json_each({table}.tags) AS tag",
        table = CaseStudy::TABLE
    ));
    push_conditions(&mut builder, query);
    builder.push(" AND tag.value <> '' ORDER BY tag.value ASC LIMIT ");
    builder.push_bind(to_sql_int(limit));

    let tags: Vec<String> = builder.build_query_scalar().fetch_all(&mut *conn).await?;
    Ok(tags)
}

// ============================================================================
// Row decoding
// ============================================================================

/// Decodes stored text columns, reporting failures against the row's id.
struct RowDecoder<'a> {
    table: &'static str,
    id: &'a str,
}

impl<'a> RowDecoder<'a> {
    fn new(table: &'static str, id: &'a str) -> Self {
        Self { table, id }
    }

    fn corrupt(&self, message: impl Into<String>) -> StorageError {
        StorageError::Corrupt {
            table: self.table,
            id: self.id.to_string(),
            message: message.into(),
        }
    }

    fn parse<T: FromStr<Err = String>>(&self, raw: &str) -> StorageResult<T> {
        raw.parse().map_err(|e: String| self.corrupt(e))
    }

    fn parse_opt<T: FromStr<Err = String>>(&self, raw: Option<&str>) -> StorageResult<Option<T>> {
        raw.map(|value| self.parse(value)).transpose()
    }

    fn timestamp(&self, raw: &str) -> StorageResult<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| self.corrupt(format!("bad timestamp '{}': {}", raw, e)))
    }

    fn date(&self, raw: Option<&str>) -> StorageResult<Option<NaiveDate>> {
        raw.map(|value| {
            value
                .parse::<NaiveDate>()
                .map_err(|e| self.corrupt(format!("bad date '{}': {}", value, e)))
        })
        .transpose()
    }

    fn json<T: DeserializeOwned>(&self, raw: &str) -> StorageResult<T> {
        serde_json::from_str(raw).map_err(|e| self.corrupt(format!("bad JSON: {}", e)))
    }

    fn json_opt<T: DeserializeOwned>(&self, raw: Option<&str>) -> StorageResult<Option<T>> {
        raw.map(|value| self.json(value)).transpose()
    }

    fn rating(&self, raw: i64) -> StorageResult<Rating> {
        Rating::new(raw).map_err(|e| self.corrupt(e))
    }
}

fn date_value(date: Option<NaiveDate>) -> SqlValue {
    SqlValue::from(date.map(|d| d.to_string()))
}

// ============================================================================
// Inquiry mapping
// ============================================================================

#[derive(sqlx::FromRow)]
pub struct InquiryRow {
    id: String,
    name: String,
    email: String,
    phone: Option<String>,
    company: Option<String>,
    project_type: String,
    budget: Option<String>,
    timeline: Option<String>,
    message: String,
    status: String,
    priority: String,
    source: String,
    assigned_to: Option<String>,
    notes: Option<String>,
    follow_up_date: Option<String>,
    created_at: String,
    updated_at: String,
}

impl Record for Inquiry {
    type Row = InquiryRow;
    type Filter = InquiryFilter;
    type Field = InquiryField;
    type Patch = InquiryPatch;

    const ENTITY: &'static str = "Inquiry";
    const TABLE: &'static str = "inquiries";
    const COLUMNS: &'static str = "id, name, email, phone, company, project_type, budget, \
        timeline, message, status, priority, source, assigned_to, notes, follow_up_date, \
        created_at, updated_at";
    const SEARCH_COLUMNS: &'static [&'static str] = &["name", "email", "company"];

    fn from_row(row: InquiryRow) -> StorageResult<Self> {
        let d = RowDecoder::new(Self::TABLE, &row.id);
        Ok(Self {
            project_type: d.parse(&row.project_type)?,
            budget: d.parse_opt(row.budget.as_deref())?,
            timeline: d.parse_opt(row.timeline.as_deref())?,
            status: d.parse(&row.status)?,
            priority: d.parse(&row.priority)?,
            source: d.parse(&row.source)?,
            follow_up_date: d.date(row.follow_up_date.as_deref())?,
            created_at: d.timestamp(&row.created_at)?,
            updated_at: d.timestamp(&row.updated_at)?,
            name: row.name,
            email: row.email,
            phone: row.phone,
            company: row.company,
            message: row.message,
            assigned_to: row.assigned_to,
            notes: row.notes,
            id: row.id,
        })
    }

    fn id(&self) -> &str {
        &self.id
    }
}

impl FieldFilter for InquiryFilter {
    fn column(&self) -> &'static str {
        match self {
            InquiryFilter::Status(_) => "status",
            InquiryFilter::Priority(_) => "priority",
            InquiryFilter::ProjectType(_) => "project_type",
        }
    }

    fn value(&self) -> SqlValue {
        match self {
            InquiryFilter::Status(status) => (*status).into(),
            InquiryFilter::Priority(priority) => (*priority).into(),
            InquiryFilter::ProjectType(project_type) => (*project_type).into(),
        }
    }
}

impl GroupField for InquiryField {
    fn column(self) -> &'static str {
        match self {
            InquiryField::Status => "status",
            InquiryField::ProjectType => "project_type",
        }
    }
}

impl RecordPatch for InquiryPatch {
    fn assignments(&self) -> Vec<(&'static str, SqlValue)> {
        let mut out = Vec::new();
        if let Some(status) = self.status {
            out.push(("status", status.into()));
        }
        if let Some(priority) = self.priority {
            out.push(("priority", priority.into()));
        }
        if let Some(notes) = &self.notes {
            out.push(("notes", SqlValue::Text(notes.clone())));
        }
        if let Some(date) = self.follow_up_date {
            out.push(("follow_up_date", date_value(Some(date))));
        }
        if let Some(assignee) = &self.assigned_to {
            out.push(("assigned_to", SqlValue::Text(assignee.clone())));
        }
        out
    }
}

impl NewRecord for NewInquiry {
    type Output = Inquiry;

    fn values(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("name", SqlValue::Text(self.name.clone())),
            ("email", SqlValue::Text(self.email.clone())),
            ("phone", self.phone.clone().into()),
            ("company", self.company.clone().into()),
            ("project_type", self.project_type.into()),
            ("budget", self.budget.into()),
            ("timeline", self.timeline.into()),
            ("message", SqlValue::Text(self.message.clone())),
            ("status", InquiryStatus::New.into()),
            ("priority", Priority::Medium.into()),
            ("source", self.source.into()),
        ]
    }
}

// ============================================================================
// Case study mapping
// ============================================================================

#[derive(sqlx::FromRow)]
pub struct CaseStudyRow {
    id: String,
    title: String,
    description: String,
    category: String,
    platform_type: String,
    tech_stack: String,
    images: String,
    links: Option<String>,
    client_name: Option<String>,
    client_company: Option<String>,
    client_industry: Option<String>,
    status: String,
    featured: bool,
    is_public: bool,
    start_date: Option<String>,
    end_date: Option<String>,
    budget: Option<String>,
    results: Option<String>,
    tags: String,
    created_at: String,
    updated_at: String,
}

impl Record for CaseStudy {
    type Row = CaseStudyRow;
    type Filter = CaseStudyFilter;
    type Field = CaseStudyField;
    type Patch = CaseStudyPatch;

    const ENTITY: &'static str = "Case study";
    const TABLE: &'static str = "case_studies";
    const COLUMNS: &'static str = "id, title, description, category, platform_type, tech_stack, \
        images, links, client_name, client_company, client_industry, status, featured, \
        is_public, start_date, end_date, budget, results, tags, created_at, updated_at";
    const SEARCH_COLUMNS: &'static [&'static str] =
        &["title", "description", "client_name", "client_company"];
    const DETACH_ON_DELETE: &'static [(&'static str, &'static str)] =
        &[("testimonials", "case_study_id")];

    fn from_row(row: CaseStudyRow) -> StorageResult<Self> {
        let d = RowDecoder::new(Self::TABLE, &row.id);
        let start_date = d.date(row.start_date.as_deref())?;
        let end_date = d.date(row.end_date.as_deref())?;
        Ok(Self {
            category: d.parse(&row.category)?,
            platform: d.parse(&row.platform_type)?,
            tech_stack: d.json(&row.tech_stack)?,
            images: d.json(&row.images)?,
            links: d.json_opt(row.links.as_deref())?,
            status: d.parse(&row.status)?,
            start_date,
            end_date,
            duration_days: span_days(start_date, end_date),
            budget: d.parse_opt(row.budget.as_deref())?,
            results: d.json_opt(row.results.as_deref())?,
            tags: d.json(&row.tags)?,
            created_at: d.timestamp(&row.created_at)?,
            updated_at: d.timestamp(&row.updated_at)?,
            title: row.title,
            description: row.description,
            client_name: row.client_name,
            client_company: row.client_company,
            client_industry: row.client_industry,
            featured: row.featured,
            is_public: row.is_public,
            id: row.id,
        })
    }

    fn id(&self) -> &str {
        &self.id
    }
}

impl FieldFilter for CaseStudyFilter {
    fn column(&self) -> &'static str {
        match self {
            CaseStudyFilter::Status(_) => "status",
            CaseStudyFilter::Featured(_) => "featured",
            CaseStudyFilter::Category(_) => "category",
            CaseStudyFilter::Platform(_) => "platform_type",
            CaseStudyFilter::Public(_) => "is_public",
        }
    }

    fn value(&self) -> SqlValue {
        match self {
            CaseStudyFilter::Status(status) => (*status).into(),
            CaseStudyFilter::Featured(flag) | CaseStudyFilter::Public(flag) => (*flag).into(),
            CaseStudyFilter::Category(category) => (*category).into(),
            CaseStudyFilter::Platform(platform) => (*platform).into(),
        }
    }
}

impl GroupField for CaseStudyField {
    fn column(self) -> &'static str {
        match self {
            CaseStudyField::Status => "status",
            CaseStudyField::Category => "category",
            CaseStudyField::Platform => "platform_type",
        }
    }
}

impl RecordPatch for CaseStudyPatch {
    fn assignments(&self) -> Vec<(&'static str, SqlValue)> {
        let mut out = Vec::new();
        if let Some(title) = &self.title {
            out.push(("title", SqlValue::Text(title.clone())));
        }
        if let Some(description) = &self.description {
            out.push(("description", SqlValue::Text(description.clone())));
        }
        if let Some(category) = self.category {
            out.push(("category", category.into()));
        }
        if let Some(platform) = self.platform {
            out.push(("platform_type", platform.into()));
        }
        if let Some(status) = self.status {
            out.push(("status", status.into()));
        }
        if let Some(featured) = self.featured {
            out.push(("featured", featured.into()));
        }
        if let Some(is_public) = self.is_public {
            out.push(("is_public", is_public.into()));
        }
        if let Some(tech_stack) = &self.tech_stack {
            out.push(("tech_stack", SqlValue::json(tech_stack)));
        }
        if let Some(tags) = &self.tags {
            out.push(("tags", SqlValue::json(tags)));
        }
        out
    }
}

impl NewRecord for NewCaseStudy {
    type Output = CaseStudy;

    fn values(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("title", SqlValue::Text(self.title.clone())),
            ("description", SqlValue::Text(self.description.clone())),
            ("category", self.category.into()),
            ("platform_type", self.platform.into()),
            ("tech_stack", SqlValue::json(&self.tech_stack)),
            ("images", SqlValue::json(&self.images)),
            (
                "links",
                self.links.as_ref().map_or(SqlValue::Null, SqlValue::json),
            ),
            ("client_name", self.client_name.clone().into()),
            ("client_company", self.client_company.clone().into()),
            ("client_industry", self.client_industry.clone().into()),
            ("status", self.status.into()),
            ("featured", self.featured.into()),
            ("is_public", self.is_public.into()),
            ("start_date", date_value(self.start_date)),
            ("end_date", date_value(self.end_date)),
            ("budget", self.budget.into()),
            (
                "results",
                self.results.as_ref().map_or(SqlValue::Null, SqlValue::json),
            ),
            ("tags", SqlValue::json(&self.tags)),
        ]
    }
}

// ============================================================================
// Testimonial mapping
// ============================================================================

#[derive(sqlx::FromRow)]
pub struct TestimonialRow {
    id: String,
    name: String,
    title: Option<String>,
    company: Option<String>,
    review: String,
    rating: i64,
    featured: bool,
    is_public: bool,
    verified: bool,
    case_study_id: Option<String>,
    created_at: String,
    updated_at: String,
}

impl Record for Testimonial {
    type Row = TestimonialRow;
    type Filter = TestimonialFilter;
    type Field = TestimonialField;
    type Patch = TestimonialPatch;

    const ENTITY: &'static str = "Testimonial";
    const TABLE: &'static str = "testimonials";
    const COLUMNS: &'static str = "id, name, title, company, review, rating, featured, \
        is_public, verified, case_study_id, created_at, updated_at";
    const SEARCH_COLUMNS: &'static [&'static str] = &["name", "company", "review"];

    fn from_row(row: TestimonialRow) -> StorageResult<Self> {
        let d = RowDecoder::new(Self::TABLE, &row.id);
        Ok(Self {
            rating: d.rating(row.rating)?,
            created_at: d.timestamp(&row.created_at)?,
            updated_at: d.timestamp(&row.updated_at)?,
            name: row.name,
            title: row.title,
            company: row.company,
            review: row.review,
            featured: row.featured,
            is_public: row.is_public,
            verified: row.verified,
            case_study_id: row.case_study_id,
            id: row.id,
        })
    }

    fn id(&self) -> &str {
        &self.id
    }
}

impl FieldFilter for TestimonialFilter {
    fn column(&self) -> &'static str {
        match self {
            TestimonialFilter::Featured(_) => "featured",
            TestimonialFilter::Verified(_) => "verified",
            TestimonialFilter::Public(_) => "is_public",
            TestimonialFilter::Rating(_) => "rating",
            TestimonialFilter::CaseStudy(_) => "case_study_id",
        }
    }

    fn value(&self) -> SqlValue {
        match self {
            TestimonialFilter::Featured(flag)
            | TestimonialFilter::Verified(flag)
            | TestimonialFilter::Public(flag) => (*flag).into(),
            TestimonialFilter::Rating(rating) => (*rating).into(),
            TestimonialFilter::CaseStudy(id) => SqlValue::Text(id.clone()),
        }
    }
}

impl GroupField for TestimonialField {
    fn column(self) -> &'static str {
        match self {
            TestimonialField::Rating => "rating",
        }
    }
}

impl RecordPatch for TestimonialPatch {
    fn assignments(&self) -> Vec<(&'static str, SqlValue)> {
        let mut out = Vec::new();
        if let Some(review) = &self.review {
            out.push(("review", SqlValue::Text(review.clone())));
        }
        if let Some(rating) = self.rating {
            out.push(("rating", rating.into()));
        }
        if let Some(featured) = self.featured {
            out.push(("featured", featured.into()));
        }
        if let Some(is_public) = self.is_public {
            out.push(("is_public", is_public.into()));
        }
        if let Some(verified) = self.verified {
            out.push(("verified", verified.into()));
        }
        out
    }
}

impl NewRecord for NewTestimonial {
    type Output = Testimonial;

    fn values(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("name", SqlValue::Text(self.name.clone())),
            ("title", self.title.clone().into()),
            ("company", self.company.clone().into()),
            ("review", SqlValue::Text(self.review.clone())),
            ("rating", self.rating.into()),
            ("featured", self.featured.into()),
            ("is_public", self.is_public.into()),
            ("verified", self.verified.into()),
            ("case_study_id", self.case_study_id.clone().into()),
        ]
    }

    fn references(&self) -> Vec<Reference<'_>> {
        self.case_study_id
            .as_deref()
            .map(|id| Reference {
                column: "case_study_id",
                table: CaseStudy::TABLE,
                id,
            })
            .into_iter()
            .collect()
    }
}
