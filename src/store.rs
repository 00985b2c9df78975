use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::PgConnection;
use thiserror::Error;
use tokio::task;
use uuid::Uuid;

use crate::db::PgPool;
use crate::models::{Deed, DeedPatch, NewDeed};
use crate::schema::deeds;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("deed not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(diesel::result::Error),
    #[error("database pool error: {0}")]
    Pool(String),
    #[error("store task failed: {0}")]
    Task(String),
}

impl From<diesel::result::Error> for StoreError {
    fn from(value: diesel::result::Error) -> Self {
        match value {
            diesel::result::Error::NotFound => StoreError::NotFound,
            other => StoreError::Database(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One page request. `page` is 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: i64,
    pub limit: i64,
    pub search: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            search: None,
        }
    }
}

impl ListQuery {
    /// Saturates for pages far past the end, which then read as empty.
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1).saturating_mul(self.limit.max(0))
    }

    /// Lower-cased search term, or `None` when empty. Whitespace is part of
    /// the term.
    pub fn needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase)
    }
}

#[derive(Debug, Clone)]
pub struct DeedPage {
    pub deeds: Vec<Deed>,
    pub total: i64,
}

pub fn total_pages(total: i64, limit: i64) -> i64 {
    if total <= 0 || limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

/// Case-insensitive substring match used by in-memory stores; mirrors the
/// `ILIKE` filter of [`PgDeedStore`].
pub fn matches_search(deed: &Deed, needle: &str) -> bool {
    deed.title.to_lowercase().contains(needle) || deed.text.to_lowercase().contains(needle)
}

#[async_trait]
pub trait DeedStore: Send + Sync + 'static {
    async fn create(&self, deed: NewDeed) -> StoreResult<Deed>;

    async fn get(&self, id: Uuid) -> StoreResult<Deed>;

    async fn update(&self, id: Uuid, patch: DeedPatch) -> StoreResult<Deed>;

    async fn delete(&self, id: Uuid) -> StoreResult<()>;

    /// Newest first.
    async fn list(&self, query: &ListQuery) -> StoreResult<DeedPage>;

    /// Writes `analysis_result` and `analysis_date` together in one update.
    async fn record_analysis(
        &self,
        id: Uuid,
        result: &str,
        analyzed_at: NaiveDateTime,
    ) -> StoreResult<Deed>;
}

#[derive(Clone)]
pub struct PgDeedStore {
    pool: PgPool,
}

impl PgDeedStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn with_conn<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| StoreError::Pool(err.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|err| StoreError::Task(err.to_string()))?
    }
}

fn filtered(needle: Option<&str>) -> deeds::BoxedQuery<'static, Pg> {
    let mut query = deeds::table.into_boxed();
    if let Some(term) = needle {
        let pattern = format!("%{}%", escape_like(term));
        query = query.filter(
            deeds::title
                .ilike(pattern.clone())
                .or(deeds::text.ilike(pattern)),
        );
    }
    query
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[async_trait]
impl DeedStore for PgDeedStore {
    async fn create(&self, deed: NewDeed) -> StoreResult<Deed> {
        self.with_conn(move |conn| {
            let created = diesel::insert_into(deeds::table)
                .values(&deed)
                .get_result(conn)?;
            Ok(created)
        })
        .await
    }

    async fn get(&self, id: Uuid) -> StoreResult<Deed> {
        self.with_conn(move |conn| Ok(deeds::table.find(id).first(conn)?))
            .await
    }

    async fn update(&self, id: Uuid, patch: DeedPatch) -> StoreResult<Deed> {
        self.with_conn(move |conn| {
            if patch.is_empty() {
                return Ok(deeds::table.find(id).first(conn)?);
            }
            let now = Utc::now().naive_utc();
            let updated = diesel::update(deeds::table.find(id))
                .set((&patch, deeds::updated_at.eq(now)))
                .get_result(conn)?;
            Ok(updated)
        })
        .await
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        self.with_conn(move |conn| {
            let deleted = diesel::delete(deeds::table.find(id)).execute(conn)?;
            if deleted == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn list(&self, query: &ListQuery) -> StoreResult<DeedPage> {
        let needle = query.needle();
        let limit = query.limit;
        let offset = query.offset();
        self.with_conn(move |conn| {
            let total: i64 = filtered(needle.as_deref()).count().get_result(conn)?;
            let deeds: Vec<Deed> = filtered(needle.as_deref())
                .order((deeds::created_at.desc(), deeds::id.asc()))
                .limit(limit)
                .offset(offset)
                .load(conn)?;
            Ok(DeedPage { deeds, total })
        })
        .await
    }

    async fn record_analysis(
        &self,
        id: Uuid,
        result: &str,
        analyzed_at: NaiveDateTime,
    ) -> StoreResult<Deed> {
        let result = result.to_string();
        self.with_conn(move |conn| {
            let updated = diesel::update(deeds::table.find(id))
                .set((
                    deeds::analysis_result.eq(Some(result)),
                    deeds::analysis_date.eq(Some(analyzed_at)),
                    deeds::updated_at.eq(analyzed_at),
                ))
                .get_result(conn)?;
            Ok(updated)
        })
        .await
    }
}
