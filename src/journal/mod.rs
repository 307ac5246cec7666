use std::path::Path;

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::RunQueryDsl;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::domains::journal::{DailyMemory, Fragment, FragmentType, FragmentWithInsight, Insight};
use crate::error::{EchoError, Result};

mod schema;
use schema::{daily_memories, fragments, insights};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

type SqliteAsyncConn = SyncConnectionWrapper<SqliteConnection>;
type SqlitePool = Pool<SqliteAsyncConn>;
type SqlitePooledConn<'a> = PooledConnection<'a, SqliteAsyncConn>;

#[derive(Queryable)]
struct FragmentRow {
    id: i32,
    user_id: String,
    kind: String,
    content: String,
    media_url: Option<String>,
    created_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = fragments)]
struct NewFragment<'a> {
    user_id: &'a str,
    kind: &'a str,
    content: &'a str,
    media_url: Option<&'a str>,
    created_at: i64,
}

#[derive(Queryable)]
struct InsightRow {
    id: i32,
    fragment_id: i32,
    content: String,
    created_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = insights)]
struct NewInsight<'a> {
    fragment_id: i32,
    content: &'a str,
    created_at: i64,
}

#[derive(Queryable)]
struct MemoryRow {
    id: i32,
    user_id: String,
    date: i64,
    summary: String,
    created_at: i64,
    updated_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = daily_memories)]
struct NewMemory<'a> {
    user_id: &'a str,
    date: i64,
    summary: &'a str,
    created_at: i64,
    updated_at: i64,
}

/// Persistence for fragments, their insights, and compiled daily memories.
/// The `(user_id, date)` uniqueness on daily_memories is enforced by the
/// schema; `upsert_daily_memory` relies on SQLite's native upsert so the
/// nightly sweep and a concurrent on-demand run cannot duplicate a day.
pub struct JournalStore {
    pool: SqlitePool,
}

impl JournalStore {
    pub async fn new(sqlite_path: impl AsRef<str>) -> Result<Self> {
        let sqlite_path = sqlite_path.as_ref();
        ensure_parent_dir(sqlite_path)?;
        run_migrations(sqlite_path).await?;

        let manager = AsyncDieselConnectionManager::<SqliteAsyncConn>::new(sqlite_path);
        let pool: SqlitePool = Pool::builder()
            .build(manager)
            .await
            .map_err(|e| EchoError::Runtime(e.to_string()))?;
        Ok(Self { pool })
    }

    pub async fn insert_fragment(
        &self,
        user_id: &str,
        kind: FragmentType,
        content: &str,
        media_url: Option<&str>,
        created_at: i64,
    ) -> Result<Fragment> {
        let new = NewFragment {
            user_id,
            kind: kind.as_str(),
            content,
            media_url,
            created_at,
        };

        let mut conn = self.conn().await?;
        diesel::insert_into(fragments::table)
            .values(&new)
            .execute(&mut conn)
            .await
            .map_err(|e| EchoError::Runtime(e.to_string()))?;

        let row: FragmentRow = fragments::table
            .filter(fragments::user_id.eq(user_id))
            .order(fragments::id.desc())
            .first(&mut conn)
            .await
            .map_err(|e| EchoError::Runtime(e.to_string()))?;
        map_fragment(row)
    }

    pub async fn attach_insight(
        &self,
        fragment_id: i32,
        content: &str,
        created_at: i64,
    ) -> Result<()> {
        let new = NewInsight {
            fragment_id,
            content,
            created_at,
        };

        let mut conn = self.conn().await?;
        diesel::insert_into(insights::table)
            .values(&new)
            .execute(&mut conn)
            .await
            .map_err(|e| EchoError::Runtime(e.to_string()))?;
        Ok(())
    }

    pub async fn fragment_with_insight(&self, id: i32) -> Result<Option<FragmentWithInsight>> {
        let mut conn = self.conn().await?;
        let row: Option<(FragmentRow, Option<InsightRow>)> = fragments::table
            .left_join(insights::table)
            .filter(fragments::id.eq(id))
            .select((
                fragments::all_columns,
                insights::all_columns.nullable(),
            ))
            .first(&mut conn)
            .await
            .optional()
            .map_err(|e| EchoError::Runtime(e.to_string()))?;

        row.map(map_joined).transpose()
    }

    /// Newest-first timeline page. `window` restricts to a half-open
    /// `[start, end)` interval over `created_at`.
    pub async fn timeline(
        &self,
        user_id: &str,
        skip: i64,
        take: i64,
        window: Option<(i64, i64)>,
    ) -> Result<Vec<FragmentWithInsight>> {
        let mut conn = self.conn().await?;
        let mut query = fragments::table
            .left_join(insights::table)
            .filter(fragments::user_id.eq(user_id))
            .select((
                fragments::all_columns,
                insights::all_columns.nullable(),
            ))
            .into_boxed();

        if let Some((start, end)) = window {
            query = query
                .filter(fragments::created_at.ge(start))
                .filter(fragments::created_at.lt(end));
        }

        let rows: Vec<(FragmentRow, Option<InsightRow>)> = query
            .order((fragments::created_at.desc(), fragments::id.desc()))
            .offset(skip.max(0))
            .limit(take.max(0))
            .load(&mut conn)
            .await
            .map_err(|e| EchoError::Runtime(e.to_string()))?;

        rows.into_iter().map(map_joined).collect()
    }

    /// All of a user's fragments in a `[start, end)` window, oldest first,
    /// as fed to the daily-memory prompt.
    pub async fn fragments_in_window(
        &self,
        user_id: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<FragmentWithInsight>> {
        let mut conn = self.conn().await?;
        let rows: Vec<(FragmentRow, Option<InsightRow>)> = fragments::table
            .left_join(insights::table)
            .filter(fragments::user_id.eq(user_id))
            .filter(fragments::created_at.ge(start))
            .filter(fragments::created_at.lt(end))
            .order((fragments::created_at.asc(), fragments::id.asc()))
            .select((
                fragments::all_columns,
                insights::all_columns.nullable(),
            ))
            .load(&mut conn)
            .await
            .map_err(|e| EchoError::Runtime(e.to_string()))?;

        rows.into_iter().map(map_joined).collect()
    }

    /// Users with at least one fragment captured in the window.
    pub async fn active_users(&self, start: i64, end: i64) -> Result<Vec<String>> {
        let mut conn = self.conn().await?;
        let users: Vec<String> = fragments::table
            .filter(fragments::created_at.ge(start))
            .filter(fragments::created_at.lt(end))
            .select(fragments::user_id)
            .distinct()
            .load(&mut conn)
            .await
            .map_err(|e| EchoError::Runtime(e.to_string()))?;
        Ok(users)
    }

    /// Insert-or-update keyed by `(user_id, date)`; repeated runs for the
    /// same day only overwrite the summary.
    pub async fn upsert_daily_memory(
        &self,
        user_id: &str,
        date: i64,
        summary: &str,
        now: i64,
    ) -> Result<()> {
        let new = NewMemory {
            user_id,
            date,
            summary,
            created_at: now,
            updated_at: now,
        };

        let mut conn = self.conn().await?;
        diesel::insert_into(daily_memories::table)
            .values(&new)
            .on_conflict((daily_memories::user_id, daily_memories::date))
            .do_update()
            .set((
                daily_memories::summary.eq(summary),
                daily_memories::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .await
            .map_err(|e| EchoError::Runtime(e.to_string()))?;
        Ok(())
    }

    /// Exact-key lookup on the normalized day-start instant — the same key
    /// the upsert writes.
    pub async fn memory_by_date(&self, user_id: &str, date: i64) -> Result<Option<DailyMemory>> {
        let mut conn = self.conn().await?;
        let row: Option<MemoryRow> = daily_memories::table
            .filter(daily_memories::user_id.eq(user_id))
            .filter(daily_memories::date.eq(date))
            .first(&mut conn)
            .await
            .optional()
            .map_err(|e| EchoError::Runtime(e.to_string()))?;
        Ok(row.map(map_memory))
    }

    /// Keyset page over daily memories, newest-first by `(date, id)`. The
    /// cursor is the id of the last row of the previous page; rows strictly
    /// after it in sort order are returned, so pages never overlap. An
    /// unknown cursor yields an empty page.
    pub async fn memories_after(
        &self,
        user_id: &str,
        cursor: Option<i32>,
        limit: i64,
    ) -> Result<Vec<DailyMemory>> {
        let mut conn = self.conn().await?;
        let mut query = daily_memories::table
            .filter(daily_memories::user_id.eq(user_id))
            .into_boxed();

        if let Some(cursor_id) = cursor {
            let cursor_row: Option<MemoryRow> = daily_memories::table
                .filter(daily_memories::user_id.eq(user_id))
                .filter(daily_memories::id.eq(cursor_id))
                .first(&mut conn)
                .await
                .optional()
                .map_err(|e| EchoError::Runtime(e.to_string()))?;
            let Some(cursor_row) = cursor_row else {
                return Ok(Vec::new());
            };
            query = query.filter(
                daily_memories::date.lt(cursor_row.date).or(daily_memories::date
                    .eq(cursor_row.date)
                    .and(daily_memories::id.lt(cursor_row.id))),
            );
        }

        let rows: Vec<MemoryRow> = query
            .order((daily_memories::date.desc(), daily_memories::id.desc()))
            .limit(limit.max(0))
            .load(&mut conn)
            .await
            .map_err(|e| EchoError::Runtime(e.to_string()))?;
        Ok(rows.into_iter().map(map_memory).collect())
    }

    async fn conn(&self) -> Result<SqlitePooledConn<'_>> {
        self.pool
            .get()
            .await
            .map_err(|e| EchoError::Runtime(e.to_string()))
    }
}

fn map_fragment(row: FragmentRow) -> Result<Fragment> {
    let kind = row
        .kind
        .parse::<FragmentType>()
        .map_err(|_| EchoError::Runtime(format!("unknown fragment kind: {}", row.kind)))?;
    Ok(Fragment {
        id: row.id,
        user_id: row.user_id,
        kind,
        content: row.content,
        media_url: row.media_url,
        created_at: row.created_at,
    })
}

fn map_joined(row: (FragmentRow, Option<InsightRow>)) -> Result<FragmentWithInsight> {
    let (fragment, insight) = row;
    Ok(FragmentWithInsight {
        fragment: map_fragment(fragment)?,
        insight: insight.map(|row| Insight {
            id: row.id,
            fragment_id: row.fragment_id,
            content: row.content,
            created_at: row.created_at,
        }),
    })
}

fn map_memory(row: MemoryRow) -> DailyMemory {
    DailyMemory {
        id: row.id,
        user_id: row.user_id,
        date: row.date,
        summary: row.summary,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn ensure_parent_dir(path: &str) -> Result<()> {
    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| EchoError::Runtime(e.to_string()))?;
    }
    Ok(())
}

async fn run_migrations(database_url: &str) -> Result<()> {
    let database_url = database_url.to_string();
    tokio::task::spawn_blocking(move || {
        let mut conn = SqliteConnection::establish(&database_url)
            .map_err(|e| EchoError::Runtime(e.to_string()))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| EchoError::Runtime(e.to_string()))?;
        Ok::<_, EchoError>(())
    })
    .await
    .map_err(|e| EchoError::Runtime(e.to_string()))??;
    Ok(())
}
