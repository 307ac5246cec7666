use std::sync::Arc;

use serde::Serialize;

use crate::domains::day::{day_start, day_window, now_ts, parse_day};
use crate::domains::journal::DailyMemory;
use crate::error::Result;
use crate::journal::JournalStore;
use crate::services::insight::InsightService;

pub const ECHO_PAGE_SIZE: i64 = 10;

#[derive(Debug, Clone, Serialize)]
pub struct EchoPage {
    pub items: Vec<DailyMemory>,
    pub next_cursor: Option<i32>,
}

/// Compiles one calendar day of fragments into a daily memory, and serves
/// the "echo" read paths.
pub struct MemoryService {
    store: Arc<JournalStore>,
    insights: Arc<InsightService>,
}

impl MemoryService {
    pub fn new(store: Arc<JournalStore>, insights: Arc<InsightService>) -> Self {
        Self { store, insights }
    }

    /// Generates or refreshes the memory for the day containing `ts`.
    /// A day with no fragments creates no row and is not an error. The
    /// upsert keyed on `(user_id, day_start)` makes repeated runs overwrite
    /// the summary instead of duplicating the day.
    pub async fn create_memory_for_user(&self, user_id: &str, ts: i64) -> Result<()> {
        let (start, end) = day_window(ts);
        let fragments = self.store.fragments_in_window(user_id, start, end).await?;
        if fragments.is_empty() {
            return Ok(());
        }

        let inputs: Vec<_> = fragments
            .iter()
            .map(|item| (item.fragment.kind, item.fragment.content.clone()))
            .collect();
        let summary = self.insights.daily_memory(&inputs).await;

        self.store
            .upsert_daily_memory(user_id, start, &summary, now_ts())
            .await
    }

    /// On-demand "generate today": runs the compiler for the current day and
    /// returns the freshly read row (absent when the day was empty).
    pub async fn generate_today(&self, user_id: &str) -> Result<Option<DailyMemory>> {
        let now = now_ts();
        self.create_memory_for_user(user_id, now).await?;
        self.store.memory_by_date(user_id, day_start(now)).await
    }

    /// The nightly sweep: every user with a fragment captured today gets a
    /// memory, sequentially; one user's failure never stops the rest.
    pub async fn run_nightly_sweep(&self) -> Result<()> {
        tracing::info!("starting daily memory generation");
        let now = now_ts();
        let (start, end) = day_window(now);
        let users = self.store.active_users(start, end).await?;

        let mut generated = 0usize;
        for user_id in &users {
            match self.create_memory_for_user(user_id, now).await {
                Ok(()) => generated += 1,
                Err(err) => {
                    tracing::warn!(user_id = %user_id, error = %err, "daily memory generation failed");
                }
            }
        }
        tracing::info!(users = users.len(), generated, "daily memory generation finished");
        Ok(())
    }

    /// Newest-first keyset page; `next_cursor` is present if and only if a
    /// further page exists.
    pub async fn echoes(&self, user_id: &str, cursor: Option<i32>) -> Result<EchoPage> {
        let mut items = self
            .store
            .memories_after(user_id, cursor, ECHO_PAGE_SIZE + 1)
            .await?;

        let mut next_cursor = None;
        if items.len() as i64 > ECHO_PAGE_SIZE {
            items.pop();
            next_cursor = items.last().map(|item| item.id);
        }

        Ok(EchoPage { items, next_cursor })
    }

    /// Single-day lookup by `YYYY-MM-DD`; absence means "not generated yet".
    pub async fn memory_for_day(&self, user_id: &str, date: &str) -> Result<Option<DailyMemory>> {
        let key = parse_day(date)?;
        self.store.memory_by_date(user_id, key).await
    }
}
