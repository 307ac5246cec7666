use std::sync::Arc;

use crate::domains::day::{day_window, now_ts, parse_day};
use crate::domains::journal::{FragmentType, FragmentWithInsight};
use crate::error::{EchoError, Result};
use crate::interfaces::storage::MediaStorage;
use crate::journal::JournalStore;
use crate::services::insight::InsightService;

pub struct CapturedImage {
    pub bytes: Vec<u8>,
    pub filename: String,
}

pub struct Capture {
    pub kind: String,
    pub content: String,
    pub image: Option<CapturedImage>,
}

/// Fragment ingestion and timeline reads.
pub struct FragmentService {
    store: Arc<JournalStore>,
    insights: Arc<InsightService>,
    media: Arc<dyn MediaStorage>,
}

impl FragmentService {
    pub fn new(
        store: Arc<JournalStore>,
        insights: Arc<InsightService>,
        media: Arc<dyn MediaStorage>,
    ) -> Self {
        Self {
            store,
            insights,
            media,
        }
    }

    /// Validates and persists one captured moment, then attaches a generated
    /// insight best-effort. The image upload happens before the row is
    /// written and its failure aborts the request; insight trouble never
    /// does.
    pub async fn create(&self, user_id: &str, capture: Capture) -> Result<FragmentWithInsight> {
        let mut kind = capture
            .kind
            .parse::<FragmentType>()
            .map_err(|_| EchoError::Validation(format!("unknown fragment type: {}", capture.kind)))?;

        let content = capture.content.trim().to_string();
        if content.is_empty() {
            return Err(EchoError::Validation("content must not be empty".to_string()));
        }

        let mut media_url = None;
        if let Some(image) = capture.image {
            // A submitted file wins over whatever type the caller declared.
            kind = FragmentType::Image;
            let url = self
                .media
                .upload(image.bytes, &image.filename)
                .await
                .map_err(|err| {
                    EchoError::Validation(format!("failed to upload image: {err}"))
                })?;
            media_url = Some(url);
        }

        let now = now_ts();
        let fragment = self
            .store
            .insert_fragment(user_id, kind, &content, media_url.as_deref(), now)
            .await?;

        // Step two of the saga: generation is total, but the insight row
        // write can still fail; the fragment is returned regardless.
        let insight = self
            .insights
            .fragment_insight(&fragment.content, kind, Some(&fragment.content))
            .await;
        if let Err(err) = self.store.attach_insight(fragment.id, &insight, now).await {
            tracing::warn!(fragment_id = fragment.id, error = %err, "failed to persist insight");
        }

        self.store
            .fragment_with_insight(fragment.id)
            .await?
            .ok_or_else(|| EchoError::Runtime("fragment vanished after insert".to_string()))
    }

    /// Newest-first offset page over the user's fragments, optionally
    /// restricted to one `YYYY-MM-DD` day.
    pub async fn timeline(
        &self,
        user_id: &str,
        skip: i64,
        take: i64,
        date: Option<&str>,
    ) -> Result<Vec<FragmentWithInsight>> {
        let window = match date {
            Some(date) => Some(day_window(parse_day(date)?)),
            None => None,
        };
        self.store.timeline(user_id, skip, take, window).await
    }
}
