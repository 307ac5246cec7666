use std::sync::Arc;
use std::time::Duration;

use httpmock::Method::POST;
use httpmock::MockServer;
use serde_json::json;
use tempfile::NamedTempFile;

use echo_journal::domains::day::{parse_day, SECONDS_PER_DAY};
use echo_journal::domains::journal::FragmentType;
use echo_journal::journal::JournalStore;
use echo_journal::providers::gemini::GeminiProvider;
use echo_journal::services::insight::{GenerationTimings, InsightService};
use echo_journal::services::memory::{MemoryService, ECHO_PAGE_SIZE};

fn generation_body(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {"parts": [{"text": text}]}
        }]
    })
}

async fn make_service(server: &MockServer) -> (MemoryService, Arc<JournalStore>, NamedTempFile) {
    let db = NamedTempFile::new().unwrap();
    let store = Arc::new(JournalStore::new(db.path().to_str().unwrap()).await.unwrap());
    let provider = GeminiProvider::new("key".to_string(), Some(server.base_url())).unwrap();
    let insights = Arc::new(
        InsightService::new(
            Arc::new(provider),
            Some(vec!["gemini-2.5-flash-lite".to_string()]),
            GenerationTimings {
                call_timeout: Duration::from_secs(2),
                overload_backoff: Duration::from_millis(10),
                tier_backoff: Duration::from_millis(10),
            },
        )
        .unwrap(),
    );
    let service = MemoryService::new(store.clone(), insights);
    (service, store, db)
}

#[tokio::test]
async fn compiling_the_same_day_twice_keeps_one_row_with_the_latest_summary() {
    let server = MockServer::start_async().await;
    let first_run = server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200)
                .json_body(generation_body("Early light, finished work, river air."));
        })
        .await;

    let (service, store, _db) = make_service(&server).await;
    let ts = parse_day("2024-01-05").unwrap() + 12 * 3_600;
    for content in ["woke up early", "finished the report", "walked by the river"] {
        store
            .insert_fragment("u1", FragmentType::Text, content, None, ts)
            .await
            .unwrap();
    }

    service.create_memory_for_user("u1", ts).await.unwrap();
    let memory = service.memory_for_day("u1", "2024-01-05").await.unwrap().unwrap();
    assert_eq!(memory.summary, "Early light, finished work, river air.");
    assert_eq!(memory.date, parse_day("2024-01-05").unwrap());

    // Re-run with fresh provider output: the summary is replaced in place.
    first_run.delete_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200)
                .json_body(generation_body("A steady day, start to finish."));
        })
        .await;

    service.create_memory_for_user("u1", ts).await.unwrap();
    let page = service.echoes("u1", None).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].summary, "A steady day, start to finish.");
    assert_eq!(page.items[0].id, memory.id);
    assert!(page.next_cursor.is_none());
}

#[tokio::test]
async fn empty_day_creates_no_row_and_no_error() {
    let server = MockServer::start_async().await;
    let any = server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200).json_body(generation_body("unused"));
        })
        .await;

    let (service, _store, _db) = make_service(&server).await;
    let ts = parse_day("2024-01-05").unwrap();
    service.create_memory_for_user("u1", ts).await.unwrap();

    assert!(service.memory_for_day("u1", "2024-01-05").await.unwrap().is_none());
    assert!(service.echoes("u1", None).await.unwrap().items.is_empty());
    any.assert_hits(0);
}

#[tokio::test]
async fn generate_today_returns_the_fresh_row() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200)
                .json_body(generation_body("Today kept a small promise."));
        })
        .await;

    let (service, store, _db) = make_service(&server).await;
    let now = echo_journal::domains::day::now_ts();
    store
        .insert_fragment("u1", FragmentType::Text, "woke up early", None, now)
        .await
        .unwrap();

    let memory = service.generate_today("u1").await.unwrap().unwrap();
    assert_eq!(memory.summary, "Today kept a small promise.");

    // A user with nothing captured today gets nothing back.
    assert!(service.generate_today("u2").await.unwrap().is_none());
}

#[tokio::test]
async fn nightly_sweep_covers_every_active_user() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200)
                .json_body(generation_body("One more day written down."));
        })
        .await;

    let (service, store, _db) = make_service(&server).await;
    let now = echo_journal::domains::day::now_ts();
    store
        .insert_fragment("u1", FragmentType::Text, "woke up early", None, now)
        .await
        .unwrap();
    store
        .insert_fragment("u2", FragmentType::Location, "river path", None, now)
        .await
        .unwrap();

    service.run_nightly_sweep().await.unwrap();

    assert_eq!(service.echoes("u1", None).await.unwrap().items.len(), 1);
    assert_eq!(service.echoes("u2", None).await.unwrap().items.len(), 1);

    // Idempotent across re-runs of the same sweep.
    service.run_nightly_sweep().await.unwrap();
    assert_eq!(service.echoes("u1", None).await.unwrap().items.len(), 1);
}

#[tokio::test]
async fn echo_pages_chain_without_repeats() {
    let server = MockServer::start_async().await;
    let (service, store, _db) = make_service(&server).await;

    let base = parse_day("2024-01-01").unwrap();
    let total = (ECHO_PAGE_SIZE * 2 + 5) as i64;
    for day in 0..total {
        store
            .upsert_daily_memory("u1", base + day * SECONDS_PER_DAY, &format!("day {day}"), 100)
            .await
            .unwrap();
    }

    let mut seen = Vec::new();
    let mut cursor = None;
    let mut pages = 0;
    loop {
        let page = service.echoes("u1", cursor).await.unwrap();
        assert!(page.items.len() as i64 <= ECHO_PAGE_SIZE);
        for item in &page.items {
            assert!(!seen.contains(&item.id), "page repeated an item");
            seen.push(item.id);
        }
        pages += 1;
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    assert_eq!(pages, 3);
    assert_eq!(seen.len() as i64, total);

    let first_page = service.echoes("u1", None).await.unwrap();
    assert_eq!(first_page.items[0].summary, format!("day {}", total - 1));
    assert!(first_page.next_cursor.is_some());
}
