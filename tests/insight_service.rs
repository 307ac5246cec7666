use std::sync::Arc;
use std::time::Duration;

use httpmock::Method::POST;
use httpmock::MockServer;
use serde_json::json;

use echo_journal::domains::journal::FragmentType;
use echo_journal::providers::gemini::GeminiProvider;
use echo_journal::services::insight::{GenerationTimings, InsightService};

const FRAGMENT_FALLBACK: &str = "A quiet moment that felt worth holding onto.";
const DAILY_FALLBACK: &str =
    "The day settled quietly, shaped by moments that mattered in simple ways.";
const QUIET_DAY: &str = "The day moved gently, without many moments asking to be remembered.";

fn fast_timings() -> GenerationTimings {
    GenerationTimings {
        call_timeout: Duration::from_secs(2),
        overload_backoff: Duration::from_millis(10),
        tier_backoff: Duration::from_millis(10),
    }
}

fn model_path(model: &str) -> String {
    format!("/v1beta/models/{model}:generateContent")
}

fn generation_body(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {"parts": [{"text": text}]}
        }]
    })
}

fn service(server: &MockServer) -> InsightService {
    let provider = GeminiProvider::new("key".to_string(), Some(server.base_url())).unwrap();
    InsightService::new(Arc::new(provider), None, fast_timings()).unwrap()
}

#[tokio::test]
async fn returns_fallback_when_every_tier_fails() {
    let server = MockServer::start_async().await;
    let all_down = server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(500);
        })
        .await;

    let service = service(&server);
    let insight = service
        .fragment_insight("woke up early", FragmentType::Text, None)
        .await;
    assert_eq!(insight, FRAGMENT_FALLBACK);
    // One attempt per tier: a 500 is not a transient-overload signal.
    all_down.assert_hits(4);

    let summary = service
        .daily_memory(&[(FragmentType::Text, "woke up early".to_string())])
        .await;
    assert_eq!(summary, DAILY_FALLBACK);
}

#[tokio::test]
async fn tone_filter_short_circuits_without_trying_later_tiers() {
    let server = MockServer::start_async().await;
    let first_tier = server
        .mock_async(|when, then| {
            when.method(POST).path(model_path("gemini-2.5-flash-lite"));
            then.status(200)
                .json_body(generation_body("A journey through the tapestry of time."));
        })
        .await;
    let second_tier = server
        .mock_async(|when, then| {
            when.method(POST).path(model_path("gemini-2.5-flash"));
            then.status(200)
                .json_body(generation_body("The river kept its own counsel."));
        })
        .await;

    let service = service(&server);
    let insight = service
        .fragment_insight("walked by the river", FragmentType::Text, None)
        .await;
    assert_eq!(insight, FRAGMENT_FALLBACK);
    first_tier.assert_hits(1);
    second_tier.assert_hits(0);
}

#[tokio::test]
async fn retries_overload_then_falls_through_to_next_tier() {
    let server = MockServer::start_async().await;
    let overloaded = server
        .mock_async(|when, then| {
            when.method(POST).path(model_path("gemini-2.5-flash-lite"));
            then.status(503);
        })
        .await;
    let healthy = server
        .mock_async(|when, then| {
            when.method(POST).path(model_path("gemini-2.5-flash"));
            then.status(200)
                .json_body(generation_body("The morning held its own shape."));
        })
        .await;

    let service = service(&server);
    let insight = service
        .fragment_insight("woke up early", FragmentType::Text, None)
        .await;
    assert_eq!(insight, "The morning held its own shape.");
    // Two attempts against the overloaded tier, then the next one.
    overloaded.assert_hits(2);
    healthy.assert_hits(1);
}

#[tokio::test]
async fn non_transient_errors_abort_the_tier_without_retry() {
    let server = MockServer::start_async().await;
    let rejecting = server
        .mock_async(|when, then| {
            when.method(POST).path(model_path("gemini-2.5-flash-lite"));
            then.status(400);
        })
        .await;
    let healthy = server
        .mock_async(|when, then| {
            when.method(POST).path(model_path("gemini-2.5-flash"));
            then.status(200)
                .json_body(generation_body("A door left open on purpose."));
        })
        .await;

    let service = service(&server);
    let insight = service
        .fragment_insight("https://example.com", FragmentType::Link, None)
        .await;
    assert_eq!(insight, "A door left open on purpose.");
    rejecting.assert_hits(1);
    healthy.assert_hits(1);
}

#[tokio::test]
async fn empty_model_text_counts_as_a_failed_tier() {
    let server = MockServer::start_async().await;
    let empty = server
        .mock_async(|when, then| {
            when.method(POST).path(model_path("gemini-2.5-flash-lite"));
            then.status(200).json_body(generation_body("   "));
        })
        .await;
    let healthy = server
        .mock_async(|when, then| {
            when.method(POST).path(model_path("gemini-2.5-flash"));
            then.status(200)
                .json_body(generation_body("The bakery on the corner, finally."));
        })
        .await;

    let service = service(&server);
    let insight = service
        .fragment_insight("Corner bakery", FragmentType::Location, None)
        .await;
    assert_eq!(insight, "The bakery on the corner, finally.");
    empty.assert_hits(1);
    healthy.assert_hits(1);
}

#[tokio::test]
async fn quiet_day_skips_the_provider_entirely() {
    let server = MockServer::start_async().await;
    let any = server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200).json_body(generation_body("unused"));
        })
        .await;

    let service = service(&server);
    let summary = service.daily_memory(&[]).await;
    assert_eq!(summary, QUIET_DAY);
    any.assert_hits(0);
}

#[tokio::test]
async fn daily_memory_prompt_lists_every_fragment() {
    let server = MockServer::start_async().await;
    let matched = server
        .mock_async(|when, then| {
            when.method(POST)
                .body_contains("- (TEXT) woke up early")
                .body_contains("- (TEXT) finished the report")
                .body_contains("- (LOCATION) walked by the river");
            then.status(200)
                .json_body(generation_body("Early light, finished work, river air."));
        })
        .await;

    let service = service(&server);
    let summary = service
        .daily_memory(&[
            (FragmentType::Text, "woke up early".to_string()),
            (FragmentType::Text, "finished the report".to_string()),
            (FragmentType::Location, "walked by the river".to_string()),
        ])
        .await;
    assert_eq!(summary, "Early light, finished work, river air.");
    matched.assert_hits(1);
}

#[tokio::test]
async fn image_prompt_defaults_missing_caption() {
    let server = MockServer::start_async().await;
    let matched = server
        .mock_async(|when, then| {
            when.method(POST).body_contains("No caption provided");
            then.status(200)
                .json_body(generation_body("Kept for the feeling, not the frame."));
        })
        .await;

    let service = service(&server);
    let insight = service
        .fragment_insight("pic", FragmentType::Image, Some("   "))
        .await;
    assert_eq!(insight, "Kept for the feeling, not the frame.");
    matched.assert_hits(1);
}
