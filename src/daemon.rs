use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;

use crate::auth::AuthClient;
use crate::config::Config;
use crate::domains::day::{day_start, now_ts, utc_hour};
use crate::domains::journal::SessionUser;
use crate::error::{EchoError, Result};
use crate::interfaces::auth::SessionAuth;
use crate::interfaces::scheduler::ScheduledJob;
use crate::journal::JournalStore;
use crate::providers::gemini::GeminiProvider;
use crate::providers::media::{DisabledMediaStore, HostedMediaStore};
use crate::scheduler::Scheduler;
use crate::services::fragments::{Capture, CapturedImage, FragmentService};
use crate::services::insight::{GenerationTimings, InsightService};
use crate::services::memory::MemoryService;

/// Wall-clock hour (UTC) after which the nightly sweep fires.
const SWEEP_HOUR: u8 = 23;
const SWEEP_POLL_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct AppState {
    pub fragments: Arc<FragmentService>,
    pub memories: Arc<MemoryService>,
    pub auth: Arc<dyn SessionAuth>,
}

/// Polls once a minute and runs the sweep once per UTC day after the
/// configured hour.
struct NightlySweepJob {
    memories: Arc<MemoryService>,
    last_run_day: Mutex<Option<i64>>,
}

#[async_trait::async_trait]
impl ScheduledJob for NightlySweepJob {
    fn name(&self) -> &str {
        "nightly_sweep"
    }

    fn interval(&self) -> Duration {
        SWEEP_POLL_INTERVAL
    }

    async fn run(&self) -> Result<()> {
        let now = now_ts();
        if utc_hour(now)? < SWEEP_HOUR {
            return Ok(());
        }
        let today = day_start(now);
        let mut last_run = self.last_run_day.lock().await;
        if *last_run == Some(today) {
            return Ok(());
        }
        self.memories.run_nightly_sweep().await?;
        *last_run = Some(today);
        Ok(())
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Deserialize)]
struct TimelineQuery {
    skip: Option<i64>,
    take: Option<i64>,
    date: Option<String>,
}

#[derive(Deserialize)]
struct EchoListQuery {
    cursor: Option<i32>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/fragments", post(create_fragment))
        .route("/fragments/timeline", get(fragment_timeline))
        .route("/echoes", get(list_echoes))
        .route("/echoes/today", post(generate_today))
        .route("/echoes/:date", get(echo_by_date))
        .route("/user/me", get(current_user).delete(delete_account))
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn create_fragment(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let user = match authorize(&state, &headers).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let mut kind = None;
    let mut content = None;
    let mut image = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return error_response(EchoError::Validation(err.to_string())),
        };
        let name = field.name().map(|name| name.to_string());
        match name.as_deref() {
            Some("type") => match field.text().await {
                Ok(value) => kind = Some(value),
                Err(err) => return error_response(EchoError::Validation(err.to_string())),
            },
            Some("content") => match field.text().await {
                Ok(value) => content = Some(value),
                Err(err) => return error_response(EchoError::Validation(err.to_string())),
            },
            Some("image") => {
                let filename = field
                    .file_name()
                    .map(|name| name.to_string())
                    .unwrap_or_else(|| "capture".to_string());
                match field.bytes().await {
                    Ok(bytes) => {
                        image = Some(CapturedImage {
                            bytes: bytes.to_vec(),
                            filename,
                        })
                    }
                    Err(err) => return error_response(EchoError::Validation(err.to_string())),
                }
            }
            _ => {}
        }
    }

    let Some(kind) = kind else {
        return error_response(EchoError::Validation("type is required".to_string()));
    };
    let Some(content) = content else {
        return error_response(EchoError::Validation("content is required".to_string()));
    };

    let capture = Capture {
        kind,
        content,
        image,
    };
    match state.fragments.create(&user.id, capture).await {
        Ok(fragment) => (StatusCode::OK, Json(fragment)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn fragment_timeline(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TimelineQuery>,
) -> Response {
    let user = match authorize(&state, &headers).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let skip = query.skip.unwrap_or(0);
    let take = query.take.unwrap_or(10);
    match state
        .fragments
        .timeline(&user.id, skip, take, query.date.as_deref())
        .await
    {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn list_echoes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<EchoListQuery>,
) -> Response {
    let user = match authorize(&state, &headers).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.memories.echoes(&user.id, query.cursor).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn generate_today(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let user = match authorize(&state, &headers).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.memories.generate_today(&user.id).await {
        Ok(memory) => (StatusCode::OK, Json(memory)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn echo_by_date(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(date): Path<String>,
) -> Response {
    let user = match authorize(&state, &headers).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.memories.memory_for_day(&user.id, &date).await {
        Ok(memory) => (StatusCode::OK, Json(memory)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn current_user(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let user = match authorize(&state, &headers).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    (StatusCode::OK, Json(json!({ "user": user }))).into_response()
}

async fn delete_account(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(response) = authorize(&state, &headers).await {
        return response;
    }

    match state.auth.delete_user(bearer_token(&headers)).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({"message": "Account deleted successfully"})),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

fn bearer_token(headers: &HeaderMap) -> &str {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .unwrap_or_default()
}

async fn authorize(state: &AppState, headers: &HeaderMap) -> std::result::Result<SessionUser, Response> {
    let bearer = bearer_token(headers);
    match state.auth.session(bearer).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(error_response(EchoError::Unauthorized(
            "invalid bearer token".to_string(),
        ))),
        Err(err) => Err(error_response(err)),
    }
}

fn error_response(err: EchoError) -> Response {
    let status = match &err {
        EchoError::Validation(_) => StatusCode::BAD_REQUEST,
        EchoError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        EchoError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

pub async fn run(host: &str, port: u16, config: Config) -> Result<()> {
    run_with_shutdown(host, port, config, futures::future::pending::<()>()).await
}

pub async fn run_with_shutdown<F>(host: &str, port: u16, config: Config, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let store = Arc::new(JournalStore::new(config.sqlite_path()).await?);

    let gemini = config
        .gemini
        .clone()
        .ok_or_else(|| EchoError::Config("gemini section is required".to_string()))?;
    let api_key = gemini
        .api_key
        .ok_or_else(|| EchoError::Config("gemini api key is required".to_string()))?;
    let provider = Arc::new(GeminiProvider::new(api_key, gemini.base_url)?);
    let insights = Arc::new(InsightService::new(
        provider,
        gemini.models,
        GenerationTimings::default(),
    )?);

    let media: Arc<dyn crate::interfaces::storage::MediaStorage> = match config
        .media
        .as_ref()
        .and_then(|media| media.upload_url.clone())
    {
        Some(upload_url) => Arc::new(HostedMediaStore::new(
            upload_url,
            config.media.as_ref().and_then(|media| media.upload_preset.clone()),
        )?),
        None => Arc::new(DisabledMediaStore),
    };

    let auth_base = config
        .auth
        .as_ref()
        .and_then(|auth| auth.base_url.clone())
        .unwrap_or_else(|| "http://127.0.0.1:3000/api/auth".to_string());
    let auth: Arc<dyn SessionAuth> = Arc::new(AuthClient::new(auth_base)?);

    let fragments = Arc::new(FragmentService::new(
        store.clone(),
        insights.clone(),
        media,
    ));
    let memories = Arc::new(MemoryService::new(store.clone(), insights.clone()));

    let mut scheduler = Scheduler::new();
    scheduler.register_job(Arc::new(NightlySweepJob {
        memories: memories.clone(),
        last_run_day: Mutex::new(None),
    }));
    scheduler.start();

    let state = AppState {
        fragments,
        memories,
        auth,
    };
    let app = build_router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| EchoError::Runtime(e.to_string()))?;
    tracing::info!(addr = %addr, "echod listening");

    let shutdown = async move {
        shutdown.await;
        scheduler.stop().await;
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| EchoError::Runtime(e.to_string()))?;

    Ok(())
}
