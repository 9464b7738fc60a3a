//! HTTP surface for the assistant: `GET /healthz` and `POST /v1/ask`.
//!
//! The pipeline is blocking, so each request runs on the blocking pool.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::RETRY_AFTER;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, warn};

use crate::error::PipelineError;
use crate::pipeline::{Assistant, Outcome};
use crate::render::ErrorReport;

/// Server-side request policy.
#[derive(Debug, Clone, Copy)]
pub struct ApiSettings {
    /// Largest `limit` a client may request; larger values are clamped.
    pub max_limit: usize,
    /// Sustained requests per minute (0 disables rate limiting).
    pub max_requests_per_minute: u32,
    /// Requests that may arrive at once before throttling starts.
    pub rate_limit_burst: u32,
}

#[derive(Clone)]
struct AppState {
    assistant: Arc<Assistant>,
    default_limit: usize,
    max_limit: usize,
    rate_limiter: Option<RateLimiter>,
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    question: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct AskResponse {
    #[serde(flatten)]
    outcome: Outcome,
    latency_ms: f64,
}

/// Builds the router; the default limit comes from the assistant's config.
pub fn router(assistant: Arc<Assistant>, settings: ApiSettings) -> Router {
    let max_limit = settings.max_limit.max(1);
    let state = AppState {
        default_limit: assistant.config().limit.clamp(1, max_limit),
        assistant,
        max_limit,
        rate_limiter: RateLimiter::new(settings.max_requests_per_minute, settings.rate_limit_burst),
    };
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/ask", post(ask_handler))
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn ask_handler(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, Response> {
    let Json(request) = payload.map_err(|rejection| bad_request(rejection.body_text()))?;
    if request.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }
    if let Some(limiter) = &state.rate_limiter {
        if let Err(wait) = limiter.acquire().await {
            warn!(retry_after_ms = wait.as_millis() as u64, "rate limit exceeded");
            return Err(too_many_requests(wait));
        }
    }
    let limit = request
        .limit
        .unwrap_or(state.default_limit)
        .clamp(1, state.max_limit);
    let start = Instant::now();
    let assistant = Arc::clone(&state.assistant);
    let question = request.question;
    let result = tokio::task::spawn_blocking(move || assistant.ask_with_limit(&question, limit))
        .await
        .map_err(|err| {
            error!("pipeline task join error: {err}");
            internal_error("pipeline task failed")
        })?;
    match result {
        Ok(outcome) => Ok(Json(AskResponse {
            outcome,
            latency_ms: start.elapsed().as_secs_f64() * 1000.0,
        })),
        Err(err) => {
            error!(kind = err.kind(), "request failed: {err}");
            Err((status_for(&err), Json(ErrorReport::from(&err))).into_response())
        }
    }
}

/// HTTP status for a failed pipeline run.
pub fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::InvalidQuestion(_) => StatusCode::BAD_REQUEST,
        PipelineError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        PipelineError::Encoding(_) | PipelineError::Retrieval(_) | PipelineError::Generation(_) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

fn report(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Response {
    let body = ErrorReport {
        kind,
        message: message.into(),
    };
    (status, Json(body)).into_response()
}

fn bad_request(message: impl Into<String>) -> Response {
    report(StatusCode::BAD_REQUEST, "invalid_question", message)
}

fn too_many_requests(wait: Duration) -> Response {
    let secs = wait.as_secs_f64().ceil().max(1.0) as u64;
    let mut response = report(
        StatusCode::TOO_MANY_REQUESTS,
        "rate_limited",
        format!("rate limit exceeded; retry in {secs}s"),
    );
    response
        .headers_mut()
        .insert(RETRY_AFTER, axum::http::HeaderValue::from(secs));
    response
}

fn internal_error(message: impl Into<String>) -> Response {
    report(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

/// Token bucket shared by all request handlers.
#[derive(Clone)]
struct RateLimiter {
    bucket: Arc<Mutex<Bucket>>,
    capacity: f64,
    refill_per_sec: f64,
}

struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

impl RateLimiter {
    fn new(per_minute: u32, burst: u32) -> Option<Self> {
        if per_minute == 0 || burst == 0 {
            return None;
        }
        Some(Self {
            bucket: Arc::new(Mutex::new(Bucket {
                tokens: f64::from(burst),
                refilled_at: Instant::now(),
            })),
            capacity: f64::from(burst),
            refill_per_sec: f64::from(per_minute) / 60.0,
        })
    }

    /// Takes one token, or returns how long until the next one is available.
    async fn acquire(&self) -> Result<(), Duration> {
        let mut bucket = self.bucket.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.refilled_at).as_secs_f64();
        bucket.refilled_at = now;
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            Err(Duration::from_secs_f64(
                (1.0 - bucket.tokens) / self.refill_per_sec,
            ))
        }
    }
}
