//! JSON API over the assessment pipeline.
//!
//! Session tokens are checked by the authentication layer in front of this
//! service, which forwards the resolved user id in the `x-user-id` header.
//! Routes that read or write a user's results refuse requests without it.

use std::{sync::Arc, time::Duration};

use axum::{
    async_trait,
    body::Bytes,
    extract::{rejection::QueryRejection, FromRequestParts, Query, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        request::Parts,
        HeaderName, Method, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::{
    answer::validate,
    assessment::{assess, percentage, StressLevel},
    config::Config,
    error::{Error, InvalidInput},
    history::{chart_series, history_view, ChartPoint, HistoryRow, TestResult},
    store::{CsvStore, ResultStore},
    Question, QUESTIONS,
};

pub const USER_HEADER: &str = "x-user-id";

pub struct AppState {
    pub store: Arc<dyn ResultStore>,
    pub history_limit: usize,
}

type SharedState = Arc<AppState>;

/// Body of every response: the payload, or the reason the request failed.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Reply<T> {
    Success {
        success: bool,
        #[serde(flatten)]
        data: T,
    },
    Failure {
        success: bool,
        error: String,
    },
}

impl<T> Reply<T> {
    pub fn ok(data: T) -> Self {
        Reply::Success {
            success: true,
            data,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Reply::Failure {
            success: false,
            error: error.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    MalformedPayload(InvalidInput),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid query: {0}")]
    BadQuery(String),

    #[error("Route not found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Server error")]
    Internal(Error),
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        match e {
            Error::InvalidInput(reason) => AppError::MalformedPayload(reason),
            other => AppError::Internal(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::MalformedPayload(_) | AppError::BadQuery(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Internal(e) => {
                error!("Request failed: {e}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(Reply::<()>::failure(self.to_string()))).into_response()
    }
}

/// User id forwarded by the authentication layer.
#[derive(Debug, Clone)]
pub struct Owner(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Owner {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| Owner(value.to_string()))
            .ok_or(AppError::Unauthenticated)
    }
}

/// Runs a store call on the blocking pool.
async fn with_store<T, F>(state: &SharedState, call: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&dyn ResultStore) -> Result<T, Error> + Send + 'static,
{
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || call(store.as_ref()))
        .await
        .map_err(|e| AppError::Internal(Error::Persistence(e.to_string())))?
        .map_err(AppError::from)
}

#[derive(Serialize)]
struct About {
    project: Project,
}

#[derive(Serialize)]
struct Project {
    name: &'static str,
    version: &'static str,
    description: &'static str,
    features: [&'static str; 3],
}

async fn about_handler() -> Json<Reply<About>> {
    Json(Reply::ok(About {
        project: Project {
            name: "MentalCare - Student Helper Platform",
            version: env!("CARGO_PKG_VERSION"),
            description: "Stress level testing and tracking for students",
            features: [
                "Stress level testing",
                "Stress history and trends",
                "Study timer",
            ],
        },
    }))
}

#[derive(Serialize)]
struct QuestionList {
    theme: &'static str,
    questions: &'static [Question],
}

async fn questions_handler() -> Json<Reply<QuestionList>> {
    Json(Reply::ok(QuestionList {
        theme: &QUESTIONS.theme,
        questions: QUESTIONS.questions(),
    }))
}

#[derive(Debug, Serialize)]
pub struct Submitted {
    pub score: u32,
    pub level: StressLevel,
    pub recommendations: Vec<String>,
    pub date: DateTime<Utc>,
    pub description: &'static str,
    pub comparison: &'static str,
    pub percentage: u32,
}

impl From<TestResult> for Submitted {
    fn from(result: TestResult) -> Self {
        Submitted {
            score: result.score,
            level: result.level,
            description: result.level.description(),
            comparison: result.level.comparison(),
            percentage: percentage(result.score),
            recommendations: result.recommendations,
            date: result.created_at,
        }
    }
}

#[derive(Serialize)]
struct SubmitData {
    result: Submitted,
}

async fn submit_handler(
    State(state): State<SharedState>,
    Owner(owner): Owner,
    body: Bytes,
) -> Result<(StatusCode, Json<Reply<SubmitData>>), AppError> {
    let payload: Option<Value> = serde_json::from_slice(&body).ok();
    let answers = validate(payload.as_ref().and_then(|p| p.get("answers"))).map_err(|e| {
        warn!(%owner, "Rejected submission: {e}");
        AppError::MalformedPayload(e)
    })?;

    let assessment = assess(&answers);
    let result = with_store(&state, move |store| {
        store.create(Some(owner.as_str()), &assessment)
    })
    .await?;
    info!(id = result.id, score = result.score, level = %result.level, "Stored assessment");

    Ok((
        StatusCode::CREATED,
        Json(Reply::ok(SubmitData {
            result: result.into(),
        })),
    ))
}

#[derive(Serialize)]
struct LatestData {
    latest: Option<TestResult>,
}

async fn latest_handler(
    State(state): State<SharedState>,
    Owner(owner): Owner,
) -> Result<Json<Reply<LatestData>>, AppError> {
    let latest = with_store(&state, move |store| {
        store.latest_by_owner(Some(owner.as_str()))
    })
    .await?;
    Ok(Json(Reply::ok(LatestData { latest })))
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    limit: Option<usize>,
}

impl LimitQuery {
    fn or(&self, default: usize) -> usize {
        self.limit.filter(|&limit| limit > 0).unwrap_or(default)
    }
}

fn limit_or(
    query: Result<Query<LimitQuery>, QueryRejection>,
    default: usize,
) -> Result<usize, AppError> {
    let Query(query) = query.map_err(|e| AppError::BadQuery(e.body_text()))?;
    Ok(query.or(default))
}

#[derive(Serialize)]
struct HistoryData {
    history: Vec<HistoryRow>,
}

async fn history_handler(
    State(state): State<SharedState>,
    Owner(owner): Owner,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<Json<Reply<HistoryData>>, AppError> {
    let limit = limit_or(query, state.history_limit)?;
    let results = with_store(&state, move |store| {
        store.list_by_owner(Some(owner.as_str()))
    })
    .await?;
    Ok(Json(Reply::ok(HistoryData {
        history: history_view(&results, limit),
    })))
}

#[derive(Serialize)]
struct ChartData {
    chart: Vec<ChartPoint>,
}

async fn chart_handler(
    State(state): State<SharedState>,
    Owner(owner): Owner,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<Json<Reply<ChartData>>, AppError> {
    let limit = limit_or(query, state.history_limit)?;
    let results = with_store(&state, move |store| {
        store.list_by_owner(Some(owner.as_str()))
    })
    .await?;
    Ok(Json(Reply::ok(ChartData {
        chart: chart_series(&results, limit),
    })))
}

async fn not_found() -> AppError {
    AppError::NotFound
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static(USER_HEADER),
        ])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/about", get(about_handler).fallback(method_not_allowed))
        .route(
            "/api/tests/questions",
            get(questions_handler).fallback(method_not_allowed),
        )
        .route(
            "/api/tests/submit",
            post(submit_handler).fallback(method_not_allowed),
        )
        .route(
            "/api/tests/latest",
            get(latest_handler).fallback(method_not_allowed),
        )
        .route(
            "/api/tests/history",
            get(history_handler).fallback(method_not_allowed),
        )
        .route(
            "/api/tests/chart",
            get(chart_handler).fallback(method_not_allowed),
        )
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn start_server(config: Config) -> Result<(), Error> {
    info!("Opening result store...");
    let store = CsvStore::open(&config.data_path)?;
    let state = Arc::new(AppState {
        store: Arc::new(store),
        history_limit: config.history_limit,
    });

    info!("Starting server...");
    let app = router(state);

    let address = format!("0.0.0.0:{}", config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| Error::Server(format!("cannot bind {address}: {e}")))?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Server(e.to_string()))?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
