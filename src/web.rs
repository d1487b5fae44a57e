use crate::{
    news::{NewsArticle, NewsError},
    search::{EntitySearchRequest, SavedEntity, SearchError, SearchResponse, SearchService},
    semantic::{EmbeddingError, RankedResult},
    store::SearchHistoryEntry,
};
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::signal;

/// Header carrying the caller identity
pub const USER_HEADER: &str = "x-user-id";

const DEFAULT_HISTORY_LIMIT: usize = 20;

#[derive(Clone)]
struct SharedState {
    service: Arc<SearchService>,
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {err}");
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                log::error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::warn!("shutting down");
}

pub fn router(service: Arc<SearchService>) -> Router {
    let shared_state = Arc::new(SharedState { service });

    Router::new()
        .route("/api/search/news", post(search_news))
        .route("/api/search/entities", post(search_entities))
        .route("/api/search/history", get(history))
        .route("/api/posts", post(save_post))
        .route("/api/users", post(save_user))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state)
}

async fn start_app(service: Arc<SearchService>, listen: &str) -> anyhow::Result<()> {
    let app = router(service);

    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("listening on {listen}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn start_daemon(service: SearchService, listen: &str) -> anyhow::Result<()> {
    // blocking http clients inside must be dropped outside the runtime
    let service = Arc::new(service);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async { start_app(service.clone(), listen).await })
}

#[derive(Debug)]
enum HttpError {
    MissingIdentity,
    Search(SearchError),
}

impl From<SearchError> for HttpError {
    fn from(err: SearchError) -> Self {
        HttpError::Search(err)
    }
}

fn status_of(err: &SearchError) -> StatusCode {
    match err {
        SearchError::InvalidInput(_)
        | SearchError::Query(_)
        | SearchError::Embedding(EmbeddingError::InvalidInput)
        | SearchError::News(NewsError::Query(_)) => StatusCode::BAD_REQUEST,

        SearchError::Embedding(EmbeddingError::ProviderUnconfigured)
        | SearchError::News(NewsError::ProviderUnconfigured) => StatusCode::SERVICE_UNAVAILABLE,

        SearchError::News(NewsError::RateLimitExceeded) => StatusCode::TOO_MANY_REQUESTS,

        SearchError::Embedding(EmbeddingError::EmbeddingFailed(_))
        | SearchError::News(_) => StatusCode::BAD_GATEWAY,

        SearchError::Vector(_) | SearchError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            HttpError::MissingIdentity => (
                StatusCode::UNAUTHORIZED,
                format!("missing {USER_HEADER} header"),
            ),
            HttpError::Search(err) => {
                let status = status_of(err);
                if status.is_server_error() {
                    log::error!("{err:?}");
                }
                (status, err.to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn caller(headers: &HeaderMap) -> Result<String, HttpError> {
    headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(HttpError::MissingIdentity)
}

#[derive(Debug, Deserialize)]
pub struct NewsSearchRequest {
    pub query: String,
}

async fn search_news(
    State(state): State<Arc<SharedState>>,
    headers: HeaderMap,
    Json(payload): Json<NewsSearchRequest>,
) -> Result<Json<SearchResponse<NewsArticle>>, HttpError> {
    let user_id = caller(&headers)?;
    log::debug!("payload: {payload:?}");

    tokio::task::block_in_place(move || {
        state
            .service
            .search_news(&user_id, &payload.query)
            .map(Into::into)
            .map_err(Into::into)
    })
}

async fn search_entities(
    State(state): State<Arc<SharedState>>,
    headers: HeaderMap,
    Json(payload): Json<EntitySearchRequest>,
) -> Result<Json<SearchResponse<RankedResult>>, HttpError> {
    let user_id = caller(&headers)?;
    log::debug!("payload: {payload:?}");

    tokio::task::block_in_place(move || {
        state
            .service
            .search_entities(&user_id, payload)
            .map(Into::into)
            .map_err(Into::into)
    })
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

async fn history(
    State(state): State<Arc<SharedState>>,
    headers: HeaderMap,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<SearchHistoryEntry>>, HttpError> {
    let user_id = caller(&headers)?;

    tokio::task::block_in_place(move || {
        state
            .service
            .history(&user_id, params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
            .map(Into::into)
            .map_err(Into::into)
    })
}

#[derive(Debug, Deserialize)]
pub struct PostRequest {
    pub id: Option<String>,
    pub author: String,
    pub content: String,
}

async fn save_post(
    State(state): State<Arc<SharedState>>,
    headers: HeaderMap,
    Json(payload): Json<PostRequest>,
) -> Result<Json<SavedEntity>, HttpError> {
    caller(&headers)?;

    tokio::task::block_in_place(move || {
        state
            .service
            .save_post(&payload.author, &payload.content, payload.id)
            .map(Into::into)
            .map_err(Into::into)
    })
}

#[derive(Debug, Deserialize)]
pub struct UserRequest {
    pub id: Option<String>,
    pub username: String,
    #[serde(default)]
    pub email: String,
}

async fn save_user(
    State(state): State<Arc<SharedState>>,
    headers: HeaderMap,
    Json(payload): Json<UserRequest>,
) -> Result<Json<SavedEntity>, HttpError> {
    caller(&headers)?;

    tokio::task::block_in_place(move || {
        state
            .service
            .save_user(&payload.username, &payload.email, payload.id)
            .map(Into::into)
            .map_err(Into::into)
    })
}
