//! HTTP surface: change webhook, per-article status, metrics, health.

use crate::error::SyncError;
use crate::model::{ChangeNotification, FlatSnapshot};
use crate::security;
use crate::sync::TranslationSync;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

#[derive(Clone)]
pub struct AppState {
    pub sync: Arc<TranslationSync>,
    pub api_key: Option<String>,
}

impl AppState {
    pub fn new(sync: Arc<TranslationSync>, api_key: Option<String>) -> Self {
        Self { sync, api_key }
    }
}

/// Body of `POST /webhooks/article-changed`: the article's flat snapshots
/// before and after the write. A missing `after` means the article was deleted.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleChangedRequest {
    #[serde(alias = "documentId")]
    pub article_id: String,
    #[serde(default)]
    pub before: Option<FlatSnapshot>,
    #[serde(default)]
    pub after: Option<FlatSnapshot>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedResponse {
    pub accepted: bool,
    pub article_id: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/webhooks/article-changed", post(article_changed))
        .route("/articles/:id/translation-status", get(translation_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.sync.metrics())
}

/// Accept a change notification and reconcile it in the background.
async fn article_changed(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ArticleChangedRequest>,
) -> Response {
    if !security::is_authorized(&headers, state.api_key.as_deref()) {
        warn!("Rejected article-changed webhook with missing or invalid API key");
        return error_response(StatusCode::UNAUTHORIZED, "invalid API key");
    }
    if request.article_id.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "articleId is required");
    }
    if request.before.is_none() && request.after.is_none() {
        return error_response(StatusCode::BAD_REQUEST, "before or after snapshot is required");
    }

    let sync = Arc::clone(&state.sync);
    let languages = sync.languages().supported();
    let fields = sync.fields();
    let article_id = request.article_id;
    let notification = ChangeNotification {
        document_id: article_id.clone(),
        before: request
            .before
            .map(|snapshot| snapshot.into_document(&article_id, fields, languages)),
        after: request
            .after
            .map(|snapshot| snapshot.into_document(&article_id, fields, languages)),
    };

    tokio::spawn(async move {
        match sync.handle_notification(&notification).await {
            Ok(outcome) => debug!("{}: webhook reconcile finished: {:?}", notification.document_id, outcome),
            Err(e) => error!("{}: webhook reconcile failed: {}", notification.document_id, e),
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            accepted: true,
            article_id,
        }),
    )
        .into_response()
}

async fn translation_status(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.sync.completeness_report(&id).await {
        Ok(report) => Json(report).into_response(),
        Err(SyncError::UnknownDocument(id)) => {
            error_response(StatusCode::NOT_FOUND, format!("unknown article: {}", id))
        }
        Err(e) => {
            error!("{}: failed to load translation status: {}", id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to load article")
        }
    }
}
