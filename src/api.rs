// src/api.rs
//! The always-on HTTP surface: feedback recording, on-demand digest
//! trigger, and interest-profile CRUD. Mutating routes are guarded by a
//! shared secret; error responses never echo the secret or internals.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use metrics::counter;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::config::AppConfig;
use crate::digest::DigestTrigger;
use crate::store::{ItemStore, Rating};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ItemStore>,
    pub config: Arc<AppConfig>,
    pub trigger: Arc<dyn DigestTrigger>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/feedback", get(record_feedback))
        .route("/trigger-digest", get(trigger_digest))
        .route("/interests", get(list_interests).post(replace_interests))
        .route("/interests/add", post(add_interest))
        .route("/interests/{interest}", delete(remove_interest))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

type ApiError = (StatusCode, Json<Value>);
type ApiResult = Result<Json<Value>, ApiError>;

fn bad_request(msg: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": msg })))
}

fn unauthorized() -> ApiError {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "unauthorized" })),
    )
}

fn store_error(e: anyhow::Error) -> ApiError {
    tracing::error!(error = ?e, "store operation failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal error" })),
    )
}

/// Shared-secret check. Comparing SHA-256 digests instead of the raw
/// strings keeps the comparison independent of secret length and content.
fn secret_matches(provided: Option<&str>, expected: &str) -> bool {
    use sha2::{Digest, Sha256};
    let provided = match provided {
        Some(s) => s,
        None => return false,
    };
    Sha256::digest(provided.as_bytes()) == Sha256::digest(expected.as_bytes())
}

#[derive(Deserialize)]
struct SecretParam {
    secret: Option<String>,
}

// ---- feedback ----

#[derive(Deserialize)]
struct FeedbackParams {
    story: Option<String>,
    rating: Option<String>,
    title: Option<String>,
    url: Option<String>,
}

/// GET /feedback?story&rating&title&url — append one judgment. Validation
/// happens before any store write; repeated submissions just accumulate
/// more exemplars.
async fn record_feedback(
    State(state): State<AppState>,
    Query(params): Query<FeedbackParams>,
) -> ApiResult {
    let story = params
        .story
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| bad_request("missing 'story'"))?;
    let rating: Rating = params
        .rating
        .as_deref()
        .ok_or_else(|| bad_request("missing 'rating'"))?
        .parse()
        .map_err(|_| bad_request("rating must be 'positive' or 'negative'"))?;

    state
        .store
        .append_feedback(
            story,
            params.title.as_deref().unwrap_or(""),
            params.url.as_deref(),
            rating,
        )
        .map_err(store_error)?;

    counter!("feedback_received_total").increment(1);
    tracing::info!(story_id = %story, rating = %rating.as_str(), "feedback recorded");
    Ok(Json(json!({ "status": "recorded" })))
}

// ---- digest trigger ----

/// GET /trigger-digest?secret — returns immediately; the run proceeds
/// detached so the external scheduler never blocks on completion.
async fn trigger_digest(
    State(state): State<AppState>,
    Query(params): Query<SecretParam>,
) -> ApiResult {
    if !secret_matches(params.secret.as_deref(), &state.config.trigger_secret) {
        return Err(unauthorized());
    }
    state.trigger.spawn_run();
    Ok(Json(json!({ "status": "triggered" })))
}

// ---- interest profile ----

async fn list_interests(State(state): State<AppState>) -> ApiResult {
    let interests = state.store.load_interests().map_err(store_error)?;
    let excluded = state.store.load_excluded().map_err(store_error)?;
    Ok(Json(json!({ "interests": interests, "excluded": excluded })))
}

#[derive(Deserialize)]
struct ReplaceBody {
    interests: Vec<String>,
}

/// POST /interests?secret — replace-all, transactional: either every new
/// term lands or the original set stays intact.
async fn replace_interests(
    State(state): State<AppState>,
    Query(params): Query<SecretParam>,
    Json(body): Json<ReplaceBody>,
) -> ApiResult {
    if !secret_matches(params.secret.as_deref(), &state.config.trigger_secret) {
        return Err(unauthorized());
    }
    if body.interests.iter().any(|t| t.trim().is_empty()) {
        return Err(bad_request("interest terms must be non-empty"));
    }
    state
        .store
        .replace_interests(&body.interests)
        .map_err(store_error)?;
    Ok(Json(json!({ "status": "replaced", "count": body.interests.len() })))
}

#[derive(Deserialize)]
struct AddBody {
    interest: String,
}

async fn add_interest(
    State(state): State<AppState>,
    Query(params): Query<SecretParam>,
    Json(body): Json<AddBody>,
) -> ApiResult {
    if !secret_matches(params.secret.as_deref(), &state.config.trigger_secret) {
        return Err(unauthorized());
    }
    let term = body.interest.trim();
    if term.is_empty() {
        return Err(bad_request("interest must be non-empty"));
    }
    state.store.add_interest(term).map_err(store_error)?;
    Ok(Json(json!({ "status": "added" })))
}

async fn remove_interest(
    State(state): State<AppState>,
    Path(interest): Path<String>,
    Query(params): Query<SecretParam>,
) -> ApiResult {
    if !secret_matches(params.secret.as_deref(), &state.config.trigger_secret) {
        return Err(unauthorized());
    }
    let removed = state.store.remove_interest(&interest).map_err(store_error)?;
    if removed {
        Ok(Json(json!({ "status": "removed" })))
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no such interest" })),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_comparison() {
        assert!(secret_matches(Some("hunter2"), "hunter2"));
        assert!(!secret_matches(Some("hunter"), "hunter2"));
        assert!(!secret_matches(None, "hunter2"));
    }
}
