use super::{AppState, JsonBody};
use crate::errors::AdminError;
use crate::rentals::{
    self, VerificationCancel, VerificationCompletion, VerificationRequest, VerificationUpdate,
};
use axum::extract::{Path, State};
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        // The dashboard shell renders these views
        .route(
            "/admin/rental-verifications",
            get(|| async { Redirect::to("/admin/") }),
        )
        .route(
            "/admin/rental-verifications/pending",
            get(|| async { Redirect::to("/admin/") }),
        )
        .route("/admin/api/rental-verifications", get(list_verifications))
        .route("/admin/api/rental-verifications/pending", get(list_pending))
        .route("/admin/api/rental-verifications/stats", get(verification_stats))
        .route("/admin/api/rental-verifications/request", post(request_verification))
        .route("/admin/api/rental-verifications/{id}/update", post(update_verification))
        .route("/admin/api/rental-verifications/{id}/complete", post(complete_verification))
        .route("/admin/api/rental-verifications/{id}/cancel", post(cancel_verification))
}

async fn list_verifications(State(state): State<AppState>) -> Result<Json<Value>, AdminError> {
    let verifications = rentals::list(&state.supabase).await?;
    Ok(Json(json!({
        "success": true,
        "total": verifications.len(),
        "verifications": verifications,
    })))
}

async fn list_pending(State(state): State<AppState>) -> Result<Json<Value>, AdminError> {
    let verifications = rentals::pending(&state.supabase).await?;
    Ok(Json(json!({
        "success": true,
        "total": verifications.len(),
        "verifications": verifications,
    })))
}

async fn verification_stats(State(state): State<AppState>) -> Result<Json<Value>, AdminError> {
    let stats = rentals::stats(&state.supabase).await?;
    Ok(Json(json!({ "success": true, "stats": stats })))
}

async fn request_verification(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<VerificationRequest>,
) -> Result<Json<Value>, AdminError> {
    let verification = rentals::request(&state.supabase, &state.notifications, input).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Verification requested",
        "verification": verification,
    })))
}

async fn update_verification(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<VerificationUpdate>,
) -> Result<Json<Value>, AdminError> {
    let verification = rentals::update(&state.supabase, &state.notifications, &id, input).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Verification updated",
        "verification": verification,
    })))
}

async fn complete_verification(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<VerificationCompletion>,
) -> Result<Json<Value>, AdminError> {
    let verification = rentals::complete(&state.supabase, &id, input).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Verification completed",
        "verification": verification,
    })))
}

async fn cancel_verification(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<VerificationCancel>,
) -> Result<Json<Value>, AdminError> {
    let verification = rentals::cancel(&state.supabase, &state.notifications, &id, input).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Verification cancelled",
        "verification": verification,
    })))
}
