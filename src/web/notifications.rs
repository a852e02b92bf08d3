use super::{AppState, JsonBody};
use crate::errors::AdminError;
use crate::models::NotificationInput;
use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

pub(super) fn public_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/push-notifications",
            get(notification_history).post(send_notification),
        )
        .route("/api/push-notifications/{id}", delete(delete_notification))
        .route("/api/notifications/next", get(next_notification))
}

pub(super) fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/admin/api/notifications",
            get(notification_history).post(send_notification),
        )
        .route("/admin/api/send-push-notification", post(send_notification))
        .route("/admin/api/notification-history", get(notification_history))
}

async fn send_notification(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<NotificationInput>,
) -> Result<Json<Value>, AdminError> {
    let notification = state.notifications.send(input).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Notification sent",
        "notification": notification,
    })))
}

async fn notification_history(State(state): State<AppState>) -> Json<Value> {
    let notifications = state.notifications.history().await;
    Json(json!({
        "success": true,
        "total": notifications.len(),
        "notifications": notifications,
    }))
}

async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AdminError> {
    state.notifications.delete(&id).await?;
    Ok(Json(json!({ "success": true, "message": "Notification deleted" })))
}

/// Hands the polling app exactly one queued notification.
async fn next_notification(State(state): State<AppState>) -> Json<Value> {
    match state.notifications.next().await {
        Some(notification) => Json(json!({ "success": true, "notification": notification })),
        None => Json(json!({ "success": false, "message": "No pending notifications" })),
    }
}
