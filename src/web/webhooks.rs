use super::AppState;
use crate::errors::AdminError;
use crate::square::{handle_webhook_event, verify_webhook_signature};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Uri};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

const SIGNATURE_HEADERS: [&str; 2] = ["x-square-hmacsha256-signature", "x-square-signature"];

pub(super) fn routes() -> Router<AppState> {
    Router::new().route("/webhooks/square", post(square_webhook))
}

/// URL Square signed: the registered notification URL, else where we are reachable.
fn notification_url(state: &AppState, uri: &Uri) -> String {
    match &state.settings.square.webhook_url {
        Some(url) => url.clone(),
        None => format!(
            "{}{}",
            state.settings.public_url(),
            uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/webhooks/square")
        ),
    }
}

async fn square_webhook(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AdminError> {
    let secret = &state.settings.square.webhook_secret;
    if secret.is_empty() {
        tracing::error!("Square webhook received but no webhook secret is configured");
        return Err(AdminError::NotConfigured("SQUARE_WEBHOOK_SECRET"));
    }

    let signature = SIGNATURE_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let url = notification_url(&state, &uri);
    if signature.is_empty() || !verify_webhook_signature(secret, &url, &body, signature) {
        tracing::warn!(%url, "Square webhook signature rejected");
        return Err(AdminError::Unauthorized(
            "Signature verification failed".to_string(),
        ));
    }

    let event: Value = serde_json::from_slice(&body)
        .map_err(|e| AdminError::bad_request(format!("Invalid webhook payload: {e}")))?;
    let outcome = handle_webhook_event(&event);
    Ok(Json(json!({ "status": outcome })))
}
