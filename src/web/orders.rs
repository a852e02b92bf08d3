use super::{first_row, AppState, JsonBody};
use crate::errors::AdminError;
use crate::models::StatusInput;
use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/api/orders", get(list_orders))
        .route("/admin/api/orders/{id}/status", put(update_order_status))
}

async fn list_orders(State(state): State<AppState>) -> Result<Json<Value>, AdminError> {
    let orders = state
        .supabase
        .from("orders")
        .order("created_at", true)
        .execute()
        .await?;
    Ok(Json(json!({ "success": true, "orders": orders })))
}

async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<StatusInput>,
) -> Result<Json<Value>, AdminError> {
    let status = input.required()?;
    let rows = state
        .supabase
        .from("orders")
        .eq("id", &id)
        .update(&json!({
            "status": status,
            "updated_at": Utc::now().to_rfc3339(),
        }))
        .await?;
    let order = first_row(rows, "Order", &id)?;
    tracing::info!(order = %id, %status, "order status updated");
    Ok(Json(json!({ "success": true, "order": order })))
}
