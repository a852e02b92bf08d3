use super::{AppState, JsonBody};
use crate::errors::AdminError;
use crate::storage;
use crate::supabase::SupabaseClient;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};

const CONFIG_TABLE: &str = "app_config";
const DEFAULT_MAINTENANCE_MESSAGE: &str = "La aplicación está en mantenimiento";

pub(super) fn public_routes() -> Router<AppState> {
    Router::new().route("/api/health", get(health))
}

pub(super) fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/stats", get(stats))
        .route("/admin/api/config", get(get_config).put(update_config))
        .route(
            "/admin/api/config/advanced",
            get(get_advanced_config).put(update_config),
        )
        .route("/admin/api/maintenance", post(set_maintenance))
        .route("/admin/api/recharges", get(list_recharges))
        .route("/admin/api/transfers", get(list_transfers))
        .route("/admin/api/activities", get(list_activities))
        .route("/admin/api/payroll/process", post(process_payroll))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "message": "Cubalink23 admin panel running",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Rows of `table`, or none when Supabase is down; stats degrade to zero.
async fn rows_or_empty(supabase: &SupabaseClient, table: &str, columns: &str) -> Vec<Value> {
    match supabase.from(table).select(columns).execute().await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(table, error = %e, "stats query failed");
            Vec::new()
        }
    }
}

fn connection(ok: bool) -> &'static str {
    if ok {
        "connected"
    } else {
        "not configured"
    }
}

async fn stats(State(state): State<AppState>) -> Json<Value> {
    let (users, products, orders) = tokio::join!(
        rows_or_empty(&state.supabase, "users", "*"),
        rows_or_empty(&state.supabase, "products", "id"),
        rows_or_empty(&state.supabase, "orders", "id"),
    );
    let active_users = users
        .iter()
        .filter(|u| !u["blocked"].as_bool().unwrap_or(false))
        .count();
    let total_searches = storage::total_searches(&state.db).await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not count searches");
        0
    });

    let pending_notifications = state.notifications.pending().await;

    Json(json!({
        "total_searches": total_searches,
        "pending_notifications": pending_notifications,
        "total_users": users.len(),
        "active_users": active_users,
        "total_products": products.len(),
        "total_orders": orders.len(),
        "system_status": {
            "backend": "online",
            "supabase": connection(state.supabase.is_configured()),
            "duffel_api": connection(state.duffel.is_configured()),
            "square": connection(state.square.is_available()),
        },
    }))
}

async fn current_config(supabase: &SupabaseClient) -> Result<Option<Value>, AdminError> {
    Ok(supabase
        .from(CONFIG_TABLE)
        .limit(1)
        .execute()
        .await?
        .into_iter()
        .next())
}

/// Updates the single config row in place, inserting it on first use.
async fn save_config(supabase: &SupabaseClient, changes: &Value) -> Result<Value, AdminError> {
    let mut changes = changes.clone();
    if let Some(obj) = changes.as_object_mut() {
        obj.remove("id");
        obj.insert("updated_at".into(), json!(Utc::now().to_rfc3339()));
    }

    match current_config(supabase).await?.and_then(|row| row.get("id").cloned()) {
        Some(id) => {
            let id = match id {
                Value::String(s) => s,
                other => other.to_string(),
            };
            let rows = supabase.from(CONFIG_TABLE).eq("id", id).update(&changes).await?;
            Ok(rows.into_iter().next().unwrap_or(changes))
        }
        None => supabase.from(CONFIG_TABLE).insert(&changes).await,
    }
}

async fn get_config(State(state): State<AppState>) -> Result<Json<Value>, AdminError> {
    let config = current_config(&state.supabase).await?.unwrap_or_else(|| json!({}));
    Ok(Json(json!({ "success": true, "config": config })))
}

async fn update_config(
    State(state): State<AppState>,
    JsonBody(changes): JsonBody<Map<String, Value>>,
) -> Result<Json<Value>, AdminError> {
    let config = save_config(&state.supabase, &Value::Object(changes)).await?;
    tracing::info!("app config updated");
    Ok(Json(json!({ "success": true, "config": config })))
}

async fn get_advanced_config(State(state): State<AppState>) -> Json<Value> {
    let stored = match current_config(&state.supabase).await {
        Ok(row) => row.unwrap_or_else(|| json!({})),
        Err(e) => {
            tracing::warn!(error = %e, "app config unavailable");
            json!({})
        }
    };
    let flag = |key: &str, default: bool| stored.get(key).and_then(Value::as_bool).unwrap_or(default);

    Json(json!({
        "success": true,
        "config": {
            "app_name": "Cubalink23",
            "version": env!("CARGO_PKG_VERSION"),
            "duffel_api_status": connection(state.duffel.is_configured()),
            "supabase_status": connection(state.supabase.is_configured()),
            "square_environment": state.square.environment(),
            "maintenance_mode": flag("maintenance_mode", false),
            "maintenance_message": stored
                .get("maintenance_message")
                .cloned()
                .unwrap_or_else(|| json!("")),
            "features": {
                "flight_search": flag("flight_search", true),
                "product_store": flag("product_store", true),
                "user_registration": flag("user_registration", true),
                "payment_processing": flag("payment_processing", true),
                "push_notifications": flag("push_notifications", true),
            },
        },
    }))
}

#[derive(Debug, Deserialize)]
struct MaintenanceInput {
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    message: Option<String>,
}

async fn set_maintenance(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<MaintenanceInput>,
) -> Result<Json<Value>, AdminError> {
    let message = input
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_MAINTENANCE_MESSAGE.to_string());
    save_config(
        &state.supabase,
        &json!({
            "maintenance_mode": input.enabled,
            "maintenance_message": message,
        }),
    )
    .await?;
    tracing::info!(enabled = input.enabled, "maintenance mode changed");
    Ok(Json(json!({
        "success": true,
        "maintenance_mode": input.enabled,
        "maintenance_message": message,
    })))
}

async fn remote_list(
    supabase: &SupabaseClient,
    table: &str,
    key: &str,
) -> Result<Json<Value>, AdminError> {
    let rows = supabase
        .from(table)
        .order("created_at", true)
        .execute()
        .await?;
    Ok(Json(json!({ "success": true, "total": rows.len(), key: rows })))
}

async fn list_recharges(State(state): State<AppState>) -> Result<Json<Value>, AdminError> {
    remote_list(&state.supabase, "recharge_history", "recharges").await
}

async fn list_transfers(State(state): State<AppState>) -> Result<Json<Value>, AdminError> {
    remote_list(&state.supabase, "transfers", "transfers").await
}

async fn list_activities(State(state): State<AppState>) -> Result<Json<Value>, AdminError> {
    remote_list(&state.supabase, "activities", "activities").await
}

async fn process_payroll(
    State(state): State<AppState>,
    JsonBody(mut payroll): JsonBody<Map<String, Value>>,
) -> Result<Json<Value>, AdminError> {
    if payroll.is_empty() {
        return Err(AdminError::bad_request("Payroll data is required"));
    }
    payroll.insert("processed_at".into(), json!(Utc::now().to_rfc3339()));
    let row = state.supabase.from("payroll").insert(&payroll).await?;
    Ok(Json(json!({ "success": true, "payroll": row })))
}
