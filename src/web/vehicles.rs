use super::{first_row, local_id, sourced_json, AppState, JsonBody};
use crate::errors::AdminError;
use crate::fallback::{self, to_value, to_values};
use crate::models::VehicleInput;
use crate::storage;
use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/api/vehicles", get(list_vehicles))
        .route("/admin/api/vehicles/add", post(add_vehicle))
        .route("/admin/api/vehicles/{id}", delete(delete_vehicle))
}

async fn list_vehicles(State(state): State<AppState>) -> Result<Json<Value>, AdminError> {
    let vehicles = fallback::read(
        "vehicles",
        state
            .supabase
            .from("vehicles")
            .order("created_at", true)
            .execute(),
        async { to_values(storage::list_vehicles(&state.db).await?) },
    )
    .await?;
    Ok(sourced_json("vehicles", vehicles))
}

async fn add_vehicle(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<VehicleInput>,
) -> Result<Json<Value>, AdminError> {
    input.validate_new()?;

    let mut row = to_value(&input)?;
    if let Some(obj) = row.as_object_mut() {
        obj.insert("created_at".into(), json!(Utc::now().to_rfc3339()));
    }

    let vehicle = fallback::write(
        "vehicles",
        state.supabase.from("vehicles").insert(&row),
        async { to_value(storage::create_vehicle(&state.db, &input).await?) },
    )
    .await?;
    tracing::info!(name = ?input.name, source = ?vehicle.source, "vehicle added");
    Ok(sourced_json("vehicle", vehicle))
}

async fn delete_vehicle(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AdminError> {
    let source = fallback::delete(
        "Vehicle",
        &id,
        async {
            let rows = state.supabase.from("vehicles").eq("id", &id).delete().await?;
            first_row(rows, "Vehicle", &id).map(|_| ())
        },
        async { storage::delete_vehicle(&state.db, local_id(&id)?).await },
    )
    .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Vehicle deleted",
        "source": source,
    })))
}
