use super::{first_row, local_id, sourced_json, AppState, JsonBody};
use crate::errors::AdminError;
use crate::fallback::{self, to_value, to_values};
use crate::models::UserInput;
use crate::storage;
use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/api/users", get(list_users).post(create_user))
        .route("/admin/api/users/{id}", put(update_user).delete(delete_user))
        .route("/admin/api/users/{id}/toggle", post(toggle_user))
        .route("/admin/api/users/{id}/activity", post(record_activity))
}

async fn list_users(State(state): State<AppState>) -> Result<Json<Value>, AdminError> {
    let users = fallback::read(
        "users",
        state
            .supabase
            .from("users")
            .order("created_at", true)
            .execute(),
        async { to_values(storage::list_users(&state.db).await?) },
    )
    .await?;
    Ok(sourced_json("users", users))
}

async fn create_user(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<UserInput>,
) -> Result<Json<Value>, AdminError> {
    input.validate_new()?;
    let user = fallback::write(
        "users",
        state.supabase.from("users").insert(&input),
        async { to_value(storage::create_user(&state.db, &input).await?) },
    )
    .await?;
    Ok(sourced_json("user", user))
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<UserInput>,
) -> Result<Json<Value>, AdminError> {
    let user = fallback::write(
        "users",
        async {
            let rows = state.supabase.from("users").eq("id", &id).update(&input).await?;
            first_row(rows, "User", &id)
        },
        async { to_value(storage::update_user(&state.db, local_id(&id)?, &input).await?) },
    )
    .await?;
    Ok(sourced_json("user", user))
}

/// Blocks an active user or unblocks a blocked one.
async fn toggle_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AdminError> {
    let user = fallback::write(
        "users",
        async {
            let current = first_row(
                state.supabase.from("users").eq("id", &id).execute().await?,
                "User",
                &id,
            )?;
            let blocked = current["blocked"].as_bool().unwrap_or(false);
            let rows = state
                .supabase
                .from("users")
                .eq("id", &id)
                .update(&json!({ "blocked": !blocked }))
                .await?;
            first_row(rows, "User", &id)
        },
        async { to_value(storage::toggle_user_block(&state.db, local_id(&id)?).await?) },
    )
    .await?;
    Ok(sourced_json("user", user))
}

async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AdminError> {
    let source = fallback::delete(
        "User",
        &id,
        async {
            let rows = state.supabase.from("users").eq("id", &id).delete().await?;
            first_row(rows, "User", &id).map(|_| ())
        },
        async { storage::delete_user(&state.db, local_id(&id)?).await },
    )
    .await?;
    Ok(Json(json!({
        "success": true,
        "message": "User deleted",
        "source": source,
    })))
}

async fn record_activity(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AdminError> {
    let activity = storage::record_user_activity(&state.db, &id).await?;
    Ok(Json(json!({ "success": true, "activity": activity })))
}
