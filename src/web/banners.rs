use super::{first_row, local_id, sourced_json, AppState, JsonBody};
use crate::errors::AdminError;
use crate::fallback::{self, to_value, to_values};
use crate::models::BannerInput;
use crate::storage;
use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

pub(super) fn public_routes() -> Router<AppState> {
    Router::new().route("/admin/api/banners/active", get(list_active_banners))
}

pub(super) fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/api/banners", get(list_banners).post(create_banner))
        .route(
            "/admin/api/banners/{id}",
            put(update_banner).delete(delete_banner),
        )
        .route("/admin/api/banners/{id}/toggle", post(toggle_banner))
}

async fn list_banners(State(state): State<AppState>) -> Result<Json<Value>, AdminError> {
    let banners = fallback::read(
        "banners",
        state
            .supabase
            .from("banners")
            .order("position", false)
            .execute(),
        async { to_values(storage::list_banners(&state.db).await?) },
    )
    .await?;
    Ok(sourced_json("banners", banners))
}

async fn list_active_banners(State(state): State<AppState>) -> Result<Json<Value>, AdminError> {
    let banners = fallback::read(
        "banners",
        state
            .supabase
            .from("banners")
            .eq("is_active", true)
            .order("position", false)
            .execute(),
        async { to_values(storage::list_active_banners(&state.db).await?) },
    )
    .await?;
    Ok(sourced_json("banners", banners))
}

async fn create_banner(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<BannerInput>,
) -> Result<Json<Value>, AdminError> {
    let banner = fallback::write(
        "banners",
        state.supabase.from("banners").insert(&input),
        async { to_value(storage::create_banner(&state.db, &input).await?) },
    )
    .await?;
    Ok(sourced_json("banner", banner))
}

async fn update_banner(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<BannerInput>,
) -> Result<Json<Value>, AdminError> {
    let banner = fallback::write(
        "banners",
        async {
            let rows = state.supabase.from("banners").eq("id", &id).update(&input).await?;
            first_row(rows, "Banner", &id)
        },
        async { to_value(storage::update_banner(&state.db, local_id(&id)?, &input).await?) },
    )
    .await?;
    Ok(sourced_json("banner", banner))
}

async fn toggle_banner(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AdminError> {
    let banner = fallback::write(
        "banners",
        async {
            let current = first_row(
                state.supabase.from("banners").eq("id", &id).execute().await?,
                "Banner",
                &id,
            )?;
            let is_active = current["is_active"].as_bool().unwrap_or(false);
            let rows = state
                .supabase
                .from("banners")
                .eq("id", &id)
                .update(&json!({ "is_active": !is_active }))
                .await?;
            first_row(rows, "Banner", &id)
        },
        async { to_value(storage::toggle_banner(&state.db, local_id(&id)?).await?) },
    )
    .await?;
    Ok(sourced_json("banner", banner))
}

async fn delete_banner(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AdminError> {
    let source = fallback::delete(
        "Banner",
        &id,
        async {
            let rows = state.supabase.from("banners").eq("id", &id).delete().await?;
            first_row(rows, "Banner", &id).map(|_| ())
        },
        async { storage::delete_banner(&state.db, local_id(&id)?).await },
    )
    .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Banner deleted",
        "source": source,
    })))
}
