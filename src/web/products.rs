use super::{first_row, local_id, sourced_json, AppState, JsonBody};
use crate::errors::AdminError;
use crate::fallback::{self, to_value, to_values};
use crate::models::{present, require, ProductInput};
use crate::storage;
use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/api/products", get(list_products).post(create_product))
        .route(
            "/admin/api/products/{id}",
            put(update_product).delete(delete_product),
        )
        .route(
            "/admin/api/categories",
            get(list_categories).post(create_category),
        )
}

async fn list_products(State(state): State<AppState>) -> Result<Json<Value>, AdminError> {
    let products = fallback::read(
        "products",
        state
            .supabase
            .from("products")
            .order("created_at", true)
            .execute(),
        async { to_values(storage::list_products(&state.db).await?) },
    )
    .await?;
    Ok(sourced_json("products", products))
}

async fn create_product(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<ProductInput>,
) -> Result<Json<Value>, AdminError> {
    input.validate()?;
    let product = fallback::write(
        "products",
        state.supabase.from("products").insert(&input),
        async { to_value(storage::create_product(&state.db, &input).await?) },
    )
    .await?;
    Ok(sourced_json("product", product))
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<ProductInput>,
) -> Result<Json<Value>, AdminError> {
    input.validate()?;
    let product = fallback::write(
        "products",
        async {
            let rows = state.supabase.from("products").eq("id", &id).update(&input).await?;
            first_row(rows, "Product", &id)
        },
        async { to_value(storage::update_product(&state.db, local_id(&id)?, &input).await?) },
    )
    .await?;
    Ok(sourced_json("product", product))
}

async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AdminError> {
    let source = fallback::delete(
        "Product",
        &id,
        async {
            let rows = state.supabase.from("products").eq("id", &id).delete().await?;
            first_row(rows, "Product", &id).map(|_| ())
        },
        async { storage::delete_product(&state.db, local_id(&id)?).await },
    )
    .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Product deleted",
        "source": source,
    })))
}

async fn list_categories(State(state): State<AppState>) -> Result<Json<Value>, AdminError> {
    let categories = fallback::read(
        "categories",
        state.supabase.from("categories").order("name", false).execute(),
        async {
            Ok::<_, AdminError>(
                storage::product_categories(&state.db)
                    .await?
                    .into_iter()
                    .map(|name| json!({ "name": name }))
                    .collect(),
            )
        },
    )
    .await?;
    Ok(sourced_json("categories", categories))
}

#[derive(Debug, Deserialize, Serialize)]
struct CategoryInput {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    icon: Option<String>,
}

async fn create_category(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<CategoryInput>,
) -> Result<Json<Value>, AdminError> {
    require(&[("name", present(&input.name))])?;
    let category = state.supabase.from("categories").insert(&input).await?;
    Ok(Json(json!({ "success": true, "category": category })))
}
