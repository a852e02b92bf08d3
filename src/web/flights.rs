use super::{AppState, JsonBody};
use crate::duffel::{airlines, FlightOffer};
use crate::errors::AdminError;
use crate::models::FlightSearchInput;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/api/flights/search", post(search_flights))
        .route("/admin/api/flights/airports", get(search_airports))
        .route("/admin/api/flights/airlines", get(list_airlines))
}

/// Failures keep the `data: []` shape the app expects; a missing key is a 500.
fn search_error(err: AdminError) -> Response {
    let status = if matches!(err, AdminError::NotConfigured(_)) {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        err.status()
    };
    tracing::error!(error = %err, "flight search failed");
    (
        status,
        Json(json!({ "success": false, "error": err.to_string(), "data": [] })),
    )
        .into_response()
}

async fn search_flights(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<FlightSearchInput>,
) -> Response {
    if let Err(e) = input.validate() {
        return e.into_response();
    }
    if !state.duffel.is_configured() {
        return search_error(AdminError::NotConfigured("DUFFEL_API_KEY"));
    }

    let origin = input.origin.unwrap_or_default().trim().to_uppercase();
    let destination = input.destination.unwrap_or_default().trim().to_uppercase();
    let departure_date = input.departure_date.unwrap_or_default();
    let airline_type = input
        .airline_type
        .unwrap_or_else(|| "comerciales".to_string());

    let mut flights: Vec<FlightOffer> = Vec::new();
    if matches!(airline_type.as_str(), "comerciales" | "ambos") {
        match state
            .duffel
            .search_offers(
                &origin,
                &destination,
                &departure_date,
                input.passengers.unwrap_or(1),
            )
            .await
        {
            Ok(found) => flights = found,
            Err(e) => return search_error(e),
        }
    } else {
        tracing::info!(%airline_type, "no Duffel search for this airline type");
    }

    Json(json!({
        "success": true,
        "total": flights.len(),
        "data": flights,
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
struct AirportQuery {
    #[serde(default)]
    q: String,
}

async fn search_airports(
    State(state): State<AppState>,
    Query(query): Query<AirportQuery>,
) -> impl IntoResponse {
    let q = query.q.trim();
    if q.is_empty() {
        return Json(json!([]));
    }
    match state.duffel.search_airports(q).await {
        Ok(airports) => Json(json!(airports)),
        Err(e) => {
            tracing::warn!(error = %e, query = q, "airport search failed");
            Json(json!([]))
        }
    }
}

async fn list_airlines() -> impl IntoResponse {
    Json(json!({ "success": true, "airlines": airlines() }))
}
