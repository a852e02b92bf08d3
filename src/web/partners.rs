use super::{AppState, JsonBody};
use crate::errors::AdminError;
use crate::partners::{CharterAirlineInput, CharterBookingInput, TransturBookingInput};
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/admin/api/charter-airlines",
            get(list_airlines).post(save_airline),
        )
        .route("/admin/api/charter-airlines/{id}/toggle", post(toggle_airline))
        .route("/admin/api/charter-airlines/{id}/test", post(test_airline))
        .route(
            "/admin/api/charter-bookings",
            get(list_charter_bookings).post(create_charter_booking),
        )
        .route(
            "/admin/api/charter-bookings/{id}/confirm",
            post(confirm_charter_booking),
        )
        .route(
            "/admin/api/cuba-transtur/bookings",
            get(list_transtur_bookings).post(create_transtur_booking),
        )
        .route(
            "/admin/api/cuba-transtur/bookings/{id}",
            get(transtur_booking_status),
        )
        .route("/admin/api/cuba-transtur/test-connection", get(test_transtur))
        .route("/admin/api/cuba-transtur/statistics", get(transtur_statistics))
}

// Charter airlines

async fn list_airlines(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "success": true, "airlines": state.partners.airlines().await }))
}

async fn save_airline(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<CharterAirlineInput>,
) -> Result<Json<Value>, AdminError> {
    let airline = state.partners.save_airline(input).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Airline {} saved", airline.name),
        "airline": airline,
    })))
}

async fn toggle_airline(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AdminError> {
    let airline = state.partners.toggle_airline(&id).await?;
    Ok(Json(json!({
        "success": true,
        "message": if airline.active { "Airline activated" } else { "Airline deactivated" },
        "airline": airline,
    })))
}

async fn test_airline(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AdminError> {
    let probe = state.partners.test_airline(&id).await?;
    Ok(Json(json!({
        "success": probe.reachable,
        "message": if probe.reachable { "Connection OK" } else { "Airline site unreachable" },
        "probe": probe,
    })))
}

// Charter bookings

async fn list_charter_bookings(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "success": true, "bookings": state.partners.charter_bookings().await }))
}

async fn create_charter_booking(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<CharterBookingInput>,
) -> Result<Json<Value>, AdminError> {
    let booking = state.partners.create_charter_booking(input).await?;
    Ok(Json(json!({ "success": true, "booking": booking })))
}

async fn confirm_charter_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AdminError> {
    let booking = state.partners.confirm_charter_booking(&id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Booking confirmed. Ticket issued; no further changes allowed.",
        "booking": booking,
    })))
}

// Cuba Transtur

async fn list_transtur_bookings(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "success": true, "bookings": state.partners.transtur_bookings().await }))
}

async fn create_transtur_booking(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<TransturBookingInput>,
) -> Result<Json<Value>, AdminError> {
    let booking = state.partners.create_transtur_booking(input).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Booking registered",
        "booking": booking,
    })))
}

async fn transtur_booking_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AdminError> {
    let booking = state.partners.transtur_booking(&id).await?;
    Ok(Json(json!({ "success": true, "booking": booking })))
}

async fn test_transtur(State(state): State<AppState>) -> Json<Value> {
    let probe = state.partners.test_transtur().await;
    Json(json!({
        "success": probe.reachable,
        "message": if probe.reachable { "Transtur reachable" } else { "Transtur unreachable" },
        "probe": probe,
    }))
}

async fn transtur_statistics(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "statistics": state.partners.transtur_statistics().await,
    }))
}
