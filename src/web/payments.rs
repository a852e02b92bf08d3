use super::{AppState, JsonBody};
use crate::errors::AdminError;
use crate::models::{present, require, DateRange, PaymentInput, RefundInput};
use crate::square::{payment_methods, PaymentSummary};
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

const DEFAULT_DESCRIPTION: &str = "Recarga Cubalink23";
const DEFAULT_REFUND_REASON: &str = "Customer request";

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/payments/process", post(process_payment))
        .route("/api/payments/status/{id}", get(payment_status))
        .route("/api/payments/refund", post(refund_payment))
        .route("/api/payments/history", get(payment_history))
        .route("/api/payments/methods", get(list_methods))
        .route("/api/payments/square-status", get(square_status))
        .route("/api/payments/test-connection", get(test_connection))
}

/// Square failures carry the upstream message in `details`.
fn payment_error(context: &str, err: AdminError) -> Response {
    if matches!(err, AdminError::BadRequest(_)) {
        return err.into_response();
    }
    tracing::error!(error = %err, context, "Square call failed");
    (
        err.status(),
        Json(json!({
            "success": false,
            "error": context,
            "details": err.to_string(),
        })),
    )
        .into_response()
}

async fn process_payment(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<PaymentInput>,
) -> Response {
    if let Err(e) = input.validate() {
        return e.into_response();
    }
    let amount = input.amount.unwrap_or_default();
    let currency = input.currency.clone().unwrap_or_else(|| "USD".to_string());

    match input.nonce.as_deref() {
        Some(nonce) => {
            let note = input.description.as_deref().unwrap_or(DEFAULT_DESCRIPTION);
            let location_id = input.location_id.as_deref().unwrap_or_default();
            match state
                .square
                .create_payment(nonce, amount, &currency, location_id, note)
                .await
            {
                Ok(payment) => Json(json!({
                    "success": true,
                    "transaction_id": payment.id,
                    "status": payment.status.unwrap_or_else(|| "UNKNOWN".to_string()),
                    "message": "Payment processed",
                }))
                .into_response(),
                Err(e) => payment_error("Error processing card payment", e),
            }
        }
        None => {
            let description = input
                .description
                .clone()
                .unwrap_or_else(|| format!("{DEFAULT_DESCRIPTION} - ${amount:.2}"));
            let email = input.email.as_deref().unwrap_or_default();
            match state
                .square
                .create_payment_link(amount, &description, email, &currency)
                .await
            {
                Ok(link) => Json(json!({
                    "success": true,
                    "transaction_id": link.id,
                    "checkout_url": link.url,
                    "status": "pending",
                    "message": "Payment link created",
                }))
                .into_response(),
                Err(e) => payment_error("Error creating payment link", e),
            }
        }
    }
}

async fn payment_status(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.square.get_payment(&id).await {
        Ok(payment) => {
            let summary = PaymentSummary::from(payment);
            Json(json!({
                "success": true,
                "payment_id": summary.payment_id,
                "status": summary.status,
                "amount": summary.amount,
                "currency": summary.currency,
                "created_at": summary.created_at,
                "updated_at": summary.updated_at,
            }))
            .into_response()
        }
        Err(e) => payment_error("Error fetching payment status", e),
    }
}

async fn refund_payment(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<RefundInput>,
) -> Response {
    if let Err(e) = require(&[("payment_id", present(&input.payment_id))]) {
        return e.into_response();
    }
    if matches!(input.amount, Some(a) if a <= 0.0) {
        return AdminError::bad_request("amount must be greater than 0").into_response();
    }
    let payment_id = input.payment_id.unwrap_or_default();
    let reason = input
        .reason
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_REFUND_REASON.to_string());

    match state
        .square
        .refund_payment(&payment_id, input.amount, &reason)
        .await
    {
        Ok(refund) => Json(json!({
            "success": true,
            "refund_id": refund.refund_id,
            "status": refund.status,
            "amount": refund.amount,
            "currency": refund.currency,
            "reason": refund.reason,
            "message": "Refund processed",
        }))
        .into_response(),
        Err(e) => payment_error("Error processing refund", e),
    }
}

async fn payment_history(
    State(state): State<AppState>,
    Query(range): Query<DateRange>,
) -> Response {
    match state
        .square
        .list_payments(range.start_date.as_deref(), range.end_date.as_deref())
        .await
    {
        Ok(payments) => {
            let transactions: Vec<PaymentSummary> =
                payments.into_iter().map(PaymentSummary::from).collect();
            Json(json!({
                "success": true,
                "total_count": transactions.len(),
                "transactions": transactions,
            }))
            .into_response()
        }
        Err(e) => payment_error("Error fetching payment history", e),
    }
}

async fn list_methods() -> Json<serde_json::Value> {
    Json(json!({ "success": true, "payment_methods": payment_methods() }))
}

async fn square_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "square_available": state.square.is_available(),
        "environment": state.square.environment(),
        "location_id": state.square.location_id(),
    }))
}

async fn test_connection(State(state): State<AppState>) -> Response {
    match state.square.list_payments(None, None).await {
        Ok(_) => Json(json!({
            "success": true,
            "message": "Square connection OK",
            "environment": state.square.environment(),
        }))
        .into_response(),
        Err(e) => payment_error("Square connection failed", e),
    }
}
