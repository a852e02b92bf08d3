//! Manual car-rental availability checks. The admin relays what the rental
//! agency answered; the status is free-form and transitions are not enforced.

use crate::errors::AdminError;
use crate::models::lenient_f64;
use crate::notifications::NotificationService;
use crate::supabase::SupabaseClient;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

const TABLE: &str = "rental_verifications";
const DEFAULT_COMMISSION: f64 = 50.0;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub car_model: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub province: Option<String>,
    pub user_id: Option<Value>,
    pub user_name: Option<String>,
    pub user_phone: Option<String>,
    pub user_email: Option<String>,
    pub priority: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerificationUpdate {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub daily_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_price: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub availability_notes: Option<String>,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub admin_id: Option<Value>,
    #[serde(default)]
    pub rentcarcuba_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub commission_amount: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerificationCompletion {
    #[serde(default)]
    pub rental_confirmed: bool,
    #[serde(default)]
    pub rental_id: Option<Value>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub commission_paid: bool,
    #[serde(default)]
    pub completion_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerificationCancel {
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    #[serde(default)]
    pub admin_id: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationStats {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn text<'a>(row: &'a Value, key: &str) -> &'a str {
    row.get(key).and_then(Value::as_str).unwrap_or("")
}

fn money(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string())
}

/// Message sent to the user once the admin has checked availability.
pub fn result_message(verification: &Value, update: &VerificationUpdate) -> String {
    let notes = update
        .availability_notes
        .as_deref()
        .unwrap_or("Sin notas adicionales");
    let car = text(verification, "car_model");
    let province = text(verification, "province");

    if update.status.as_deref() == Some("available") {
        format!(
            "Disponible: {car} en {province}\nPrecio por día: ${}\nTotal: ${}\nNotas: {notes}",
            money(update.daily_price),
            money(update.total_price),
        )
    } else {
        format!("No disponible: {car} en {province}\nNotas: {notes}")
    }
}

pub fn cancellation_message(verification: &Value, reason: Option<&str>) -> String {
    format!(
        "Verificación cancelada: {} en {}\nRazón: {}",
        text(verification, "car_model"),
        text(verification, "province"),
        reason.unwrap_or("Sin especificar")
    )
}

pub fn stats_from(rows: &[Value]) -> VerificationStats {
    let mut by_status = BTreeMap::new();
    for row in rows {
        let status = match text(row, "status") {
            "" => "unknown",
            s => s,
        };
        *by_status.entry(status.to_string()).or_insert(0) += 1;
    }
    VerificationStats {
        total: rows.len(),
        by_status,
    }
}

pub async fn list(supabase: &SupabaseClient) -> Result<Vec<Value>, AdminError> {
    supabase
        .from(TABLE)
        .order("created_at", true)
        .execute()
        .await
}

pub async fn pending(supabase: &SupabaseClient) -> Result<Vec<Value>, AdminError> {
    supabase
        .from(TABLE)
        .eq("status", "pending")
        .order("created_at", true)
        .execute()
        .await
}

pub async fn stats(supabase: &SupabaseClient) -> Result<VerificationStats, AdminError> {
    Ok(stats_from(&list(supabase).await?))
}

/// Stores a pending verification and tells the admin about it.
pub async fn request(
    supabase: &SupabaseClient,
    notifications: &NotificationService,
    input: VerificationRequest,
) -> Result<Value, AdminError> {
    let row = json!({
        "car_model": input.car_model,
        "start_date": input.start_date,
        "end_date": input.end_date,
        "province": input.province,
        "user_id": input.user_id,
        "user_name": input.user_name,
        "user_phone": input.user_phone,
        "user_email": input.user_email,
        "status": "pending",
        "priority": input.priority.unwrap_or_else(|| "normal".to_string()),
        "notes": input.notes.unwrap_or_default(),
        "created_at": now(),
    });
    let verification = supabase.from(TABLE).insert(&row).await?;

    notifications
        .notify_admin(json!({
            "type": "rental_verification_request",
            "title": "Nueva verificación de renta de auto",
            "message": format!(
                "Verificación solicitada: {} en {}",
                text(&verification, "car_model"),
                text(&verification, "province")
            ),
            "verification_id": verification.get("id"),
            "priority": verification.get("priority"),
        }))
        .await;

    Ok(verification)
}

async fn update_row(supabase: &SupabaseClient, id: &str, changes: &Value) -> Result<Value, AdminError> {
    supabase
        .from(TABLE)
        .eq("id", id)
        .update(changes)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AdminError::not_found(format!("Verification {id} not found")))
}

pub async fn update(
    supabase: &SupabaseClient,
    notifications: &NotificationService,
    id: &str,
    input: VerificationUpdate,
) -> Result<Value, AdminError> {
    let changes = json!({
        "status": input.status,
        "daily_price": input.daily_price,
        "total_price": input.total_price,
        "currency": input.currency.clone().unwrap_or_else(|| "USD".to_string()),
        "availability_notes": input.availability_notes,
        "admin_notes": input.admin_notes,
        "checked_at": now(),
        "checked_by": input.admin_id,
        "rentcarcuba_url": input.rentcarcuba_url,
        "commission_amount": input.commission_amount.unwrap_or(DEFAULT_COMMISSION),
    });
    let verification = update_row(supabase, id, &changes).await?;

    notifications
        .notify_user(json!({
            "user_id": verification.get("user_id"),
            "type": "rental_verification_result",
            "title": "Resultado de verificación de renta",
            "message": result_message(&verification, &input),
            "verification_id": id,
        }))
        .await;

    Ok(verification)
}

/// Marks the verification completed; a confirmed rental also gets a `rentals` row.
pub async fn complete(
    supabase: &SupabaseClient,
    id: &str,
    input: VerificationCompletion,
) -> Result<Value, AdminError> {
    let changes = json!({
        "status": "completed",
        "rental_confirmed": input.rental_confirmed,
        "rental_id": input.rental_id,
        "payment_status": input.payment_status.unwrap_or_else(|| "pending".to_string()),
        "commission_paid": input.commission_paid,
        "completed_at": now(),
        "completion_notes": input.completion_notes,
    });
    let verification = update_row(supabase, id, &changes).await?;

    if input.rental_confirmed {
        let rental = json!({
            "verification_id": id,
            "user_id": verification.get("user_id"),
            "car_model": verification.get("car_model"),
            "start_date": verification.get("start_date"),
            "end_date": verification.get("end_date"),
            "province": verification.get("province"),
            "daily_price": verification.get("daily_price"),
            "total_price": verification.get("total_price"),
            "commission_amount": verification.get("commission_amount"),
            "status": "confirmed",
            "created_at": now(),
        });
        supabase.from("rentals").insert(&rental).await?;
        tracing::info!(verification_id = id, "rental confirmed");
    }

    Ok(verification)
}

pub async fn cancel(
    supabase: &SupabaseClient,
    notifications: &NotificationService,
    id: &str,
    input: VerificationCancel,
) -> Result<Value, AdminError> {
    let changes = json!({
        "status": "cancelled",
        "cancellation_reason": input.cancellation_reason,
        "cancelled_at": now(),
        "cancelled_by": input.admin_id,
    });
    let verification = update_row(supabase, id, &changes).await?;

    notifications
        .notify_user(json!({
            "user_id": verification.get("user_id"),
            "type": "rental_verification_cancelled",
            "title": "Verificación cancelada",
            "message": cancellation_message(&verification, input.cancellation_reason.as_deref()),
            "verification_id": id,
        }))
        .await;

    Ok(verification)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_result_message_variants() {
        let verification = json!({"car_model": "Hyundai Accent", "province": "Matanzas"});
        let available = VerificationUpdate {
            status: Some("available".into()),
            daily_price: Some(60.0),
            total_price: Some(420.0),
            ..Default::default()
        };
        let msg = result_message(&verification, &available);
        assert!(msg.starts_with("Disponible: Hyundai Accent en Matanzas"));
        assert!(msg.contains("$420.00"));

        let unavailable = VerificationUpdate {
            status: Some("not_available".into()),
            availability_notes: Some("Sin flota".into()),
            ..Default::default()
        };
        assert_eq!(
            result_message(&verification, &unavailable),
            "No disponible: Hyundai Accent en Matanzas\nNotas: Sin flota"
        );
    }

    #[test]
    fn test_stats_counts_any_status() {
        let rows = vec![
            json!({"status": "pending"}),
            json!({"status": "pending"}),
            json!({"status": "waiting_agency"}),
            json!({}),
        ];
        let stats = stats_from(&rows);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.by_status["pending"], 2);
        assert_eq!(stats.by_status["waiting_agency"], 1);
        assert_eq!(stats.by_status["unknown"], 1);
    }

    fn clients(server: &MockServer) -> (SupabaseClient, NotificationService) {
        let supabase = SupabaseClient::new(&settings::Supabase {
            url: server.uri(),
            key: "k".into(),
            timeout_secs: 5,
        })
        .unwrap();
        (supabase.clone(), NotificationService::new(supabase))
    }

    #[tokio::test]
    async fn test_complete_creates_rental_when_confirmed() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/rental_verifications"))
            .and(query_param("id", "eq.12"))
            .and(body_partial_json(json!({"status": "completed"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 12, "user_id": "u1", "car_model": "Kia Rio", "province": "La Habana", "commission_amount": 50.0}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rentals"))
            .and(body_partial_json(json!({"verification_id": "12", "status": "confirmed", "car_model": "Kia Rio"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{"id": 1}])))
            .expect(1)
            .mount(&server)
            .await;

        let (supabase, _) = clients(&server);
        let done = complete(
            &supabase,
            "12",
            VerificationCompletion {
                rental_confirmed: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(done["id"], 12);
    }

    #[tokio::test]
    async fn test_update_unknown_verification_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/rental_verifications"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let (supabase, notifications) = clients(&server);
        let err = update(&supabase, &notifications, "999", VerificationUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_defaults_commission_and_notifies_user() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/rental_verifications"))
            .and(body_partial_json(json!({"commission_amount": 50.0, "currency": "USD"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 3, "user_id": "u9", "car_model": "Geely CK", "province": "Holguín"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/user_notifications"))
            .and(body_partial_json(json!({"user_id": "u9", "type": "rental_verification_result"})))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let (supabase, notifications) = clients(&server);
        update(
            &supabase,
            &notifications,
            "3",
            VerificationUpdate {
                status: Some("available".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }
}
