//! Square REST client (payment links, card payments, refunds, history) and
//! the webhook signature scheme.

use crate::errors::AdminError;
use crate::settings;
use crate::signing;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// Dollars to cents, rounded to the nearest cent.
pub fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub fn from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Money {
    pub amount: i64,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Payment {
    pub id: String,
    pub status: Option<String>,
    pub amount_money: Money,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub receipt_url: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Refund {
    pub id: String,
    pub status: Option<String>,
    pub payment_id: Option<String>,
    pub amount_money: Money,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PaymentLink {
    pub id: String,
    pub url: String,
    pub order_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentSummary {
    pub payment_id: String,
    pub status: String,
    pub amount: f64,
    pub currency: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<Payment> for PaymentSummary {
    fn from(p: Payment) -> Self {
        PaymentSummary {
            payment_id: p.id,
            status: p.status.unwrap_or_else(|| "UNKNOWN".to_string()),
            amount: from_cents(p.amount_money.amount),
            currency: p.amount_money.currency.unwrap_or_else(|| "USD".to_string()),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundSummary {
    pub refund_id: String,
    pub status: String,
    pub amount: f64,
    pub currency: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentMethod {
    pub id: &'static str,
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub enabled: bool,
}

pub fn payment_methods() -> Vec<PaymentMethod> {
    vec![
        PaymentMethod {
            id: "card",
            name: "Tarjeta de crédito/débito",
            kind: "card",
            enabled: true,
        },
        PaymentMethod {
            id: "apple_pay",
            name: "Apple Pay",
            kind: "digital_wallet",
            enabled: true,
        },
        PaymentMethod {
            id: "google_pay",
            name: "Google Pay",
            kind: "digital_wallet",
            enabled: true,
        },
    ]
}

#[derive(Clone, Debug)]
pub struct SquareClient {
    access_token: String,
    location_id: String,
    environment: String,
    api_version: String,
    base_url: String,
    http: Client,
}

impl SquareClient {
    pub fn new(cfg: &settings::Square) -> Result<Self, AdminError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            access_token: cfg.access_token.clone(),
            location_id: cfg.location_id.clone(),
            environment: cfg.environment.clone(),
            api_version: cfg.api_version.clone(),
            base_url: cfg.api_base(),
            http,
        })
    }

    pub fn is_available(&self) -> bool {
        !self.access_token.is_empty() && !self.location_id.is_empty()
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn location_id(&self) -> &str {
        &self.location_id
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, AdminError> {
        if self.access_token.is_empty() {
            return Err(AdminError::NotConfigured("Square"));
        }
        let response = req
            .bearer_auth(&self.access_token)
            .header("Square-Version", &self.api_version)
            .header("Accept", "application/json")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdminError::Upstream {
                service: "Square",
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response.json().await?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Hosted checkout for `amount` dollars, prefilled with the buyer's email.
    pub async fn create_payment_link(
        &self,
        amount: f64,
        description: &str,
        email: &str,
        currency: &str,
    ) -> Result<PaymentLink, AdminError> {
        if !self.is_available() {
            return Err(AdminError::NotConfigured("Square"));
        }
        #[derive(Deserialize)]
        struct Resp {
            payment_link: PaymentLink,
        }

        let body = json!({
            "idempotency_key": signing::random_id(),
            "quick_pay": {
                "name": description,
                "price_money": {"amount": to_cents(amount), "currency": currency},
                "location_id": self.location_id,
            },
            "pre_populated_data": {"buyer_email": email},
        });
        let resp: Resp = self
            .send(self.http.post(self.url("/v2/online-checkout/payment-links")).json(&body))
            .await?;
        tracing::info!(link_id = %resp.payment_link.id, amount, "Square payment link created");
        Ok(resp.payment_link)
    }

    /// Charges a card nonce produced by the Square mobile SDK.
    pub async fn create_payment(
        &self,
        nonce: &str,
        amount: f64,
        currency: &str,
        location_id: &str,
        note: &str,
    ) -> Result<Payment, AdminError> {
        #[derive(Deserialize)]
        struct Resp {
            payment: Payment,
        }

        let body = json!({
            "source_id": nonce,
            "idempotency_key": signing::random_id(),
            "amount_money": {"amount": to_cents(amount), "currency": currency},
            "location_id": location_id,
            "note": note,
        });
        let resp: Resp = self
            .send(self.http.post(self.url("/v2/payments")).json(&body))
            .await?;
        tracing::info!(payment_id = %resp.payment.id, amount, "Square payment created");
        Ok(resp.payment)
    }

    pub async fn get_payment(&self, payment_id: &str) -> Result<Payment, AdminError> {
        #[derive(Deserialize)]
        struct Resp {
            payment: Payment,
        }

        let resp: Resp = self
            .send(self.http.get(self.url(&format!(
                "/v2/payments/{}",
                urlencoding::encode(payment_id)
            ))))
            .await?;
        Ok(resp.payment)
    }

    /// Refunds `amount` dollars, or the full payment amount when `None`.
    pub async fn refund_payment(
        &self,
        payment_id: &str,
        amount: Option<f64>,
        reason: &str,
    ) -> Result<RefundSummary, AdminError> {
        #[derive(Deserialize)]
        struct Resp {
            refund: Refund,
        }

        let money = match amount {
            Some(a) => Money {
                amount: to_cents(a),
                currency: Some("USD".to_string()),
            },
            None => self.get_payment(payment_id).await?.amount_money,
        };
        let currency = money.currency.clone().unwrap_or_else(|| "USD".to_string());

        let body = json!({
            "idempotency_key": signing::random_id(),
            "payment_id": payment_id,
            "amount_money": {"amount": money.amount, "currency": currency},
            "reason": reason,
        });
        let resp: Resp = self
            .send(self.http.post(self.url("/v2/refunds")).json(&body))
            .await?;
        let refund = resp.refund;

        Ok(RefundSummary {
            refund_id: refund.id,
            status: refund.status.unwrap_or_else(|| "PENDING".to_string()),
            amount: from_cents(refund.amount_money.amount),
            currency: refund.amount_money.currency.unwrap_or(currency),
            reason: refund.reason.unwrap_or_else(|| reason.to_string()),
        })
    }

    /// Payments between optional RFC 3339 bounds.
    pub async fn list_payments(
        &self,
        begin_time: Option<&str>,
        end_time: Option<&str>,
    ) -> Result<Vec<Payment>, AdminError> {
        #[derive(Deserialize, Default)]
        #[serde(default)]
        struct Resp {
            payments: Vec<Payment>,
        }

        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(b) = begin_time {
            params.push(("begin_time", b));
        }
        if let Some(e) = end_time {
            params.push(("end_time", e));
        }
        let resp: Resp = self
            .send(self.http.get(self.url("/v2/payments")).query(&params))
            .await?;
        Ok(resp.payments)
    }
}

/// Checks `signature` against base64(HMAC-SHA256(secret, notification_url + body)).
pub fn verify_webhook_signature(secret: &str, notification_url: &str, body: &[u8], signature: &str) -> bool {
    signing::verify_base64(
        secret.as_bytes(),
        &[notification_url.as_bytes(), body],
        signature,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookOutcome {
    Processed,
    Ignored,
}

/// Logs the event and reports whether its type is one we act on.
pub fn handle_webhook_event(event: &Value) -> WebhookOutcome {
    let kind = event.get("type").and_then(Value::as_str).unwrap_or_default();
    let object = event.pointer("/data/object");
    let payment = object.and_then(|o| o.get("payment"));
    let refund = object.and_then(|o| o.get("refund"));
    let field = |v: Option<&Value>, key: &str| {
        v.and_then(|v| v.get(key))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let amount = |v: Option<&Value>| {
        from_cents(
            v.and_then(|v| v.pointer("/amount_money/amount"))
                .and_then(Value::as_i64)
                .unwrap_or(0),
        )
    };

    match kind {
        "payment.created" => {
            tracing::info!(
                payment_id = %field(payment, "id"),
                amount = amount(payment),
                status = %field(payment, "status"),
                "Square payment created"
            );
        }
        "payment.updated" => {
            let status = field(payment, "status");
            let payment_id = field(payment, "id");
            match status.as_str() {
                "COMPLETED" => tracing::info!(%payment_id, "Square payment completed"),
                "FAILED" => tracing::warn!(%payment_id, "Square payment failed"),
                _ => tracing::info!(%payment_id, %status, "Square payment updated"),
            }
        }
        "refund.created" => {
            tracing::info!(
                refund_id = %field(refund, "id"),
                payment_id = %field(refund, "payment_id"),
                amount = amount(refund),
                "Square refund created"
            );
        }
        "refund.updated" => {
            tracing::info!(
                refund_id = %field(refund, "id"),
                status = %field(refund, "status"),
                "Square refund updated"
            );
        }
        other => {
            tracing::info!(event_type = other, "Unhandled Square webhook event");
            return WebhookOutcome::Ignored;
        }
    }
    WebhookOutcome::Processed
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SquareClient {
        SquareClient::new(&settings::Square {
            access_token: "sq-token".into(),
            location_id: "LOC1".into(),
            base_url: Some(server.uri()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_cents_conversion_rounds() {
        assert_eq!(to_cents(10.0), 1000);
        assert_eq!(to_cents(19.99), 1999);
        assert_eq!(to_cents(0.005), 1);
        assert_eq!(from_cents(2550), 25.5);
    }

    #[test]
    fn test_webhook_signature() {
        let url = "https://admin.example.com/webhooks/square";
        let body = br#"{"type":"payment.created"}"#;
        let sig = signing::sign_base64(b"whsec", &[url.as_bytes(), body]);

        assert!(verify_webhook_signature("whsec", url, body, &sig));
        assert!(!verify_webhook_signature("whsec", "https://evil.example.com/webhooks/square", body, &sig));
        assert!(!verify_webhook_signature("other", url, body, &sig));
    }

    #[test]
    fn test_event_dispatch() {
        let created = json!({
            "type": "payment.created",
            "data": {"object": {"payment": {"id": "p1", "amount_money": {"amount": 1500}, "status": "APPROVED"}}}
        });
        assert_eq!(handle_webhook_event(&created), WebhookOutcome::Processed);
        assert_eq!(
            handle_webhook_event(&json!({"type": "refund.updated"})),
            WebhookOutcome::Processed
        );
        assert_eq!(
            handle_webhook_event(&json!({"type": "invoice.paid"})),
            WebhookOutcome::Ignored
        );
        assert_eq!(handle_webhook_event(&json!({})), WebhookOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_payment_link_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/online-checkout/payment-links"))
            .and(header("authorization", "Bearer sq-token"))
            .and(body_partial_json(json!({
                "quick_pay": {"price_money": {"amount": 2550, "currency": "USD"}, "location_id": "LOC1"},
                "pre_populated_data": {"buyer_email": "ana@example.com"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "payment_link": {"id": "pl_1", "url": "https://square.link/u/abc", "order_id": "ord_1"}
            })))
            .mount(&server)
            .await;

        let link = client_for(&server)
            .create_payment_link(25.50, "Recarga", "ana@example.com", "USD")
            .await
            .unwrap();
        assert_eq!(link.url, "https://square.link/u/abc");
        assert_eq!(link.order_id.as_deref(), Some("ord_1"));
    }

    #[tokio::test]
    async fn test_full_refund_fetches_payment_amount() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/payments/pay_9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "payment": {"id": "pay_9", "status": "COMPLETED", "amount_money": {"amount": 4000, "currency": "USD"}}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v2/refunds"))
            .and(body_partial_json(json!({"payment_id": "pay_9", "amount_money": {"amount": 4000}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "refund": {"id": "rf_1", "status": "PENDING", "amount_money": {"amount": 4000, "currency": "USD"}}
            })))
            .mount(&server)
            .await;

        let refund = client_for(&server)
            .refund_payment("pay_9", None, "Customer request")
            .await
            .unwrap();
        assert_eq!(refund.refund_id, "rf_1");
        assert_eq!(refund.amount, 40.0);
        assert_eq!(refund.reason, "Customer request");
    }

    #[tokio::test]
    async fn test_list_payments_passes_time_bounds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/payments"))
            .and(query_param("begin_time", "2026-01-01T00:00:00Z"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let payments = client_for(&server)
            .list_payments(Some("2026-01-01T00:00:00Z"), None)
            .await
            .unwrap();
        assert!(payments.is_empty());
    }

    #[tokio::test]
    async fn test_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/payments/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("NOT_FOUND"))
            .mount(&server)
            .await;

        let err = client_for(&server).get_payment("missing").await.unwrap_err();
        assert!(matches!(err, AdminError::Upstream { status: 404, .. }));
    }
}
