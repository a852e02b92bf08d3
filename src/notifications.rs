//! Push notifications: an in-process FIFO mailbox the app polls, backed by
//! the Supabase `notifications` table as history.

use crate::errors::AdminError;
use crate::models::NotificationInput;
use crate::supabase::SupabaseClient;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub is_urgent: bool,
    pub sent_at: String,
    pub status: String,
}

pub struct NotificationService {
    supabase: SupabaseClient,
    mailbox: Mutex<VecDeque<Notification>>,
    next_id: AtomicU64,
}

impl NotificationService {
    pub fn new(supabase: SupabaseClient) -> Self {
        Self {
            supabase,
            mailbox: Mutex::new(VecDeque::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Validates, records remotely (best effort) and enqueues a notification.
    pub async fn send(&self, input: NotificationInput) -> Result<Notification, AdminError> {
        let title = input.title.as_deref().unwrap_or_default().trim().to_string();
        let message = input.message.as_deref().unwrap_or_default().trim().to_string();
        if title.is_empty() || message.is_empty() {
            return Err(AdminError::bad_request("Title and message are required"));
        }

        let notification = Notification {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            title,
            message,
            kind: input.kind.unwrap_or_else(|| "all".to_string()),
            is_urgent: input.is_urgent.unwrap_or(false),
            sent_at: Utc::now().to_rfc3339(),
            status: "sent".to_string(),
        };

        let row = json!({
            "title": notification.title,
            "message": notification.message,
            "type": notification.kind,
            "is_urgent": notification.is_urgent,
            "sent_at": notification.sent_at,
            "status": notification.status,
        });
        match self.supabase.from("notifications").insert(&row).await {
            Ok(_) => tracing::info!(id = notification.id, title = %notification.title, "notification stored"),
            Err(e) => tracing::warn!(id = notification.id, error = %e, "notification not stored remotely"),
        }

        self.mailbox.lock().await.push_back(notification.clone());
        Ok(notification)
    }

    /// Pops the oldest undelivered notification.
    pub async fn next(&self) -> Option<Notification> {
        self.mailbox.lock().await.pop_front()
    }

    /// Notifications queued but not yet handed out by `next`.
    pub async fn pending(&self) -> usize {
        self.mailbox.lock().await.len()
    }

    /// Latest notifications, newest first. Remote failures yield an empty list.
    pub async fn history(&self) -> Vec<Value> {
        match self
            .supabase
            .from("notifications")
            .order("sent_at", true)
            .limit(HISTORY_LIMIT)
            .execute()
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, "could not load notification history");
                Vec::new()
            }
        }
    }

    pub async fn delete(&self, id: &str) -> Result<(), AdminError> {
        self.supabase
            .from("notifications")
            .eq("id", id)
            .delete()
            .await?;
        Ok(())
    }

    /// Records an admin-facing notification; failures are logged only.
    pub async fn notify_admin(&self, row: Value) -> bool {
        self.record("notifications", row).await
    }

    /// Records a notification addressed to an app user; failures are logged only.
    pub async fn notify_user(&self, row: Value) -> bool {
        self.record("user_notifications", row).await
    }

    async fn record(&self, table: &str, mut row: Value) -> bool {
        if let Some(obj) = row.as_object_mut() {
            obj.entry("created_at")
                .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
        }
        match self.supabase.from(table).insert(&row).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(table, error = %e, "notification not recorded");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn offline_service() -> NotificationService {
        NotificationService::new(SupabaseClient::new(&settings::Supabase::default()).unwrap())
    }

    fn input(title: &str, message: &str) -> NotificationInput {
        NotificationInput {
            title: Some(title.to_string()),
            message: Some(message.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_send_rejects_blank_fields() {
        let svc = offline_service();
        let err = svc.send(input("   ", "hola")).await.unwrap_err();
        assert!(matches!(err, AdminError::BadRequest(_)));
        assert!(svc.send(NotificationInput::default()).await.is_err());
        assert_eq!(svc.pending().await, 0);
    }

    #[tokio::test]
    async fn test_mailbox_is_fifo_with_increasing_ids() {
        let svc = offline_service();
        let first = svc.send(input(" Oferta ", "Vuelos a La Habana")).await.unwrap();
        let second = svc.send(input("Aviso", "Mantenimiento")).await.unwrap();

        assert_eq!(first.title, "Oferta");
        assert_eq!(first.kind, "all");
        assert!(second.id > first.id);

        assert_eq!(svc.next().await.unwrap().id, first.id);
        assert_eq!(svc.next().await.unwrap().id, second.id);
        assert!(svc.next().await.is_none());
    }

    #[tokio::test]
    async fn test_history_falls_back_to_empty() {
        let svc = offline_service();
        assert!(svc.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_send_persists_and_history_reads_remote() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/notifications"))
            .and(body_partial_json(json!({"title": "Promo", "status": "sent", "type": "all"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{"id": 1}])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/notifications"))
            .and(query_param("order", "sent_at.desc"))
            .and(query_param("limit", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "title": "Promo"}])))
            .mount(&server)
            .await;

        let svc = NotificationService::new(
            SupabaseClient::new(&settings::Supabase {
                url: server.uri(),
                key: "k".into(),
                timeout_secs: 5,
            })
            .unwrap(),
        );
        svc.send(input("Promo", "20% off")).await.unwrap();
        let history = svc.history().await;
        assert_eq!(history[0]["title"], "Promo");
    }
}
