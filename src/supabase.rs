//! Minimal PostgREST client for the Supabase project backing the app.

use crate::errors::AdminError;
use crate::settings;
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct SupabaseClient {
    url: String,
    key: String,
    http: Client,
}

impl SupabaseClient {
    pub fn new(cfg: &settings::Supabase) -> Result<Self, AdminError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            url: cfg.url.trim_end_matches('/').to_string(),
            key: cfg.key.clone(),
            http,
        })
    }

    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.key.is_empty()
    }

    /// Starts a query against `table`.
    pub fn from(&self, table: &str) -> Query<'_> {
        Query {
            client: self,
            table: table.to_string(),
            params: Vec::new(),
            filtered: false,
        }
    }

    fn request(&self, method: Method, table: &str) -> Result<RequestBuilder, AdminError> {
        if !self.is_configured() {
            return Err(AdminError::NotConfigured("Supabase"));
        }
        Ok(self
            .http
            .request(method, format!("{}/rest/v1/{}", self.url, table))
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .header("Content-Type", "application/json"))
    }
}

/// PostgREST query: `col=eq.v` filters, `order=col.desc`, `limit=n`.
#[derive(Debug)]
pub struct Query<'a> {
    client: &'a SupabaseClient,
    table: String,
    params: Vec<(String, String)>,
    filtered: bool,
}

impl<'a> Query<'a> {
    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".into(), columns.into()));
        self
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.params
            .push((column.into(), format!("eq.{}", value.to_string())));
        self.filtered = true;
        self
    }

    pub fn order(mut self, column: &str, descending: bool) -> Self {
        let dir = if descending { "desc" } else { "asc" };
        self.params.push(("order".into(), format!("{column}.{dir}")));
        self
    }

    pub fn limit(mut self, count: usize) -> Self {
        self.params.push(("limit".into(), count.to_string()));
        self
    }

    pub async fn execute(self) -> Result<Vec<Value>, AdminError> {
        let req = self.client.request(Method::GET, &self.table)?.query(&self.params);
        match send(req).await? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            other => Ok(vec![other]),
        }
    }

    /// Inserts one row and returns the stored representation.
    pub async fn insert<T: Serialize + ?Sized>(self, row: &T) -> Result<Value, AdminError> {
        let req = self
            .client
            .request(Method::POST, &self.table)?
            .query(&self.params)
            .header("Prefer", "return=representation")
            .json(row);
        Ok(first_row(send(req).await?))
    }

    /// Updates every matching row. Refuses to run without a filter.
    pub async fn update<T: Serialize + ?Sized>(self, changes: &T) -> Result<Vec<Value>, AdminError> {
        self.require_filter("update")?;
        let req = self
            .client
            .request(Method::PATCH, &self.table)?
            .query(&self.params)
            .header("Prefer", "return=representation")
            .json(changes);
        Ok(rows(send(req).await?))
    }

    /// Deletes every matching row. Refuses to run without a filter.
    pub async fn delete(self) -> Result<Vec<Value>, AdminError> {
        self.require_filter("delete")?;
        let req = self
            .client
            .request(Method::DELETE, &self.table)?
            .query(&self.params)
            .header("Prefer", "return=representation");
        Ok(rows(send(req).await?))
    }

    fn require_filter(&self, op: &str) -> Result<(), AdminError> {
        if self.filtered {
            Ok(())
        } else {
            Err(AdminError::Other(format!(
                "refusing unfiltered {op} on {}",
                self.table
            )))
        }
    }
}

async fn send(req: RequestBuilder) -> Result<Value, AdminError> {
    let response = req.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(AdminError::Upstream {
            service: "Supabase",
            status: status.as_u16(),
            body,
        });
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&body)?)
}

fn rows(value: Value) -> Vec<Value> {
    match value {
        Value::Array(rows) => rows,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

fn first_row(value: Value) -> Value {
    match value {
        Value::Array(mut rows) if !rows.is_empty() => rows.swap_remove(0),
        Value::Array(_) => Value::Null,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SupabaseClient {
        SupabaseClient::new(&settings::Supabase {
            url: server.uri(),
            key: "anon-key".into(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_select_with_order_and_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/notifications"))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer anon-key"))
            .and(query_param("order", "sent_at.desc"))
            .and(query_param("limit", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 2, "title": "b"},
                {"id": 1, "title": "a"}
            ])))
            .mount(&server)
            .await;

        let rows = client_for(&server)
            .from("notifications")
            .order("sent_at", true)
            .limit(50)
            .execute()
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], 2);
    }

    #[tokio::test]
    async fn test_insert_returns_representation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/products"))
            .and(header("prefer", "return=representation"))
            .and(body_json(json!({"name": "Ron", "price": 12.0})))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!([{"id": 9, "name": "Ron"}])),
            )
            .mount(&server)
            .await;

        let row = client_for(&server)
            .from("products")
            .insert(&json!({"name": "Ron", "price": 12.0}))
            .await
            .unwrap();
        assert_eq!(row["id"], 9);
    }

    #[tokio::test]
    async fn test_update_and_delete_use_eq_filter() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/orders"))
            .and(query_param("id", "eq.5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 5, "status": "shipped"}])))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/orders"))
            .and(query_param("id", "eq.5"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let updated = client
            .from("orders")
            .eq("id", 5)
            .update(&json!({"status": "shipped"}))
            .await
            .unwrap();
        assert_eq!(updated[0]["status"], "shipped");

        let deleted = client.from("orders").eq("id", 5).delete().await.unwrap();
        assert!(deleted.is_empty());
    }

    #[tokio::test]
    async fn test_unfiltered_delete_is_refused() {
        let server = MockServer::start().await;
        let err = client_for(&server).from("orders").delete().await.unwrap_err();
        assert!(matches!(err, AdminError::Other(_)));
    }

    #[tokio::test]
    async fn test_error_status_becomes_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let err = client_for(&server).from("users").execute().await.unwrap_err();
        match err {
            AdminError::Upstream { status, body, .. } => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unconfigured_client() {
        let client = SupabaseClient::new(&settings::Supabase::default()).unwrap();
        assert!(!client.is_configured());
        let err = client.from("users").execute().await.unwrap_err();
        assert!(matches!(err, AdminError::NotConfigured("Supabase")));
    }
}
