//! HTTP surface of the admin panel. Public app endpoints and the
//! session-gated admin API share one router; every handler is independent.

mod auth;
mod banners;
mod flights;
mod notifications;
mod orders;
mod partners;
mod payments;
mod products;
mod rentals;
mod system;
mod users;
mod vehicles;
mod webhooks;

use crate::duffel::DuffelClient;
use crate::errors::AdminError;
use crate::fallback::Sourced;
use crate::notifications::NotificationService;
use crate::partners::PartnersDesk;
use crate::settings::Settings;
use crate::square::SquareClient;
use crate::supabase::SupabaseClient;
use axum::body::Body;
use axum::extract::FromRequest;
use axum::http::{HeaderName, HeaderValue, Request};
use axum::middleware::{self, Next};
use axum::response::IntoResponse;
use axum::{Json, Router};
use miette::IntoDiagnostic;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::services::ServeDir;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub db: DatabaseConnection,
    pub supabase: SupabaseClient,
    pub duffel: DuffelClient,
    pub square: SquareClient,
    pub notifications: Arc<NotificationService>,
    pub partners: Arc<PartnersDesk>,
}

impl AppState {
    pub fn new(settings: Settings, db: DatabaseConnection) -> Result<Self, AdminError> {
        let supabase = SupabaseClient::new(&settings.supabase)?;
        Ok(Self {
            duffel: DuffelClient::new(&settings.duffel)?,
            square: SquareClient::new(&settings.square)?,
            notifications: Arc::new(NotificationService::new(supabase.clone())),
            partners: Arc::new(PartnersDesk::new(&settings.partners)?),
            supabase,
            settings: Arc::new(settings),
            db,
        })
    }
}

/// JSON body whose rejections render as `{"success":false,"error":...}` with 400.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AdminError))]
pub struct JsonBody<T>(pub T);

/// `{"success":true, <key>: rows, "source": ...}` for fallback-backed reads and writes.
pub(crate) fn sourced_json<T: Serialize>(key: &str, sourced: Sourced<T>) -> Json<Value> {
    Json(json!({
        "success": true,
        key: sourced.data,
        "source": sourced.source,
    }))
}

async fn security_headers(request: Request<Body>, next: Next) -> impl IntoResponse {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("DENY"),
    );
    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        HeaderName::from_static("x-xss-protection"),
        HeaderValue::from_static("1; mode=block"),
    );
    // The dashboard shell loads product and banner images from remote hosts
    headers.insert(
        HeaderName::from_static("content-security-policy"),
        HeaderValue::from_static("default-src 'self'; script-src 'self' 'unsafe-inline'; style-src 'self' 'unsafe-inline'; img-src 'self' data: https:; form-action 'self'"),
    );
    headers.insert(
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static("geolocation=(), microphone=(), camera=()"),
    );

    response
}

pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .merge(auth::public_routes())
        .merge(system::public_routes())
        .merge(flights::routes())
        .merge(banners::public_routes())
        .merge(notifications::public_routes())
        .merge(payments::routes())
        .merge(webhooks::routes());

    let admin = Router::new()
        .merge(auth::admin_routes())
        .merge(system::admin_routes())
        .merge(products::routes())
        .merge(banners::admin_routes())
        .merge(users::routes())
        .merge(orders::routes())
        .merge(notifications::admin_routes())
        .merge(rentals::routes())
        .merge(partners::routes())
        .merge(vehicles::routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    Router::new()
        .merge(public)
        .merge(admin)
        .nest_service("/static", ServeDir::new("static"))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

pub async fn serve(state: AppState) -> miette::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        state.settings.server.host, state.settings.server.port
    )
    .parse()
    .map_err(|e| miette::miette!("bad listen addr: {e}"))?;

    let app = router(state);

    tracing::info!(%addr, "Admin panel listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .into_diagnostic()?;
    axum::serve(listener, app).await.into_diagnostic()?;
    Ok(())
}

pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// First row of a filtered remote update or delete; no rows means the id is
/// unknown to Supabase.
pub(crate) fn first_row(rows: Vec<Value>, resource: &str, id: &str) -> Result<Value, AdminError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| AdminError::not_found(format!("{resource} {id} not found")))
}

/// Parses a numeric path id for the local store.
pub(crate) fn local_id(id: &str) -> Result<i64, AdminError> {
    id.parse()
        .map_err(|_| AdminError::not_found(format!("Unknown id {id}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape("<b>\"Tom\" & 'Jerry'</b>"),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#x27;Jerry&#x27;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_local_id() {
        assert_eq!(local_id("42").unwrap(), 42);
        assert!(matches!(local_id("uuid-like").unwrap_err(), AdminError::NotFound(_)));
    }
}
