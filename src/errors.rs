use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use miette::Diagnostic;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum AdminError {
    #[error("I/O error: {0}")]
    #[diagnostic(code(cubalink::io))]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    #[diagnostic(
        code(cubalink::config),
        help("Check config.toml and the CUBALINK__* / legacy environment variables")
    )]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(cubalink::serde))]
    Serde(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    #[diagnostic(code(cubalink::db))]
    Db(#[from] sea_orm::DbErr),

    #[error("HTTP client error: {0}")]
    #[diagnostic(code(cubalink::http))]
    Http(#[from] reqwest::Error),

    #[error("{service} responded with status {status}: {body}")]
    #[diagnostic(code(cubalink::upstream))]
    Upstream {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{0} is not configured")]
    #[diagnostic(
        code(cubalink::not_configured),
        help("Set the matching credentials in the environment or config file")
    )]
    NotConfigured(&'static str),

    #[error("{0}")]
    #[diagnostic(code(cubalink::bad_request))]
    BadRequest(String),

    #[error("{0}")]
    #[diagnostic(code(cubalink::not_found))]
    NotFound(String),

    #[error("{0}")]
    #[diagnostic(code(cubalink::unauthorized))]
    Unauthorized(String),

    #[error("{0}")]
    #[diagnostic(code(cubalink::other))]
    Other(String),
}

impl AdminError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        AdminError::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AdminError::NotFound(msg.into())
    }

    /// Supabase could not be reached or refused the call. Only these
    /// trigger the local fallback; an answer such as "no such row" does not.
    pub fn is_remote_failure(&self) -> bool {
        matches!(
            self,
            AdminError::Http(_) | AdminError::Upstream { .. } | AdminError::NotConfigured(_)
        )
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AdminError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AdminError::NotFound(_) => StatusCode::NOT_FOUND,
            AdminError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AdminError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            AdminError::Upstream { .. } | AdminError::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AdminError {
    fn from(value: JsonRejection) -> Self {
        AdminError::BadRequest(format!("Invalid JSON body: {}", value.body_text()))
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = json!({ "success": false, "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
