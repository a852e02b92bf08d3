use super::{html_escape, AppState};
use crate::models::LoginForm;
use crate::session::{credentials_match, SessionCookie};
use crate::storage;
use axum::body::Body;
use axum::extract::{Form, State};
use axum::http::{header, HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;

pub(super) fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::to("/admin/") }))
        .route("/auth/login", get(login_page).post(login_submit))
        .route("/auth/logout", get(logout))
        .route("/admin/login", get(|| async { Redirect::to("/auth/login") }))
}

pub(super) fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin", get(dashboard))
        .route("/admin/", get(dashboard))
}

/// Lets the request through only with a signed cookie naming a live session.
pub(super) async fn require_admin(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(cookie) =
        SessionCookie::from_headers(request.headers(), &state.settings.admin.secret_key)
    else {
        return Redirect::to("/auth/login").into_response();
    };

    match storage::get_admin_session(&state.db, &cookie.session_id).await {
        Ok(Some(session)) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Ok(None) => Redirect::to("/auth/login").into_response(),
        Err(e) => {
            tracing::error!(error = %e, "session lookup failed");
            Redirect::to("/auth/login").into_response()
        }
    }
}

fn render_login(error: Option<&str>) -> Html<String> {
    let error_html = error
        .map(|e| format!("<p class='error'>{}</p>", html_escape(e)))
        .unwrap_or_default();

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Cubalink23 Admin - Login</title>
    <link rel="stylesheet" href="/static/admin.css">
</head>
<body class="login">
    <h1>Cubalink23 Admin</h1>
    {error_html}
    <form method="post" action="/auth/login">
        <label for="username">Username</label>
        <input type="text" id="username" name="username" autocomplete="username" required>
        <label for="password">Password</label>
        <input type="password" id="password" name="password" autocomplete="current-password" required>
        <button type="submit">Sign in</button>
    </form>
</body>
</html>"#
    ))
}

async fn login_page() -> Html<String> {
    render_login(None)
}

async fn login_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    if !credentials_match(&state.settings, &form.username, &form.password) {
        tracing::warn!(username = %form.username, "admin login rejected");
        return render_login(Some("Invalid credentials")).into_response();
    }

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(String::from);

    let session = match storage::create_admin_session(
        &state.db,
        &form.username,
        state.settings.admin.session_ttl_secs,
        user_agent,
    )
    .await
    {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "could not create admin session");
            return render_login(Some("Could not start a session, try again")).into_response();
        }
    };

    tracing::info!(username = %session.username, "admin logged in");
    let cookie = SessionCookie::new(session.session_id).to_cookie_header(&state.settings);
    ([(header::SET_COOKIE, cookie)], Redirect::to("/admin/")).into_response()
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(cookie) = SessionCookie::from_headers(&headers, &state.settings.admin.secret_key) {
        if let Err(e) = storage::delete_admin_session(&state.db, &cookie.session_id).await {
            tracing::warn!(error = %e, "could not delete admin session");
        }
    }

    (
        [(header::SET_COOKIE, SessionCookie::delete_cookie_header())],
        Redirect::to("/auth/login"),
    )
        .into_response()
}

async fn dashboard(State(state): State<AppState>) -> Html<String> {
    let status = |ok: bool| if ok { "connected" } else { "not configured" };
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Cubalink23 Admin</title>
    <link rel="stylesheet" href="/static/admin.css">
</head>
<body>
    <header><strong>Cubalink23 Admin</strong><a href="/auth/logout">Log out</a></header>
    <main>
        <section>
            <h2>Services</h2>
            <ul>
                <li>Supabase: {supabase}</li>
                <li>Duffel: {duffel}</li>
                <li>Square: {square} ({environment})</li>
            </ul>
        </section>
        <section>
            <h2>Stats</h2>
            <pre id="stats">Loading...</pre>
        </section>
    </main>
    <script>
        fetch('/admin/stats').then(r => r.json()).then(s => {{
            document.getElementById('stats').textContent = JSON.stringify(s, null, 2);
        }});
    </script>
</body>
</html>"#,
        supabase = status(state.supabase.is_configured()),
        duffel = status(state.duffel.is_configured()),
        square = status(state.square.is_available()),
        environment = html_escape(state.square.environment()),
    ))
}
