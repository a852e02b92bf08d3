use crate::settings::Settings;
use crate::signing;
use axum::http::HeaderMap;

pub const SESSION_COOKIE_NAME: &str = "cubalink_admin_session";

/// Signed admin session cookie: `<session_id>.<hmac(session_id)>`.
#[derive(Clone, Debug)]
pub struct SessionCookie {
    pub session_id: String,
}

impl SessionCookie {
    pub fn new(session_id: String) -> Self {
        Self { session_id }
    }

    /// Returns the cookie only if its signature matches `secret`.
    pub fn from_headers(headers: &HeaderMap, secret: &str) -> Option<Self> {
        let cookie_header = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;

        for cookie in cookie_header.split(';') {
            let cookie = cookie.trim();
            if let Some(value) = cookie
                .strip_prefix(SESSION_COOKIE_NAME)
                .and_then(|s| s.strip_prefix('='))
            {
                let (session_id, signature) = value.rsplit_once('.')?;
                if session_id.is_empty()
                    || !signing::verify_urlsafe(secret.as_bytes(), session_id.as_bytes(), signature)
                {
                    return None;
                }
                return Some(Self::new(session_id.to_string()));
            }
        }
        None
    }

    pub fn to_cookie_header(&self, settings: &Settings) -> String {
        let secure = settings.public_url().starts_with("https://");
        let signature = signing::sign_urlsafe(
            settings.admin.secret_key.as_bytes(),
            self.session_id.as_bytes(),
        );

        format!(
            "{}={}.{}; HttpOnly; {}SameSite=Lax; Path=/; Max-Age={}",
            SESSION_COOKIE_NAME,
            self.session_id,
            signature,
            if secure { "Secure; " } else { "" },
            settings.admin.session_ttl_secs
        )
    }

    pub fn delete_cookie_header() -> String {
        format!(
            "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0",
            SESSION_COOKIE_NAME
        )
    }
}

/// Checks submitted credentials against the configured admin pair.
/// Unconfigured credentials never match.
pub fn credentials_match(settings: &Settings, username: &str, password: &str) -> bool {
    let admin = &settings.admin;
    if admin.username.is_empty() || admin.password.is_empty() {
        return false;
    }
    let user_ok = signing::digest_eq(username, &admin.username);
    let pass_ok = signing::digest_eq(password, &admin.password);
    user_ok & pass_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};

    fn settings() -> Settings {
        let mut s = Settings::default();
        s.admin.username = "admin".into();
        s.admin.password = "s3cret".into();
        s.admin.secret_key = "test-key".into();
        s
    }

    fn headers_with(cookie: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        h
    }

    #[test]
    fn test_cookie_roundtrip() {
        let s = settings();
        let set_cookie = SessionCookie::new("abc".into()).to_cookie_header(&s);
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("Max-Age=28800"));
        assert!(!set_cookie.contains("Secure"));

        let pair = set_cookie.split(';').next().unwrap();
        let parsed = SessionCookie::from_headers(&headers_with(&format!("theme=dark; {pair}")), "test-key")
            .expect("cookie should parse");
        assert_eq!(parsed.session_id, "abc");
    }

    #[test]
    fn test_cookie_rejects_tampering() {
        let s = settings();
        let set_cookie = SessionCookie::new("abc".into()).to_cookie_header(&s);
        let pair = set_cookie.split(';').next().unwrap();
        let forged = pair.replace("abc.", "abd.");

        assert!(SessionCookie::from_headers(&headers_with(&forged), "test-key").is_none());
        assert!(SessionCookie::from_headers(&headers_with(pair), "other-key").is_none());
        assert!(SessionCookie::from_headers(
            &headers_with("cubalink_admin_session=unsigned"),
            "test-key"
        )
        .is_none());
    }

    #[test]
    fn test_secure_flag_follows_public_url() {
        let mut s = settings();
        s.server.public_base_url = Some("https://admin.example.com".into());
        let set_cookie = SessionCookie::new("abc".into()).to_cookie_header(&s);
        assert!(set_cookie.contains("Secure; "));
    }

    #[test]
    fn test_credentials_match() {
        let s = settings();
        assert!(credentials_match(&s, "admin", "s3cret"));
        assert!(!credentials_match(&s, "admin", "wrong"));
        assert!(!credentials_match(&s, "root", "s3cret"));

        let unconfigured = Settings::default();
        assert!(!credentials_match(&unconfigured, "", ""));
    }
}
