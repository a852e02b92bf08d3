use base64ct::{Base64UrlUnpadded, Encoding};
use miette::{IntoDiagnostic, Result};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub server: Server,
    pub database: Database,
    pub admin: Admin,
    pub supabase: Supabase,
    pub duffel: Duffel,
    pub square: Square,
    pub partners: Partners,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Server {
    pub host: String,
    pub port: u16,
    /// Public URL the panel is reached under, e.g. https://admin.cubalink23.com.
    /// Drives the Secure cookie flag and the default webhook notification URL.
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Database {
    /// SeaORM/SQLx connection string of the local fallback store
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Admin {
    pub username: String,
    pub password: String,
    /// HMAC key for session cookies. Generated at load time when empty.
    pub secret_key: String,
    pub session_ttl_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Supabase {
    pub url: String,
    pub key: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Duffel {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Square {
    pub access_token: String,
    pub application_id: String,
    pub location_id: String,
    /// `production` or `sandbox`
    pub environment: String,
    pub webhook_secret: String,
    /// Notification URL registered with Square, used verbatim for signature checks
    pub webhook_url: Option<String>,
    /// Overrides the environment-derived API host
    pub base_url: Option<String>,
    pub api_version: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Partners {
    pub transtur_url: String,
    pub probe_timeout_secs: u64,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            public_base_url: None,
        }
    }
}

impl Default for Database {
    fn default() -> Self {
        Self {
            url: "sqlite://cubalink_admin.db?mode=rwc".to_string(),
        }
    }
}

impl Default for Admin {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            secret_key: String::new(),
            session_ttl_secs: 8 * 3600,
        }
    }
}

impl Default for Supabase {
    fn default() -> Self {
        Self {
            url: String::new(),
            key: String::new(),
            timeout_secs: 30,
        }
    }
}

impl Default for Duffel {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.duffel.com".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for Square {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            application_id: String::new(),
            location_id: String::new(),
            environment: "sandbox".to_string(),
            webhook_secret: String::new(),
            webhook_url: None,
            base_url: None,
            api_version: "2024-10-17".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for Partners {
    fn default() -> Self {
        Self {
            transtur_url: "https://www.transtur.cu".to_string(),
            probe_timeout_secs: 10,
        }
    }
}

/// Flat variables of the legacy deployment and the keys they override.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("PORT", "server.port"),
    ("ADMIN_USERNAME", "admin.username"),
    ("ADMIN_PASSWORD", "admin.password"),
    ("SECRET_KEY", "admin.secret_key"),
    ("DUFFEL_API_KEY", "duffel.api_key"),
    ("SUPABASE_URL", "supabase.url"),
    ("SUPABASE_KEY", "supabase.key"),
    ("SQUARE_ACCESS_TOKEN", "square.access_token"),
    ("SQUARE_APPLICATION_ID", "square.application_id"),
    ("SQUARE_LOCATION_ID", "square.location_id"),
    ("SQUARE_ENVIRONMENT", "square.environment"),
    ("SQUARE_WEBHOOK_SECRET", "square.webhook_secret"),
];

impl Settings {
    pub fn load(path: &str) -> Result<Self> {
        Self::load_with_env(path, |name| std::env::var(name).ok())
    }

    /// Same as [`Settings::load`] but resolves the legacy flat variables through `lookup`.
    pub fn load_with_env<F>(path: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = config::Config::builder()
            .set_default("server.host", Server::default().host)
            .into_diagnostic()?
            .set_default("server.port", Server::default().port)
            .into_diagnostic()?
            .set_default("database.url", Database::default().url)
            .into_diagnostic()?;

        // Optional file
        if Path::new(path).exists() {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment overrides: CUBALINK__SERVER__PORT=9090, etc.
        builder = builder.add_source(config::Environment::with_prefix("CUBALINK").separator("__"));

        for (var, key) in LEGACY_ENV {
            let value = lookup(var).filter(|v| !v.trim().is_empty());
            builder = builder.set_override_option(*key, value).into_diagnostic()?;
        }

        let cfg = builder.build().into_diagnostic()?;
        let mut s: Settings = cfg.try_deserialize().into_diagnostic()?;

        if s.admin.secret_key.is_empty() {
            tracing::warn!("No admin secret key configured; generated an ephemeral one, sessions will not survive a restart");
            s.admin.secret_key = ephemeral_secret();
        }
        if s.admin.username.is_empty() || s.admin.password.is_empty() {
            tracing::warn!("Admin credentials are not configured; every login attempt will be rejected");
        }

        Ok(s)
    }

    /// Base URL the service is reachable under, without a trailing slash.
    pub fn public_url(&self) -> String {
        if let Some(base) = &self.server.public_base_url {
            base.trim_end_matches('/').to_string()
        } else {
            format!("http://{}:{}", self.server.host, self.server.port)
        }
    }
}

impl Supabase {
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.key.is_empty()
    }
}

impl Square {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn api_base(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None if self.is_production() => "https://connect.squareup.com".to_string(),
            None => "https://connect.squareupsandbox.com".to_string(),
        }
    }
}

fn ephemeral_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_settings_load_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nonexistent.toml");

        let settings = Settings::load_with_env(config_path.to_str().unwrap(), no_env)
            .expect("Failed to load settings");

        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.database.url, "sqlite://cubalink_admin.db?mode=rwc");
        assert_eq!(settings.admin.session_ttl_secs, 28800);
        assert_eq!(settings.duffel.base_url, "https://api.duffel.com");
        assert_eq!(settings.square.environment, "sandbox");
        assert!(settings.admin.username.is_empty());
        // Secret is generated rather than left empty
        assert!(!settings.admin.secret_key.is_empty());
    }

    #[test]
    fn test_settings_load_from_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("test_config.toml");

        let config_content = r#"
[server]
host = "127.0.0.1"
port = 9090
public_base_url = "https://admin.example.com"

[admin]
username = "root"
password = "hunter2"
secret_key = "file-secret"

[square]
environment = "production"
location_id = "LOC1"
"#;
        fs::write(&config_path, config_content).expect("Failed to write config");

        let settings = Settings::load_with_env(config_path.to_str().unwrap(), no_env)
            .expect("Failed to load settings");

        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.admin.username, "root");
        assert_eq!(settings.admin.secret_key, "file-secret");
        assert_eq!(settings.square.location_id, "LOC1");
        assert!(settings.square.is_production());
        assert_eq!(settings.square.api_base(), "https://connect.squareup.com");
        // Untouched fields of a partially specified section keep their defaults
        assert_eq!(settings.square.timeout_secs, 30);
    }

    #[test]
    fn test_legacy_env_overrides_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("test_config.toml");
        fs::write(
            &config_path,
            "[server]\nport = 8080\n[admin]\nusername = \"file-user\"\n",
        )
        .expect("Failed to write config");

        let vars: HashMap<&str, &str> = HashMap::from([
            ("PORT", "5055"),
            ("ADMIN_USERNAME", "env-user"),
            ("SUPABASE_URL", "https://project.supabase.co"),
            ("SUPABASE_KEY", "anon"),
            ("SQUARE_WEBHOOK_SECRET", ""),
        ]);
        let settings = Settings::load_with_env(config_path.to_str().unwrap(), |name| {
            vars.get(name).map(|v| v.to_string())
        })
        .expect("Failed to load settings");

        assert_eq!(settings.server.port, 5055);
        assert_eq!(settings.admin.username, "env-user");
        assert!(settings.supabase.is_configured());
        // Blank values do not override
        assert!(settings.square.webhook_secret.is_empty());
    }

    #[test]
    fn test_nested_env_override() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nonexistent.toml");

        env::set_var("CUBALINK__PARTNERS__TRANSTUR_URL", "http://transtur.test");

        let settings = Settings::load_with_env(config_path.to_str().unwrap(), no_env)
            .expect("Failed to load settings");

        assert_eq!(settings.partners.transtur_url, "http://transtur.test");

        env::remove_var("CUBALINK__PARTNERS__TRANSTUR_URL");
    }

    #[test]
    fn test_public_url() {
        let mut settings = Settings::default();
        settings.server.host = "localhost".to_string();
        assert_eq!(settings.public_url(), "http://localhost:3000");

        settings.server.public_base_url = Some("https://admin.example.com/".to_string());
        assert_eq!(settings.public_url(), "https://admin.example.com");
    }

    #[test]
    fn test_square_base_url_override() {
        let mut square = Square::default();
        assert_eq!(square.api_base(), "https://connect.squareupsandbox.com");
        square.base_url = Some("http://127.0.0.1:9999/".to_string());
        assert_eq!(square.api_base(), "http://127.0.0.1:9999");
    }
}
