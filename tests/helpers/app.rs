use super::db::TestDb;
use cubalink_admin::settings::Settings;
use cubalink_admin::web::{self, AppState};
use reqwest::redirect::Policy;
use sea_orm::DatabaseConnection;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "s3cret-pass";
pub const WEBHOOK_SECRET: &str = "whsec-test";
pub const WEBHOOK_URL: &str = "https://admin.cubalink23.test/webhooks/square";

/// Settings with admin credentials and a webhook secret; every remote service
/// is unconfigured unless a test points it somewhere.
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.admin.username = ADMIN_USERNAME.to_string();
    settings.admin.password = ADMIN_PASSWORD.to_string();
    settings.admin.secret_key = "integration-test-secret".to_string();
    settings.square.webhook_secret = WEBHOOK_SECRET.to_string();
    settings.square.webhook_url = Some(WEBHOOK_URL.to_string());
    settings
}

/// In-process server on an ephemeral port with a cookie-keeping client that
/// does not follow redirects.
pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    db: TestDb,
}

impl TestApp {
    pub async fn spawn(settings: Settings) -> Self {
        let db = TestDb::new().await;
        let state =
            AppState::new(settings, db.connection().clone()).expect("Failed to build app state");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("No local addr");
        tokio::spawn(async move {
            axum::serve(listener, web::router(state))
                .await
                .expect("Test server failed");
        });

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .build()
            .expect("Failed to build client");

        Self {
            base_url: format!("http://{addr}"),
            client,
            db,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        self.db.connection()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn login(&self) -> reqwest::Response {
        self.client
            .post(self.url("/auth/login"))
            .form(&[("username", ADMIN_USERNAME), ("password", ADMIN_PASSWORD)])
            .send()
            .await
            .expect("Login request failed")
    }
}
