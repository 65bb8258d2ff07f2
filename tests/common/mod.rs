use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use campestre_reset::config::Config;
use campestre_reset::db;
use campestre_reset::email::{Mailer, SharedMailer};
use campestre_reset::models::{Account, PasswordResetToken};
use campestre_reset::password;

/// One delivered (or attempted) message captured by the fake mailer.
#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// In-memory stand-in for the SMTP collaborator. Records every send; flip
/// `set_failing` to make subsequent sends error like a dead relay.
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), String> {
        if self.failing.load(Ordering::SeqCst) {
            return Err("SMTP connection refused".to_string());
        }
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html_body.to_string(),
        });
        Ok(())
    }
}

/// Pull the reset token out of a captured email body (the link embeds it as
/// a hex query parameter).
pub fn extract_token(html: &str) -> String {
    let start = html.find("token=").expect("no token in email body") + "token=".len();
    html[start..]
        .chars()
        .take_while(|c| c.is_ascii_hexdigit())
        .collect()
}

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub db_name: String,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Insert an account the way the wider platform would have.
    pub async fn seed_account(&self, email: &str, plain_password: &str, name: &str) -> Account {
        let hash = password::hash(plain_password).expect("password hash failed");
        db::accounts::create(&self.pool, email, &hash, name)
            .await
            .expect("seed account failed")
    }

    /// Insert a token row directly, bypassing issuance (for expiry cases).
    pub async fn seed_token(
        &self,
        account_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> PasswordResetToken {
        db::reset_tokens::create(&self.pool, account_id, token, Utc::now(), expires_at)
            .await
            .expect("seed token failed")
    }

    pub async fn account_by_email(&self, email: &str) -> Account {
        db::accounts::find_by_email(&self.pool, email)
            .await
            .expect("account lookup failed")
            .expect("account not found")
    }

    pub async fn tokens_for(&self, account_id: Uuid) -> Vec<PasswordResetToken> {
        db::reset_tokens::list_for_account(&self.pool, account_id)
            .await
            .expect("token listing failed")
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn forgot_password(&self, email: &str) -> (Value, StatusCode) {
        self.post_json("/api/v1/auth/forgot-password", &json!({ "email": email }))
            .await
    }

    pub async fn verify_token(&self, token: &str) -> (Value, StatusCode) {
        self.post_json("/api/v1/auth/verify-reset-token", &json!({ "token": token }))
            .await
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> (Value, StatusCode) {
        self.post_json(
            "/api/v1/auth/reset-password",
            &json!({ "token": token, "newPassword": new_password }),
        )
        .await
    }
}

/// Spawn a test app with a fresh temporary database and a recording mailer.
pub async fn spawn_app() -> TestApp {
    spawn_app_inner(true).await
}

/// Variant with no mailer wired up: issuance falls back to logging the
/// token, which is the unconfigured-SMTP development behavior.
pub async fn spawn_app_without_mailer() -> TestApp {
    spawn_app_inner(false).await
}

async fn spawn_app_inner(with_mailer: bool) -> TestApp {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    // Create a unique test database
    let db_name = format!(
        "campestre_reset_test_{}",
        Uuid::now_v7().to_string().replace('-', "")
    );

    // Connect to default postgres DB to create test DB
    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    // Connect to test DB and run migrations
    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let config = Config {
        database_url: test_url,
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        base_url: "http://localhost:0".to_string(),
        max_body_size: 65_536,
        log_level: "warn".to_string(),
        smtp: None,
    };

    let mailer = Arc::new(RecordingMailer::new());
    let shared: Option<SharedMailer> = if with_mailer {
        Some(mailer.clone())
    } else {
        None
    };
    let (app, _state) = campestre_reset::build_app(pool.clone(), config, shared);

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    // Spawn server in background
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service())
            .await
            .expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        pool,
        client,
        db_name,
        mailer,
    }
}

/// Drop the test database after tests complete.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
