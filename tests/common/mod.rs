//! Shared helpers for the integration tests
#![allow(dead_code)]

use std::net::TcpListener;

use chirpy::auth::AccessTokenCodec;
use chirpy::configuration::{get_configuration, DatabaseSettings, Settings, StorageBackend};
use chirpy::startup::{build_state, run};
use chirpy::store::SessionPolicy;
use serde_json::{json, Value};
use sqlx::{Connection, Executor, PgConnection, PgPool};
use uuid::Uuid;

pub const POLKA_KEY: &str = "test-polka-key";

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    /// Codec sharing the server's secret, for forging tokens in tests
    pub tokens: AccessTokenCodec,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_policy(SessionPolicy::SingleSession).await
}

pub async fn spawn_app_with_policy(policy: SessionPolicy) -> TestApp {
    spawn_app_with(|configuration| configuration.jwt.session_policy = policy).await
}

/// Spawn the app on a freshly created Postgres database
pub async fn spawn_app_on_postgres() -> TestApp {
    spawn_app_with(|configuration| {
        configuration.application.storage = StorageBackend::Postgres;
        configuration.database.database_name = Uuid::new_v4().to_string();
    })
    .await
}

/// Spawn the app with the test defaults, then apply `customize`
pub async fn spawn_app_with(customize: impl FnOnce(&mut Settings)) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.application.storage = StorageBackend::Memory;
    configuration.application.static_dir = "./public".to_string();
    configuration.hashing.cost = 4;
    configuration.webhooks.polka_key = POLKA_KEY.to_string();
    customize(&mut configuration);

    if configuration.application.storage == StorageBackend::Postgres {
        create_database(&configuration.database).await;
    }

    let tokens = AccessTokenCodec::new(&configuration.jwt).expect("Failed to build codec");
    let state = build_state(&configuration)
        .await
        .expect("Failed to build application state");
    let server = run(listener, state, configuration.application.static_dir.clone())
        .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        client: reqwest::Client::new(),
        tokens,
    }
}

/// Create the database named in `config` and return a pool on it
///
/// Migrations are left to the store under test.
pub async fn create_database(config: &DatabaseSettings) -> PgPool {
    let mut connection = PgConnection::connect(&config.connection_string_without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("Failed to create database.");

    PgPool::connect(&config.connection_string())
        .await
        .expect("Failed to connect to Postgres.")
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn create_user(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/users"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Create an account, log in, and return the login response body
    pub async fn signed_in_user(&self, email: &str, password: &str) -> Value {
        assert_eq!(201, self.create_user(email, password).await.status().as_u16());
        let response = self.login(email, password).await;
        assert_eq!(200, response.status().as_u16());
        response.json().await.expect("Failed to parse login response")
    }

    pub async fn post_with_bearer(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_chirp(&self, token: &str, body: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/chirps"))
            .bearer_auth(token)
            .json(&json!({ "body": body }))
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

pub fn token_of(login: &Value) -> String {
    login["token"].as_str().expect("token missing").to_string()
}

pub fn refresh_token_of(login: &Value) -> String {
    login["refresh_token"]
        .as_str()
        .expect("refresh_token missing")
        .to_string()
}
