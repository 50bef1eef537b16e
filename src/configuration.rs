use config::ConfigError;
use serde::Deserialize;

use crate::store::SessionPolicy;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    #[serde(default)]
    pub hashing: HashingSettings,
    #[serde(default)]
    pub webhooks: WebhookSettings,
}

/// Which backend the stores are built on
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    #[serde(default = "default_storage")]
    pub storage: StorageBackend,
    /// Directory served under `/app`
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            username: "postgres".to_string(),
            password: "password".to_string(),
            port: 5432,
            host: "localhost".to_string(),
            database_name: "chirpy".to_string(),
        }
    }
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    /// Connection string for the server itself, used to create databases
    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// JWT and session settings
#[derive(Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64, // seconds, 30 days by default
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry: i64, // seconds, 60 days by default
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default)]
    pub session_policy: SessionPolicy,
}

#[derive(Deserialize, Clone)]
pub struct HashingSettings {
    #[serde(default = "default_bcrypt_cost")]
    pub cost: u32,
}

impl Default for HashingSettings {
    fn default() -> Self {
        Self {
            cost: default_bcrypt_cost(),
        }
    }
}

/// Shared secrets for machine-to-machine callers
#[derive(Deserialize, Clone, Default)]
pub struct WebhookSettings {
    #[serde(default)]
    pub polka_key: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_storage() -> StorageBackend {
    StorageBackend::Postgres
}

fn default_static_dir() -> String {
    "./public".to_string()
}

fn default_access_token_expiry() -> i64 {
    30 * 24 * 60 * 60
}

fn default_refresh_token_expiry() -> i64 {
    60 * 24 * 60 * 60
}

fn default_issuer() -> String {
    "chirpy".to_string()
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

/// Load settings from `configuration.{yaml,toml,json}` and `APP_*` environment variables.
///
/// Environment values win, e.g. `APP_JWT__SECRET` or `APP_APPLICATION__PORT`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}
