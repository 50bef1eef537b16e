use actix_files as fs;
use actix_web::dev::Server;
use actix_web::{guard, middleware::Logger, web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{generate_refresh_token, self_check, AccessTokenCodec, CredentialHasher};
use crate::configuration::{Settings, StorageBackend};
use crate::error::{AppError, ValidationError};
use crate::logger::LoggerMiddleware;
use crate::middleware::{AuthenticationGate, HitCounter};
use crate::routes::{
    admin_metrics, create_chirp, create_user, delete_chirp, get_chirp, health_check, list_chirps,
    login, metrics, polka_webhook, refresh, reset_metrics, revoke, update_user,
};
use crate::store::{AccountStore, ChirpStore, MemoryStore, PostgresStore, SessionStore};

/// Shared state handed to every worker
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<dyn AccountStore>,
    pub chirps: Arc<dyn ChirpStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub tokens: Arc<AccessTokenCodec>,
    pub hasher: CredentialHasher,
    /// Digest checked when a login names an unknown email
    pub placeholder_digest: String,
    /// Refresh session lifetime in seconds
    pub refresh_token_expiry: i64,
    pub polka_key: String,
    pub hits: HitCounter,
}

struct Stores {
    accounts: Arc<dyn AccountStore>,
    chirps: Arc<dyn ChirpStore>,
    sessions: Arc<dyn SessionStore>,
}

impl Stores {
    fn shared<S>(store: Arc<S>) -> Self
    where
        S: AccountStore + ChirpStore + SessionStore + 'static,
    {
        Self {
            accounts: store.clone(),
            chirps: store.clone(),
            sessions: store,
        }
    }
}

async fn build_stores(settings: &Settings) -> Result<Stores, AppError> {
    let policy = settings.jwt.session_policy;

    match settings.application.storage {
        StorageBackend::Postgres => {
            tracing::info!("Attempting to connect to database");
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&settings.database.connection_string())
                .await?;

            let store = PostgresStore::new(pool, policy);
            store.migrate().await?;
            tracing::info!("Database migrations applied");

            Ok(Stores::shared(Arc::new(store)))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on shutdown");
            Ok(Stores::shared(Arc::new(MemoryStore::new(policy))))
        }
    }
}

/// Build the application state from settings
///
/// Fails if the stores cannot be reached, a setting is invalid, or the
/// token self-check fails. Any of these should abort startup.
pub async fn build_state(settings: &Settings) -> Result<AppState, AppError> {
    let tokens = AccessTokenCodec::new(&settings.jwt)?;
    self_check(&tokens)?;
    let hasher = CredentialHasher::new(settings.hashing.cost)?;
    let placeholder_digest = hasher.hash(&generate_refresh_token()?)?;

    if settings.webhooks.polka_key.is_empty() {
        tracing::warn!("webhooks.polka_key is not set; webhook calls will be rejected");
    }

    let stores = build_stores(settings).await?;

    tracing::info!(
        session_policy = ?settings.jwt.session_policy,
        bcrypt_cost = hasher.cost(),
        "Application state ready"
    );

    Ok(AppState {
        accounts: stores.accounts,
        chirps: stores.chirps,
        sessions: stores.sessions,
        tokens: Arc::new(tokens),
        hasher,
        placeholder_digest,
        refresh_token_expiry: settings.jwt.refresh_token_expiry,
        polka_key: settings.webhooks.polka_key.clone(),
        hits: HitCounter::new(),
    })
}

pub fn run(
    listener: TcpListener,
    state: AppState,
    static_dir: String,
) -> Result<Server, std::io::Error> {
    let server = HttpServer::new(move || {
        let gate = || AuthenticationGate::new(state.tokens.clone(), state.accounts.clone());

        // Malformed bodies become validation errors with the usual JSON shape
        let json_config = web::JsonConfig::default().error_handler(|err, _req| {
            AppError::Validation(ValidationError::InvalidFormat(format!(
                "request body ({})",
                err
            )))
            .into()
        });

        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(web::Data::new(state.clone()))
            .app_data(json_config)

            .route("/api/healthz", web::get().to(health_check))

            // Accounts
            .service(
                web::resource("/api/users")
                    .guard(guard::Post())
                    .route(web::post().to(create_user)),
            )
            .service(
                web::resource("/api/users")
                    .guard(guard::Put())
                    .wrap(gate())
                    .route(web::put().to(update_user)),
            )

            // Sessions
            .route("/api/login", web::post().to(login))
            .route("/api/refresh", web::post().to(refresh))
            .route("/api/revoke", web::post().to(revoke))

            // Chirps
            .service(
                web::resource("/api/chirps")
                    .guard(guard::Get())
                    .route(web::get().to(list_chirps)),
            )
            .service(
                web::resource("/api/chirps")
                    .guard(guard::Post())
                    .wrap(gate())
                    .route(web::post().to(create_chirp)),
            )
            .service(
                web::resource("/api/chirps/{chirp_id}")
                    .guard(guard::Get())
                    .route(web::get().to(get_chirp)),
            )
            .service(
                web::resource("/api/chirps/{chirp_id}")
                    .guard(guard::Delete())
                    .wrap(gate())
                    .route(web::delete().to(delete_chirp)),
            )

            .route("/api/polka/webhooks", web::post().to(polka_webhook))

            // Metrics
            .route("/api/metrics", web::get().to(metrics))
            .route("/admin/metrics", web::get().to(admin_metrics))
            .route("/api/reset", web::route().to(reset_metrics))

            // Static files, counted by the hit counter
            .service(
                web::scope("/app")
                    .wrap(state.hits.clone())
                    .service(fs::Files::new("/", static_dir.clone()).index_file("index.html")),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
