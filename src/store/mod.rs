//! Persistence layer
//!
//! Traits for the account, chirp and session stores, with a Postgres
//! implementation and an in-process one.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::AppError;
use crate::models::{Account, AccountCredentials, AccountId, Chirp};

/// How many live refresh sessions an account may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPolicy {
    /// A new login replaces every earlier session of the account
    #[default]
    SingleSession,
    /// Sessions accumulate and are revoked one by one
    MultiSession,
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Create an account. Fails with a unique-constraint error on a taken email.
    async fn create_account(&self, email: &str, password_hash: &str) -> Result<Account, AppError>;

    /// Look up an account with its password digest, for login
    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<AccountCredentials>, AppError>;

    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, AppError>;

    /// Replace email and password digest. Fails with not-found for an unknown id.
    async fn update_account(
        &self,
        id: AccountId,
        email: &str,
        password_hash: &str,
    ) -> Result<Account, AppError>;

    /// Flag the account as Chirpy Red. Returns false if the account does not exist.
    async fn upgrade_account(&self, id: AccountId) -> Result<bool, AppError>;
}

#[async_trait]
pub trait ChirpStore: Send + Sync {
    async fn create_chirp(&self, author_id: AccountId, body: &str) -> Result<Chirp, AppError>;

    /// All chirps, oldest first
    async fn list_chirps(&self) -> Result<Vec<Chirp>, AppError>;

    async fn find_chirp(&self, id: i32) -> Result<Option<Chirp>, AppError>;

    /// Returns false if nothing was deleted
    async fn delete_chirp(&self, id: i32) -> Result<bool, AppError>;
}

/// Server-side refresh sessions
///
/// Implementations persist only the digest of a refresh token and must apply
/// their `SessionPolicy` atomically inside `save_session`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Record a refresh session, superseding older ones per the session policy
    async fn save_session(
        &self,
        account_id: AccountId,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// Account owning a live session for `refresh_token`
    ///
    /// Unknown, revoked and expired tokens all fail with `AuthError::SessionNotFound`.
    async fn resolve_session(&self, refresh_token: &str) -> Result<AccountId, AppError>;

    /// Invalidate the session for `refresh_token`. Unknown tokens are a no-op.
    async fn revoke_session(&self, refresh_token: &str) -> Result<(), AppError>;
}
