//! Postgres store (sqlx)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::auth::hash_token;
use crate::error::{AppError, AuthError};
use crate::models::{Account, AccountCredentials, AccountId, Chirp};
use crate::store::{AccountStore, ChirpStore, SessionPolicy, SessionStore};

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    session_policy: SessionPolicy,
}

impl PostgresStore {
    pub fn new(pool: PgPool, session_policy: SessionPolicy) -> Self {
        Self {
            pool,
            session_policy,
        }
    }

    /// Apply the embedded migrations under `migrations/`
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl AccountStore for PostgresStore {
    async fn create_account(&self, email: &str, password_hash: &str) -> Result<Account, AppError> {
        let (id, email, is_chirpy_red) = sqlx::query_as::<_, (i32, String, bool)>(
            r#"
            INSERT INTO users (email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            RETURNING id, email, is_chirpy_red
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(Account {
            id,
            email,
            is_chirpy_red,
        })
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<AccountCredentials>, AppError> {
        let row = sqlx::query_as::<_, (i32, String, bool, String)>(
            "SELECT id, email, is_chirpy_red, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, email, is_chirpy_red, password_hash)| AccountCredentials {
            account: Account {
                id,
                email,
                is_chirpy_red,
            },
            password_hash,
        }))
    }

    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, AppError> {
        let row = sqlx::query_as::<_, (i32, String, bool)>(
            "SELECT id, email, is_chirpy_red FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, email, is_chirpy_red)| Account {
            id,
            email,
            is_chirpy_red,
        }))
    }

    async fn update_account(
        &self,
        id: AccountId,
        email: &str,
        password_hash: &str,
    ) -> Result<Account, AppError> {
        // fetch_one turns a missing row into RowNotFound, mapped to 404
        let (id, email, is_chirpy_red) = sqlx::query_as::<_, (i32, String, bool)>(
            r#"
            UPDATE users
            SET email = $1, password_hash = $2, updated_at = $3
            WHERE id = $4
            RETURNING id, email, is_chirpy_red
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Account {
            id,
            email,
            is_chirpy_red,
        })
    }

    async fn upgrade_account(&self, id: AccountId) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE users SET is_chirpy_red = TRUE, updated_at = $1 WHERE id = $2",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ChirpStore for PostgresStore {
    async fn create_chirp(&self, author_id: AccountId, body: &str) -> Result<Chirp, AppError> {
        let (id, body, author_id) = sqlx::query_as::<_, (i32, String, i32)>(
            r#"
            INSERT INTO chirps (body, author_id, created_at)
            VALUES ($1, $2, $3)
            RETURNING id, body, author_id
            "#,
        )
        .bind(body)
        .bind(author_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(Chirp {
            id,
            body,
            author_id,
        })
    }

    async fn list_chirps(&self) -> Result<Vec<Chirp>, AppError> {
        let rows = sqlx::query_as::<_, (i32, String, i32)>(
            "SELECT id, body, author_id FROM chirps ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, body, author_id)| Chirp {
                id,
                body,
                author_id,
            })
            .collect())
    }

    async fn find_chirp(&self, id: i32) -> Result<Option<Chirp>, AppError> {
        let row = sqlx::query_as::<_, (i32, String, i32)>(
            "SELECT id, body, author_id FROM chirps WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, body, author_id)| Chirp {
            id,
            body,
            author_id,
        }))
    }

    async fn delete_chirp(&self, id: i32) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM chirps WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SessionStore for PostgresStore {
    async fn save_session(
        &self,
        account_id: AccountId,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let token_hash = hash_token(refresh_token);
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent logins for the same account
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(account_id)
            .fetch_one(&mut tx)
            .await?;

        if self.session_policy == SessionPolicy::SingleSession {
            sqlx::query("DELETE FROM refresh_sessions WHERE account_id = $1")
                .bind(account_id)
                .execute(&mut tx)
                .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO refresh_sessions (account_id, token_hash, expires_at, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(account_id)
        .bind(&token_hash)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&mut tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn resolve_session(&self, refresh_token: &str) -> Result<AccountId, AppError> {
        let token_hash = hash_token(refresh_token);

        let account_id = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT account_id
            FROM refresh_sessions
            WHERE token_hash = $1 AND expires_at > $2
            "#,
        )
        .bind(&token_hash)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        account_id.ok_or(AppError::Auth(AuthError::SessionNotFound))
    }

    async fn revoke_session(&self, refresh_token: &str) -> Result<(), AppError> {
        let token_hash = hash_token(refresh_token);

        let result = sqlx::query("DELETE FROM refresh_sessions WHERE token_hash = $1")
            .bind(&token_hash)
            .execute(&self.pool)
            .await?;

        tracing::debug!(revoked = result.rows_affected(), "Refresh session revoke processed");
        Ok(())
    }
}
