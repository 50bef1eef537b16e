//! In-process store backed by mutex-guarded maps.
//!
//! Used for local runs without Postgres and by the integration tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::auth::hash_token;
use crate::error::{AppError, AuthError, DatabaseError};
use crate::models::{Account, AccountCredentials, AccountId, Chirp};
use crate::store::{AccountStore, ChirpStore, SessionPolicy, SessionStore};

struct StoredSession {
    account_id: AccountId,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    next_account_id: AccountId,
    next_chirp_id: i32,
    accounts: BTreeMap<AccountId, AccountCredentials>,
    chirps: BTreeMap<i32, Chirp>,
    // keyed by token digest
    sessions: HashMap<String, StoredSession>,
}

pub struct MemoryStore {
    state: Mutex<State>,
    session_policy: SessionPolicy,
}

impl MemoryStore {
    pub fn new(session_policy: SessionPolicy) -> Self {
        Self {
            state: Mutex::new(State::default()),
            session_policy,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, AppError> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("memory store lock poisoned".to_string()))
    }
}

fn email_taken(state: &State, email: &str, except: Option<AccountId>) -> bool {
    state
        .accounts
        .values()
        .any(|c| c.account.email == email && Some(c.account.id) != except)
}

fn duplicate_email() -> AppError {
    AppError::Database(DatabaseError::UniqueConstraintViolation(
        "Email already registered".to_string(),
    ))
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create_account(&self, email: &str, password_hash: &str) -> Result<Account, AppError> {
        let mut state = self.lock()?;
        if email_taken(&state, email, None) {
            return Err(duplicate_email());
        }

        state.next_account_id += 1;
        let account = Account {
            id: state.next_account_id,
            email: email.to_string(),
            is_chirpy_red: false,
        };
        state.accounts.insert(
            account.id,
            AccountCredentials {
                account: account.clone(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(account)
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<AccountCredentials>, AppError> {
        let state = self.lock()?;
        Ok(state
            .accounts
            .values()
            .find(|c| c.account.email == email)
            .cloned())
    }

    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, AppError> {
        let state = self.lock()?;
        Ok(state.accounts.get(&id).map(|c| c.account.clone()))
    }

    async fn update_account(
        &self,
        id: AccountId,
        email: &str,
        password_hash: &str,
    ) -> Result<Account, AppError> {
        let mut state = self.lock()?;
        if email_taken(&state, email, Some(id)) {
            return Err(duplicate_email());
        }

        let credentials = state.accounts.get_mut(&id).ok_or_else(|| {
            AppError::Database(DatabaseError::NotFound("Record not found".to_string()))
        })?;
        credentials.account.email = email.to_string();
        credentials.password_hash = password_hash.to_string();
        Ok(credentials.account.clone())
    }

    async fn upgrade_account(&self, id: AccountId) -> Result<bool, AppError> {
        let mut state = self.lock()?;
        match state.accounts.get_mut(&id) {
            Some(credentials) => {
                credentials.account.is_chirpy_red = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ChirpStore for MemoryStore {
    async fn create_chirp(&self, author_id: AccountId, body: &str) -> Result<Chirp, AppError> {
        let mut state = self.lock()?;
        state.next_chirp_id += 1;
        let chirp = Chirp {
            id: state.next_chirp_id,
            body: body.to_string(),
            author_id,
        };
        state.chirps.insert(chirp.id, chirp.clone());
        Ok(chirp)
    }

    async fn list_chirps(&self) -> Result<Vec<Chirp>, AppError> {
        let state = self.lock()?;
        Ok(state.chirps.values().cloned().collect())
    }

    async fn find_chirp(&self, id: i32) -> Result<Option<Chirp>, AppError> {
        let state = self.lock()?;
        Ok(state.chirps.get(&id).cloned())
    }

    async fn delete_chirp(&self, id: i32) -> Result<bool, AppError> {
        let mut state = self.lock()?;
        Ok(state.chirps.remove(&id).is_some())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn save_session(
        &self,
        account_id: AccountId,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let token_hash = hash_token(refresh_token);
        let mut state = self.lock()?;

        // Expired sessions can never resolve again
        let now = Utc::now();
        state.sessions.retain(|_, s| s.expires_at > now);
        if self.session_policy == SessionPolicy::SingleSession {
            state.sessions.retain(|_, s| s.account_id != account_id);
        }
        state.sessions.insert(
            token_hash,
            StoredSession {
                account_id,
                expires_at,
            },
        );
        Ok(())
    }

    async fn resolve_session(&self, refresh_token: &str) -> Result<AccountId, AppError> {
        let token_hash = hash_token(refresh_token);
        let state = self.lock()?;

        state
            .sessions
            .get(&token_hash)
            .filter(|s| s.expires_at > Utc::now())
            .map(|s| s.account_id)
            .ok_or(AppError::Auth(AuthError::SessionNotFound))
    }

    async fn revoke_session(&self, refresh_token: &str) -> Result<(), AppError> {
        let token_hash = hash_token(refresh_token);
        self.lock()?.sessions.remove(&token_hash);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn later() -> DateTime<Utc> {
        Utc::now() + Duration::days(1)
    }

    fn assert_session_not_found(result: Result<AccountId, AppError>) {
        match result {
            Err(AppError::Auth(AuthError::SessionNotFound)) => (),
            other => panic!("Expected SessionNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_account_ids_are_sequential_and_emails_unique() {
        let store = MemoryStore::new(SessionPolicy::SingleSession);

        let first = store.create_account("a@x.com", "digest").await.unwrap();
        let second = store.create_account("b@x.com", "digest").await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);

        match store.create_account("a@x.com", "digest").await {
            Err(AppError::Database(DatabaseError::UniqueConstraintViolation(_))) => (),
            other => panic!("Expected unique violation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_and_upgrade_account() {
        let store = MemoryStore::new(SessionPolicy::SingleSession);
        let account = store.create_account("a@x.com", "old").await.unwrap();

        let updated = store.update_account(account.id, "c@x.com", "new").await.unwrap();
        assert_eq!(updated.email, "c@x.com");

        let creds = store.find_credentials_by_email("c@x.com").await.unwrap().unwrap();
        assert_eq!(creds.password_hash, "new");
        assert!(store.find_credentials_by_email("a@x.com").await.unwrap().is_none());

        assert!(store.upgrade_account(account.id).await.unwrap());
        assert!(store.find_account(account.id).await.unwrap().unwrap().is_chirpy_red);
        assert!(!store.upgrade_account(999).await.unwrap());
    }

    #[tokio::test]
    async fn test_chirps_are_listed_in_creation_order() {
        let store = MemoryStore::new(SessionPolicy::SingleSession);

        store.create_chirp(1, "first").await.unwrap();
        let second = store.create_chirp(2, "second").await.unwrap();

        let bodies: Vec<_> = store
            .list_chirps()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.body)
            .collect();
        assert_eq!(bodies, vec!["first", "second"]);

        assert!(store.delete_chirp(second.id).await.unwrap());
        assert!(!store.delete_chirp(second.id).await.unwrap());
        assert!(store.find_chirp(second.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_round_trip_and_revoke() {
        let store = MemoryStore::new(SessionPolicy::SingleSession);

        store.save_session(7, "token-a", later()).await.unwrap();
        assert_eq!(store.resolve_session("token-a").await.unwrap(), 7);

        store.revoke_session("token-a").await.unwrap();
        assert_session_not_found(store.resolve_session("token-a").await);

        // Revoking again, or revoking something never issued, is fine
        store.revoke_session("token-a").await.unwrap();
        store.revoke_session("never-issued").await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_session_is_not_found() {
        let store = MemoryStore::new(SessionPolicy::SingleSession);

        store
            .save_session(7, "token-a", Utc::now() - Duration::seconds(1))
            .await
            .unwrap();
        assert_session_not_found(store.resolve_session("token-a").await);
    }

    #[tokio::test]
    async fn test_single_session_supersedes_previous_token() {
        let store = MemoryStore::new(SessionPolicy::SingleSession);

        store.save_session(7, "token-a", later()).await.unwrap();
        store.save_session(8, "token-other", later()).await.unwrap();
        store.save_session(7, "token-b", later()).await.unwrap();

        assert_session_not_found(store.resolve_session("token-a").await);
        assert_eq!(store.resolve_session("token-b").await.unwrap(), 7);
        assert_eq!(store.resolve_session("token-other").await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_multi_session_keeps_previous_token() {
        let store = MemoryStore::new(SessionPolicy::MultiSession);

        store.save_session(7, "token-a", later()).await.unwrap();
        store.save_session(7, "token-b", later()).await.unwrap();

        assert_eq!(store.resolve_session("token-a").await.unwrap(), 7);
        assert_eq!(store.resolve_session("token-b").await.unwrap(), 7);

        store.revoke_session("token-a").await.unwrap();
        assert_session_not_found(store.resolve_session("token-a").await);
        assert_eq!(store.resolve_session("token-b").await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_saving_a_session_drops_expired_ones() {
        let store = MemoryStore::new(SessionPolicy::MultiSession);
        let expired = Utc::now() - Duration::seconds(1);

        store.save_session(7, "token-a", expired).await.unwrap();
        store.save_session(8, "token-other", expired).await.unwrap();
        store.save_session(7, "token-b", later()).await.unwrap();

        assert_eq!(store.lock().unwrap().sessions.len(), 1);
        assert_eq!(store.resolve_session("token-b").await.unwrap(), 7);
    }
}
