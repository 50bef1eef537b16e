//! Records shared by the stores and the HTTP handlers.

use serde::Serialize;

/// Account identifier. Assigned by the store, immutable afterwards.
pub type AccountId = i32;

/// Public view of an account. Never carries the password digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub is_chirpy_red: bool,
}

/// Account together with its stored password digest, used only on the login path.
#[derive(Debug, Clone)]
pub struct AccountCredentials {
    pub account: Account,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chirp {
    pub id: i32,
    pub body: String,
    pub author_id: AccountId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_serialization_has_no_digest() {
        let account = Account {
            id: 1,
            email: "u@x.com".to_string(),
            is_chirpy_red: false,
        };

        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["email"], "u@x.com");
        assert_eq!(json["is_chirpy_red"], false);
        assert!(json.get("password").is_none());
        assert!(json.get("password_hash").is_none());
    }
}
