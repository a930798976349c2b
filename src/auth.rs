use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use uuid::Uuid;

use crate::records::CustomerBook;
use crate::settings;

// 24 hours in seconds
const SESSION_DURATION: u64 = 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("password hashing failed")]
    Hash,

    #[error("invalid password hash format")]
    BadHash,
}

/// Identity attached to a session cookie. The admin portal and the customer
/// portal share one session store but never accept each other's sessions.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUser {
    Admin { username: String },
    Customer { id: i64, username: String },
}

impl SessionUser {
    pub fn username(&self) -> &str {
        match self {
            SessionUser::Admin { username } => username,
            SessionUser::Customer { username, .. } => username,
        }
    }
}

/// An authenticated session.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: SessionUser,
    pub expires_at: SystemTime,
}

/// In-memory session map, owned by the application state rather than held
/// in a global.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session for an authenticated user and returns its id.
    pub fn create(&self, user: SessionUser) -> String {
        let session_id = Uuid::new_v4().to_string();
        let expires_at = SystemTime::now() + Duration::from_secs(SESSION_DURATION);

        let mut sessions = self.sessions.write().unwrap();
        sessions.insert(session_id.clone(), Session { user, expires_at });

        session_id
    }

    /// Returns the session's user if the id is known and not expired.
    pub fn validate(&self, session_id: &str) -> Option<SessionUser> {
        let sessions = self.sessions.read().unwrap();

        if let Some(session) = sessions.get(session_id) {
            if session.expires_at > SystemTime::now() {
                return Some(session.user.clone());
            }
        }

        None
    }

    pub fn remove(&self, session_id: &str) {
        let mut sessions = self.sessions.write().unwrap();
        sessions.remove(session_id);
    }
}

/// The admin account, built at startup by hashing the configured password.
/// Plaintext is dropped immediately after hashing.
#[derive(Debug)]
pub struct AdminAccount {
    username: String,
    password_hash: String,
}

impl AdminAccount {
    pub fn from_settings(admin: &settings::Admin) -> Result<Self, AuthError> {
        Ok(Self {
            username: admin.username.clone(),
            password_hash: hash_password(&admin.password)?,
        })
    }

    pub fn verify(&self, username: &str, password: &str) -> bool {
        username == self.username
            && verify_password(password, &self.password_hash).unwrap_or(false)
    }
}

/// Hash a password using Argon2
///
/// # Arguments
/// * `password` - The plaintext password to hash
///
/// # Errors
/// * Returns `AuthError::Hash` if the password hashing fails
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    match argon2.hash_password(password.as_bytes(), &salt) {
        Ok(hash) => Ok(hash.to_string()),
        Err(_) => Err(AuthError::Hash),
    }
}

/// Verify a password against a stored hash
///
/// # Arguments
/// * `password` - The plaintext password to verify
/// * `hash` - The stored password hash to check against
///
/// # Errors
/// * Returns `AuthError::BadHash` if the hash is in an invalid format
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(hash) => hash,
        Err(_) => return Err(AuthError::BadHash),
    };

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(_) => Ok(false), // Password didn't match
    }
}

/// Resolves a customer portal sign-in against the customers collection.
/// Inactive accounts and records with no usable hash are rejected; the
/// first username match wins.
pub fn verify_customer_login(
    book: &CustomerBook,
    username: &str,
    password: &str,
) -> Option<SessionUser> {
    let record = book.find_by_username(username)?;
    if !record.is_active() || record.password_hash.is_empty() {
        return None;
    }
    match verify_password(password, &record.password_hash) {
        Ok(true) => Some(SessionUser::Customer {
            id: record.id,
            username: record.username.clone(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hash = hash_password("acme2024").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("acme2024", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(verify_password("anything", "not-a-hash").is_err());
    }

    #[test]
    fn test_session_lifecycle() {
        let store = SessionStore::new();
        let id = store.create(SessionUser::Admin {
            username: "admin".into(),
        });

        let user = store.validate(&id).expect("fresh session validates");
        assert_eq!(user.username(), "admin");

        store.remove(&id);
        assert!(store.validate(&id).is_none());
        assert!(store.validate("no-such-session").is_none());
    }

    #[test]
    fn test_expired_session_is_rejected() {
        let store = SessionStore::new();
        let id = store.create(SessionUser::Customer {
            id: 1,
            username: "acme_user".into(),
        });

        {
            let mut sessions = store.sessions.write().unwrap();
            let session = sessions.get_mut(&id).unwrap();
            session.expires_at = SystemTime::now() - Duration::from_secs(1);
        }

        assert!(store.validate(&id).is_none());
    }

    #[test]
    fn test_admin_account_verifies_only_its_own_credentials() {
        let account = AdminAccount::from_settings(&crate::settings::Admin {
            username: "admin".into(),
            password: "clarity2024".into(),
        })
        .unwrap();

        assert!(account.verify("admin", "clarity2024"));
        assert!(!account.verify("admin", "wrong"));
        assert!(!account.verify("root", "clarity2024"));
    }

    #[test]
    fn test_customer_login_rules() {
        let mut book = records::demo_customers();

        let user = verify_customer_login(&book, "acme_user", "acme2024")
            .expect("seed credentials sign in");
        assert_eq!(user, SessionUser::Customer {
            id: 1,
            username: "acme_user".into(),
        });

        assert!(verify_customer_login(&book, "acme_user", "bad").is_none());
        assert!(verify_customer_login(&book, "ghost_user", "acme2024").is_none());

        book.find_mut(1).unwrap().status = records::CustomerStatus::Inactive;
        assert!(verify_customer_login(&book, "acme_user", "acme2024").is_none());
    }
}
