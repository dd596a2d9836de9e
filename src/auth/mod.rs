pub mod cookies;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::debug;

use crate::config;
use crate::database::models::{Session, User};
use crate::database::{DatabaseError, Scope, Store};

/// Length in bytes of session and CSRF tokens before hex encoding
const TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Store(#[from] DatabaseError),
}

/// The authenticated principal of a request, resolved from its session cookie.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Digest identifying the session this request arrived on
    pub session_key: String,
}

impl CurrentUser {
    /// Visibility of todo lists for this principal under the current config
    pub fn scope(&self) -> Scope {
        Scope::for_user(self.id, config::config().security.owner_scoping)
    }
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::Hashing(e.to_string()))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

// Verified against when the username is unknown so both failure paths cost the same
static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| hash_password("not-a-real-password").ok());

/// Check credentials. Unknown users, inactive users and wrong passwords all
/// yield `None`.
pub async fn authenticate(store: &dyn Store, username: &str, password: &str) -> Result<Option<User>, AuthError> {
    let Some(user) = store.find_user_by_username(username).await? else {
        if let Some(dummy) = DUMMY_HASH.as_deref() {
            let _ = verify_password(password, dummy);
        }
        debug!("Login rejected: unknown username");
        return Ok(None);
    };

    if !verify_password(password, &user.password)? {
        debug!(user_id = user.id, "Login rejected: wrong password");
        return Ok(None);
    }
    if !user.is_active {
        debug!(user_id = user.id, "Login rejected: inactive account");
        return Ok(None);
    }
    Ok(Some(user))
}

/// Random 256-bit token, hex encoded
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn is_well_formed_token(token: &str) -> bool {
    token.len() == TOKEN_BYTES * 2 && token.bytes().all(|b| b.is_ascii_hexdigit())
}

pub fn tokens_match(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

/// Storage key for a session token
pub fn session_key(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Create a session for `user_id` and return the token to hand to the client
pub async fn start_session(store: &dyn Store, user_id: i64) -> Result<String, AuthError> {
    let token = generate_token();
    let ttl = Duration::hours(config::config().security.session_ttl());
    store.create_session(Session::new(session_key(&token), user_id, ttl)).await?;
    Ok(token)
}

/// Drop the session behind a client token, if any
pub async fn end_session(store: &dyn Store, token: &str) -> Result<(), AuthError> {
    store.delete_session(&session_key(token)).await?;
    Ok(())
}

/// Resolve a client token to its principal. Expired sessions are removed
/// and treated as absent, as are sessions of deactivated users.
pub async fn resolve_session(store: &dyn Store, token: &str) -> Result<Option<CurrentUser>, AuthError> {
    if !is_well_formed_token(token) {
        return Ok(None);
    }

    let key = session_key(token);
    let Some(session) = store.find_session(&key).await? else {
        return Ok(None);
    };
    if session.is_expired(Utc::now()) {
        debug!(user_id = session.user_id, "Discarding expired session");
        store.delete_session(&key).await?;
        return Ok(None);
    }

    let user = match store.get_user(session.user_id).await? {
        Some(user) if user.is_active => user,
        _ => return Ok(None),
    };

    Ok(Some(CurrentUser {
        id: user.id,
        username: user.username,
        email: user.email,
        session_key: key,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::NewUser;
    use crate::database::MemoryStore;

    async fn store_with_user(username: &str, password: &str) -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password: hash_password(password).unwrap(),
            })
            .await
            .unwrap();
        (store, user)
    }

    #[test]
    fn hashes_and_verifies_passwords() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(!hash.contains("correct horse"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("battery staple", &hash).unwrap());
    }

    #[test]
    fn rejects_malformed_hash() {
        assert!(verify_password("anything", "plaintext").is_err());
    }

    #[test]
    fn generates_distinct_well_formed_tokens() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert!(is_well_formed_token(&a));
        assert!(!is_well_formed_token("short"));
        assert!(!is_well_formed_token(&"z".repeat(64)));
    }

    #[test]
    fn compares_tokens() {
        let token = generate_token();
        assert!(tokens_match(&token, &token.clone()));
        assert!(!tokens_match(&token, &generate_token()));
        assert!(!tokens_match(&token, ""));
    }

    #[test]
    fn session_key_is_stable_digest() {
        let key = session_key("abc");
        assert_eq!(key, session_key("abc"));
        assert_eq!(key.len(), 64);
        assert_ne!(key, "abc");
    }

    #[tokio::test]
    async fn authenticates_valid_credentials_only() {
        let (store, user) = store_with_user("frank", "s3cret-pass").await;

        let found = authenticate(&store, "frank", "s3cret-pass").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
        assert!(authenticate(&store, "frank", "wrong-pass").await.unwrap().is_none());
        assert!(authenticate(&store, "nobody", "s3cret-pass").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn session_lifecycle() {
        let (store, user) = store_with_user("grace", "s3cret-pass").await;

        let token = start_session(&store, user.id).await.unwrap();
        let current = resolve_session(&store, &token).await.unwrap().unwrap();
        assert_eq!(current.id, user.id);
        assert_eq!(current.username, "grace");
        assert_eq!(current.session_key, session_key(&token));

        end_session(&store, &token).await.unwrap();
        assert!(resolve_session(&store, &token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_session_is_discarded() {
        let (store, user) = store_with_user("heidi", "s3cret-pass").await;
        let token = generate_token();
        let key = session_key(&token);
        store
            .create_session(Session::new(key.clone(), user.id, Duration::seconds(-1)))
            .await
            .unwrap();

        assert!(resolve_session(&store, &token).await.unwrap().is_none());
        assert!(store.find_session(&key).await.unwrap().is_none());
    }
}
