//! Bearer tokens, password hashing and the register/login flows.
//!
//! Tokens live in memory only. They are handed out on login and never
//! expire; a restart forgets every token that was not seeded from config.

use crate::db::Database;
use crate::error::AuthError;
use crate::types::User;
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{info, warn};

/// Length of a freshly generated token, before hex encoding.
pub const TOKEN_BYTES: usize = 32;
/// Length of a per-user password salt.
pub const SALT_BYTES: usize = 10;
/// Length of a stored password hash.
pub const HASH_BYTES: usize = 32;

const ARGON2_TIME_COST: u32 = 3;
const ARGON2_MEMORY_KIB: u32 = 32 * 1024;
const ARGON2_PARALLELISM: u32 = 4;

/// Map of bearer token to username.
#[derive(Debug, Default)]
pub struct TokenStore {
    tokens: RwLock<HashMap<String, String>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with fixed tokens.
    pub fn seeded(tokens: HashMap<String, String>) -> Self {
        if !tokens.is_empty() {
            warn!(
                count = tokens.len(),
                "Seeding token map from config. Do not use this in production"
            );
        }
        Self {
            tokens: RwLock::new(tokens),
        }
    }

    pub fn insert(&self, token: String, username: String) {
        // A poisoned map still holds valid entries.
        let mut tokens = self.tokens.write().unwrap_or_else(|e| e.into_inner());
        tokens.insert(token, username);
    }

    /// Resolve a token to the user it was issued to.
    pub fn username_for(&self, token: &str) -> Option<String> {
        let tokens = self.tokens.read().unwrap_or_else(|e| e.into_inner());
        tokens.get(token).cloned()
    }

    pub fn len(&self) -> usize {
        self.tokens.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn random_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    rand::rng().fill_bytes(&mut buf);
    buf
}

/// A new random bearer token, hex encoded.
pub fn generate_token() -> String {
    hex::encode(random_bytes(TOKEN_BYTES))
}

/// A new random password salt.
pub fn generate_salt() -> Vec<u8> {
    random_bytes(SALT_BYTES)
}

/// Derive the stored hash for `password` with Argon2i.
pub fn hash_password(password: &[u8], salt: &[u8]) -> Result<Vec<u8>, AuthError> {
    let params = Params::new(
        ARGON2_MEMORY_KIB,
        ARGON2_TIME_COST,
        ARGON2_PARALLELISM,
        Some(HASH_BYTES),
    )
    .map_err(|e| AuthError::Hashing(e.to_string()))?;
    let hasher = Argon2::new(Algorithm::Argon2i, Version::V0x13, params);

    let mut out = vec![0u8; HASH_BYTES];
    hasher
        .hash_password_into(password, salt, &mut out)
        .map_err(|e| AuthError::Hashing(e.to_string()))?;
    Ok(out)
}

/// Check `password` against a stored hash.
pub fn verify_password(password: &[u8], salt: &[u8], expected: &[u8]) -> Result<bool, AuthError> {
    Ok(hash_password(password, salt)? == expected)
}

/// Body of a registration request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub fullname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Body of a login request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

fn required(value: Option<String>, field: &'static str) -> Result<String, AuthError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AuthError::MissingField(field)),
    }
}

/// Create a user account with a fresh salt.
pub fn register(db: &Database, request: RegisterRequest) -> Result<String, AuthError> {
    let username = required(request.username, "username")?;
    let fullname = required(request.fullname, "fullname")?;
    let email = required(request.email, "email")?;
    let password = required(request.password, "password")?;

    let salt = generate_salt();
    let password_hash = hash_password(password.as_bytes(), &salt)?;

    db.insert_user(&User {
        username: username.clone(),
        fullname,
        email,
        password_hash,
        salt,
    })?;
    Ok(username)
}

/// Check credentials and issue a new token for the user.
pub fn login(
    db: &Database,
    tokens: &TokenStore,
    request: LoginRequest,
) -> Result<String, AuthError> {
    let username = required(request.username, "username")?;
    let password = required(request.password, "password")?;

    let Some(user) = db.get_user(&username)? else {
        info!(%username, "Log in failed: unknown user");
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_password(password.as_bytes(), &user.salt, &user.password_hash)? {
        info!(%username, "Log in failed: wrong password");
        return Err(AuthError::InvalidCredentials);
    }

    let token = generate_token();
    tokens.insert(token.clone(), user.username);
    info!(%username, "Logged in");
    Ok(token)
}
