//! Bearer token issuance and validation.
//!
//! Tokens are HS256 JWTs signed with a shared secret from configuration.
//! The secret is installed once at startup; keys are immutable afterwards.

use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const TOKEN_EXPIRY_HOURS: i64 = 24;
const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

/// JWT claims carried by an access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

static JWT_ENCODING_KEY: OnceCell<EncodingKey> = OnceCell::new();
static JWT_DECODING_KEY: OnceCell<DecodingKey> = OnceCell::new();

/// Install the shared signing secret.
///
/// Must be called during startup before any token operation. Can only be
/// called once; subsequent calls return an error.
pub fn initialize_keys(secret: &str) -> Result<()> {
    if secret.trim().is_empty() {
        return Err(anyhow!("JWT secret must not be empty"));
    }

    JWT_ENCODING_KEY
        .set(EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|_| anyhow!("JWT encoding key already initialized"))?;

    JWT_DECODING_KEY
        .set(DecodingKey::from_secret(secret.as_bytes()))
        .map_err(|_| anyhow!("JWT decoding key already initialized"))?;

    Ok(())
}

fn get_encoding_key() -> Result<&'static EncodingKey> {
    JWT_ENCODING_KEY
        .get()
        .ok_or_else(|| anyhow!("JWT keys not initialized. Call initialize_keys() during startup."))
}

fn get_decoding_key() -> Result<&'static DecodingKey> {
    JWT_DECODING_KEY
        .get()
        .ok_or_else(|| anyhow!("JWT keys not initialized. Call initialize_keys() during startup."))
}

/// Generate a signed access token for the given user.
pub fn generate_token(user_id: Uuid) -> Result<String> {
    let now = Utc::now();
    let expiry = now + Duration::hours(TOKEN_EXPIRY_HOURS);

    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: expiry.timestamp(),
    };

    let encoding_key = get_encoding_key()?;
    encode(&Header::new(JWT_ALGORITHM), &claims, encoding_key)
        .map_err(|e| anyhow!("Failed to generate token: {e}"))
}

/// Validate a token signature and expiry, returning the decoded claims.
pub fn validate_token(token: &str) -> Result<TokenData<Claims>> {
    let decoding_key = get_decoding_key()?;

    let mut validation = Validation::new(JWT_ALGORITHM);
    validation.validate_exp = true;

    decode::<Claims>(token, decoding_key, &validation)
        .map_err(|e| anyhow!("Token validation failed: {e}"))
}

/// Validate a token and extract the user id it names.
pub fn user_id_from_token(token: &str) -> Result<Uuid> {
    let token_data = validate_token(token)?;
    Uuid::parse_str(&token_data.claims.sub)
        .map_err(|e| anyhow!("Invalid user ID format in token: {e}"))
}

#[cfg(test)]
pub(crate) const TEST_SECRET: &str = "unit-test-secret";

/// Install the shared test secret, ignoring the error when another test
/// module got there first. Unit tests across the crate share one process,
/// so they must all use [`TEST_SECRET`].
#[cfg(test)]
pub(crate) fn install_test_keys() {
    let _ = initialize_keys(TEST_SECRET);
}
