//! Credential minting.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::Credential;

/// Length of generated access keys.
pub const ACCESS_KEY_LEN: usize = 20;

/// Length of generated secret keys.
pub const SECRET_KEY_LEN: usize = 40;

const ACCESS_KEY_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Produces a fresh credential valid until the given expiry.
pub trait CredentialMinter: Send + Sync {
    fn mint(&self, expiration: DateTime<Utc>) -> Result<Credential>;
}

/// Mints random keys from the OS entropy source.
///
/// The session token is an HS512 JWT signed with the new secret key and
/// carrying the access key and expiry.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyMinter;

impl CredentialMinter for KeyMinter {
    fn mint(&self, expiration: DateTime<Utc>) -> Result<Credential> {
        let access_key = generate_access_key()?;
        let secret_key = generate_secret_key()?;

        let claims = SessionClaims {
            access_key: access_key.clone(),
            exp: expiration.timestamp(),
            iat: Utc::now().timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let session_token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(secret_key.as_bytes()),
        )
        .context("Failed to encode session token")?;

        debug!(
            access_key = %access_key,
            exp = %expiration,
            "Minted new credential"
        );

        Ok(Credential {
            access_key,
            secret_key,
            session_token,
            expiration,
        })
    }
}

/// Claims carried by the session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(rename = "accessKey")]
    pub access_key: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

fn generate_access_key() -> Result<String> {
    let mut bytes = [0u8; ACCESS_KEY_LEN];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("Entropy source unavailable for access key")?;

    Ok(bytes
        .iter()
        .map(|b| ACCESS_KEY_ALPHABET[*b as usize % ACCESS_KEY_ALPHABET.len()] as char)
        .collect())
}

fn generate_secret_key() -> Result<String> {
    // 30 bytes encode to exactly 40 base64 characters.
    let mut bytes = [0u8; SECRET_KEY_LEN / 4 * 3];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("Entropy source unavailable for secret key")?;

    Ok(STANDARD.encode(bytes).replace('/', "+"))
}
