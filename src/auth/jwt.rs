use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::role::Role;

/// Access token claims issued by the identity service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String,
    pub role: u8, // role id
    pub exp: usize,
    pub jti: String,
}

/// Signs an access token. The leave service only verifies tokens; this is
/// used by operators' tooling and the test suites.
pub fn issue_token(user_id: u64, username: &str, role: Role, secret: &str, ttl_secs: i64) -> Result<String> {
    let exp = usize::try_from(Utc::now().timestamp() + ttl_secs).context("token expiry out of range")?;
    let claims = Claims {
        user_id,
        sub: username.to_string(),
        role: role.id(),
        exp,
        jti: Uuid::new_v4().to_string(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .context("failed to sign access token")
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}
