use super::{
    auth::{AuthError, Role},
    crypto,
};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

/// HMAC-secured bearer token, signed with `$SESSION_SECRET`.
///
/// The identity service that logs people in holds the same secret and mints
/// these with [issue]; this service only ever reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    /// Unix seconds.
    pub issued_at: i64,
    /// Unix seconds.
    pub expires_at: i64,
}

pub fn issue(claims: &Claims, secret: &[u8]) -> String {
    let json_bytes =
        serde_json::to_string(claims).expect("claims can be JSON serialized");
    let b64 = general_purpose::STANDARD_NO_PAD.encode(json_bytes);
    let raw_digest = crypto::get_digest(secret, b64.as_bytes());
    let digest = general_purpose::STANDARD_NO_PAD.encode(raw_digest);

    format!("{}:{}", b64, digest)
}

/// Decode and check a token. Structural problems are `Unauthorized`; a bad
/// signature or an expired token is `Forbidden`.
pub fn decode(token: &str, secret: &[u8], now: i64) -> Result<Claims, AuthError> {
    let Some((b64_json, b64_digest)) = token.split_once(':') else {
        return Err(AuthError::Unauthorized("token is not two parts"));
    };
    let digest = general_purpose::STANDARD_NO_PAD
        .decode(b64_digest)
        .map_err(|_| AuthError::Unauthorized("cannot base64 decode the digest"))?;

    if !crypto::is_valid(secret, b64_json.as_bytes(), &digest) {
        return Err(AuthError::Forbidden("failed to validate token signature"));
    }

    let json_bytes = general_purpose::STANDARD_NO_PAD
        .decode(b64_json)
        .map_err(|_| AuthError::Unauthorized("cannot base64 decode claims"))?;
    let claims: Claims = serde_json::from_slice(&json_bytes)
        .map_err(|_| AuthError::Unauthorized("cannot deserialize claims"))?;

    if claims.expires_at <= now {
        return Err(AuthError::Forbidden("token has expired"));
    }

    Ok(claims)
}
