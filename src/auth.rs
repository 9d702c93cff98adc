use super::session;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// Who is making a mutation. Only an [AccessGate] hands these out, and every
/// mutating lifecycle operation takes one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No credential, or one that is not even shaped like a token.
    #[error("access denied: {0}")]
    Unauthorized(&'static str),
    /// A well-formed credential that failed verification.
    #[error("invalid or expired token: {0}")]
    Forbidden(&'static str),
    #[error("this action requires the admin role")]
    AdminRequired,
}

/// Verifies a bearer credential and says who it belongs to.
pub trait AccessGate: Send + Sync {
    fn verify(&self, credential: &str) -> Result<Principal, AuthError>;
}

/// Accepts tokens minted by [session::issue] with the shared secret.
pub struct HmacGate {
    secret: Vec<u8>,
}

impl HmacGate {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl AccessGate for HmacGate {
    fn verify(&self, credential: &str) -> Result<Principal, AuthError> {
        if credential.is_empty() {
            return Err(AuthError::Unauthorized("no token provided"));
        }
        let now = chrono::Utc::now().timestamp();
        let claims = session::decode(credential, &self.secret, now)?;

        Ok(Principal {
            id: claims.sub,
            role: claims.role,
        })
    }
}
