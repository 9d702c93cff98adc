use super::{
    auth::{AuthError, Principal},
    errors::ServerError,
    models::AppState,
};
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use regex::Regex;
use std::sync::OnceLock;

/// A caller whose bearer token passed the [crate::auth::AccessGate]. Taking
/// this as a handler argument is what makes a route require authentication.
pub struct AuthenticatedUser(pub Principal);

fn bearer_token(header: &str) -> Option<&str> {
    static BEARER: OnceLock<Regex> = OnceLock::new();
    let re = BEARER.get_or_init(|| {
        Regex::new(r"^Bearer (\S+)$").expect("bearer pattern compiles")
    });
    re.captures(header)
        .and_then(|captures| captures.get(1))
        .map(|token| token.as_str())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthError::Unauthorized("no token provided"))?;
        let token = bearer_token(header)
            .ok_or(AuthError::Unauthorized("expected a bearer token"))?;

        let principal = state.gate.verify(token)?;
        if state.mutations_require_admin && !principal.is_admin() {
            return Err(AuthError::AdminRequired.into());
        }

        Ok(AuthenticatedUser(principal))
    }
}
