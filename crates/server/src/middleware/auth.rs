use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use db::models::user::User;
use deployment::Deployment;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::{DeploymentImpl, error::ApiError};

const TOKEN_BYTES: usize = 32;

/// The authenticated caller, stored in request extensions.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: User,
}

/// Caller on routes that also serve anonymous readers.
#[derive(Debug, Clone, Default)]
pub struct OptionalUser(pub Option<User>);

/// sha256 hex of an API token. Only the hash is stored.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn generate_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::rng().random();
    hex::encode(bytes)
}

enum Lookup {
    Missing,
    Unknown,
    Found(User),
}

fn bearer_token(req: &Request) -> Option<String> {
    req.headers()
        .typed_get::<Authorization<Bearer>>()
        .map(|Authorization(bearer)| bearer.token().to_owned())
}

async fn lookup_user(
    deployment: &DeploymentImpl,
    token: Option<String>,
) -> Result<Lookup, ApiError> {
    let Some(token) = token else {
        return Ok(Lookup::Missing);
    };

    match User::find_by_token_hash(&deployment.db().pool, &hash_token(&token)).await? {
        Some(user) => Ok(Lookup::Found(user)),
        None => Ok(Lookup::Unknown),
    }
}

pub async fn require_user(
    State(deployment): State<DeploymentImpl>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = bearer_token(&req);
    match lookup_user(&deployment, token).await {
        Ok(Lookup::Found(user)) => {
            req.extensions_mut().insert(RequestContext { user });
            next.run(req).await
        }
        Ok(Lookup::Missing) => ApiError::Unauthorized.into_response(),
        Ok(Lookup::Unknown) => {
            tracing::debug!(path = %req.uri().path(), "rejected unknown bearer token");
            ApiError::Unauthorized.into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Resolves the caller when a token is present. A token that matches no
/// user is still rejected.
pub async fn optional_user(
    State(deployment): State<DeploymentImpl>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = bearer_token(&req);
    let user = match lookup_user(&deployment, token).await {
        Ok(Lookup::Found(user)) => Some(user),
        Ok(Lookup::Missing) => None,
        Ok(Lookup::Unknown) => return ApiError::Unauthorized.into_response(),
        Err(e) => return e.into_response(),
    };
    req.extensions_mut().insert(OptionalUser(user));
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_sha256_hex() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn tokens_are_random_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
