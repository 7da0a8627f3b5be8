//! Request principal resolved once from a `Bearer` JWT.
//!
//! Handlers take `Principal` as an extractor and pass it explicitly into the
//! service layer; nothing is stashed on the request.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::domain::value_objects::UserId;
use crate::error::{Result, ServiceError};
use crate::state::AppState;

const NOT_AUTHORIZED: &str = "Not Authorized";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role { User, Seller, Admin }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: usize,
}

impl Claims {
    pub fn new(sub: impl Into<String>, role: Role, email: Option<String>, ttl: chrono::Duration) -> Self {
        let exp = (chrono::Utc::now() + ttl).timestamp().max(0) as usize;
        Self { sub: sub.into(), role, email, exp }
    }
}

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    subject: String,
    role: Role,
}

impl Principal {
    pub fn new(subject: impl Into<String>, role: Role) -> Self { Self { subject: subject.into(), role } }

    pub fn subject(&self) -> &str { &self.subject }
    pub fn role(&self) -> Role { self.role }
    pub fn is_admin(&self) -> bool { self.role == Role::Admin }

    /// The caller as a shopper; fails for tokens whose subject is not a user id.
    pub fn user_id(&self) -> Result<UserId> {
        self.subject.parse().map_err(|_| ServiceError::unauthorized(NOT_AUTHORIZED))
    }

    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin() { Ok(()) } else { Err(ServiceError::unauthorized(NOT_AUTHORIZED)) }
    }

    pub fn require_seller(&self) -> Result<()> {
        match self.role {
            Role::Seller | Role::Admin => Ok(()),
            Role::User => Err(ServiceError::unauthorized(NOT_AUTHORIZED)),
        }
    }
}

/// HS256 signing and verification keys.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    admin_email: String,
}

impl TokenKeys {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            admin_email: config.admin_email.to_lowercase(),
        }
    }

    pub fn sign(&self, claims: &Claims) -> std::result::Result<String, jsonwebtoken::errors::Error> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
    }

    /// Admin tokens must also carry the configured admin email.
    pub fn verify(&self, token: &str) -> Result<Principal> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256)).map_err(|e| {
            tracing::debug!(error = %e, "JWT validation failed");
            ServiceError::unauthorized(NOT_AUTHORIZED)
        })?;
        let claims = data.claims;
        if claims.role == Role::Admin {
            let email = claims.email.as_deref().map(str::to_lowercase);
            if email.as_deref() != Some(self.admin_email.as_str()) {
                tracing::warn!(sub = %claims.sub, "Admin token with foreign email rejected");
                return Err(ServiceError::unauthorized(NOT_AUTHORIZED));
            }
        }
        Ok(Principal::new(claims.sub, claims.role))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> std::result::Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ServiceError::unauthorized(NOT_AUTHORIZED))?;
        state.tokens().verify(token.trim())
    }
}
