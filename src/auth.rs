//! Identity verification for bearer credentials.
//!
//! A token is only accepted once the identity service itself confirms it
//! (`GET /auth/v1/user`). The optional JWT pre-check can reject early but
//! never accepts on its own.

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::IdentityConfig;

/// The verified caller, bound into each request's extensions by the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingHeader,
    #[error("authorization header is not `Bearer <token>`")]
    MalformedHeader,
    #[error("token rejected: {0}")]
    Rejected(String),
    #[error("identity service unreachable: {0}")]
    Upstream(String),
}

impl AuthError {
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "Missing authorization header",
            AuthError::MalformedHeader => "Invalid authorization header format",
            AuthError::Rejected(_) | AuthError::Upstream(_) => "Invalid or expired token",
        }
    }
}

/// Resolves an opaque bearer credential to a stable user id.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError>;
}

/// Extracts the credential from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    match value.split_once(' ') {
        Some(("Bearer", token)) if !token.is_empty() && !token.contains(char::is_whitespace) => {
            Ok(token)
        }
        _ => Err(AuthError::MalformedHeader),
    }
}

#[derive(Deserialize)]
struct RemoteUser {
    #[serde(default)]
    id: String,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

/// Local signature/expiry check with the project's JWT secret.
struct JwtPrecheck {
    key: DecodingKey,
    validation: Validation,
}

impl JwtPrecheck {
    fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Hosted tokens carry `aud: authenticated`; the remote check covers audience.
        validation.validate_aud = false;
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    fn subject(&self, token: &str) -> Result<String, AuthError> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims.sub)
            .map_err(|e| AuthError::Rejected(e.to_string()))
    }
}

/// Verifies tokens against the hosted identity service.
pub struct SupabaseVerifier {
    client: reqwest::Client,
    user_url: String,
    api_key: String,
    precheck: Option<JwtPrecheck>,
}

impl SupabaseVerifier {
    pub fn new(config: &IdentityConfig) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AuthError::Upstream(e.to_string()))?;
        Ok(Self {
            client,
            user_url: format!("{}/auth/v1/user", config.auth_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            precheck: config.jwt_secret.as_deref().map(JwtPrecheck::new),
        })
    }
}

#[async_trait]
impl IdentityVerifier for SupabaseVerifier {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let expected_sub = match &self.precheck {
            Some(precheck) => Some(precheck.subject(token)?),
            None => None,
        };

        let response = self
            .client
            .get(&self.user_url)
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "identity service request failed");
                AuthError::Upstream(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Rejected(format!("identity service answered {status}")));
        }

        let user: RemoteUser = response
            .json()
            .await
            .map_err(|e| AuthError::Rejected(format!("unreadable identity response: {e}")))?;
        if user.id.is_empty() {
            return Err(AuthError::Rejected("identity response has no user id".into()));
        }
        if let Some(sub) = expected_sub {
            if sub != user.id {
                return Err(AuthError::Rejected("token subject does not match identity".into()));
            }
        }

        Ok(AuthUser { id: user.id })
    }
}
