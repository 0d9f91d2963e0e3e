use axum::http::{header::AUTHORIZATION, HeaderMap};
use std::collections::HashMap;

use crate::config::AuthConfig;
use crate::error::{WardrobeError, WardrobeResult};
use crate::model::{Id, Principal};

/// Prefix of development credentials, e.g. `dev:alice`
pub const DEV_TOKEN_PREFIX: &str = "dev:";

/// Resolves a bearer credential to the principal it was issued for.
///
/// The pipeline never looks inside credentials; it only consumes the id.
#[async_trait::async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> WardrobeResult<Principal>;
}

/// Verifier backed by a fixed token table from configuration.
pub struct StaticTokenVerifier {
    tokens: HashMap<String, Id>,
    allow_dev_tokens: bool,
}

impl StaticTokenVerifier {
    pub fn new(tokens: impl IntoIterator<Item = (String, Id)>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
            allow_dev_tokens: false,
        }
    }

    /// Also accept `dev:<user id>` credentials. Never enable in production.
    pub fn with_dev_tokens(mut self, allow: bool) -> Self {
        self.allow_dev_tokens = allow;
        self
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config
                .tokens
                .iter()
                .map(|entry| (entry.token.clone(), entry.principal.clone())),
        )
        .with_dev_tokens(config.allow_dev_tokens)
    }
}

#[async_trait::async_trait]
impl IdentityVerifier for StaticTokenVerifier {
    async fn verify(&self, credential: &str) -> WardrobeResult<Principal> {
        if let Some(user_id) = self.tokens.get(credential) {
            return Ok(Principal::new(user_id.clone()));
        }

        if self.allow_dev_tokens {
            if let Some(user_id) = credential.strip_prefix(DEV_TOKEN_PREFIX) {
                if !user_id.is_empty() && !user_id.contains('/') {
                    return Ok(Principal::new(user_id));
                }
            }
        }

        Err(WardrobeError::Unauthenticated(
            "Invalid or expired token".to_string(),
        ))
    }
}

/// Extract the credential from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
