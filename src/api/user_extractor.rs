use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::auth::bearer_token;
use crate::error::WardrobeError;
use crate::model::Principal;
use crate::service::AppState;

/// Raw bearer credential from the `Authorization` header, not yet verified
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = WardrobeError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        bearer_token(&parts.headers)
            .map(BearerToken)
            .ok_or_else(|| WardrobeError::Unauthenticated("Missing bearer token".to_string()))
    }
}

/// Axum extractor resolving the caller through the configured identity verifier
#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = WardrobeError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        state.verifier.verify(&token).await
    }
}
