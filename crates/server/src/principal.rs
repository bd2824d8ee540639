//! Bearer-token extractor producing the typed request principal.

use axum::{RequestPartsExt, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use services::services::auth::Principal;

use crate::{AppState, error::ApiError};

/// The authenticated identity for a request. Decoded exactly once from the
/// Authorization header; handlers take this instead of touching the token.
#[derive(Debug, Clone)]
pub struct AuthPrincipal(pub Principal);

impl FromRequestParts<AppState> for AuthPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| ApiError::Unauthorized("missing bearer token".to_string()))?;

        let principal = state.auth().validate(bearer.token())?;
        Ok(AuthPrincipal(principal))
    }
}

/// Admin gate for board administration endpoints.
pub fn require_admin(principal: &Principal) -> Result<(), ApiError> {
    if !principal.is_admin() {
        return Err(ApiError::Forbidden("requires admin role".to_string()));
    }
    Ok(())
}
