use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, header::AUTHORIZATION, header::WWW_AUTHENTICATE, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::helpers::{TokenExtractionError, extract_token_from_header};
use crate::error::Error;
use crate::server::AppState;
use crate::types::Session;

/// Extractor that requires a signed-in caller.
pub struct RequireSession {
    pub session: Session,
    /// The raw bearer token, kept so logout can revoke it.
    pub token: String,
}

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidToken,
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidScheme => (StatusCode::UNAUTHORIZED, "Invalid authorization scheme"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid or expired token"),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "data": null, "error": message });
        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"archilog\""),
            );
        }

        response
    }
}

impl FromRequestParts<Arc<AppState>> for RequireSession {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or(AuthError::MissingAuth)?;
        let session = verify(state, &token)?;
        Ok(RequireSession { session, token })
    }
}

fn bearer_token(parts: &Parts) -> Result<Option<String>, AuthError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    extract_token_from_header(auth_header).map_err(|e| match e {
        TokenExtractionError::InvalidScheme => AuthError::InvalidScheme,
    })
}

fn verify(state: &AppState, token: &str) -> Result<Session, AuthError> {
    state.identity.verify_token(token).map_err(|e| match e {
        Error::Unauthenticated | Error::InvalidTokenFormat => AuthError::InvalidToken,
        other => {
            tracing::error!("Token verification failed: {other}");
            AuthError::InternalError
        }
    })
}
