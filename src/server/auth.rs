use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireSession;
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{
    AuthResponse, GoogleLoginRequest, LoginRequest, OAuthCallbackParams, RegisterRequest,
    SessionResponse,
};
use crate::server::response::{ApiError, ApiResponse};

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> impl IntoResponse {
    let signed_in = state
        .resolver
        .register(&req.email, &req.password, &req.username)?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(AuthResponse::from(signed_in))),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let issued = state.identity.sign_in(&req.email, &req.password)?;
    let username = state.resolver.resolve_username(&issued.session)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(AuthResponse {
        token: issued.token,
        expires_at: issued.expires_at,
        uid: issued.session.uid,
        username,
        email: issued.session.email,
    })))
}

pub async fn logout(auth: RequireSession, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.identity.revoke_token(&auth.token)?;
    tracing::info!("uid {} signed out", auth.session.uid);
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn github_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<OAuthCallbackParams>,
) -> impl IntoResponse {
    let access_token = state.github.exchange_code(&params.code).await?;
    let github_user = state.github.fetch_user(&access_token).await?;
    let signed_in = state.resolver.bootstrap_oauth(&github_user.into_profile())?;

    Ok::<_, ApiError>(Json(ApiResponse::success(AuthResponse::from(signed_in))))
}

/// Only claims from a token Google itself vouches for are used.
pub async fn google_login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GoogleLoginRequest>,
) -> impl IntoResponse {
    let claims = state.google.verify(&req.id_token).await?;
    let signed_in = state.resolver.bootstrap_oauth(&claims.into_profile()?)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(AuthResponse::from(signed_in))))
}

pub async fn current_session(
    auth: RequireSession,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let username = match state.resolver.resolve_username(&auth.session) {
        Ok(username) => Some(username),
        Err(Error::NotFound(_)) => None,
        Err(e) => return Err(ApiError::from(e)),
    };

    let session = auth.session;
    Ok::<_, ApiError>(Json(ApiResponse::success(SessionResponse {
        uid: session.uid,
        email: session.email,
        display_name: session.display_name,
        username,
    })))
}
