use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::auth::RequireSession;
use crate::server::AppState;
use crate::server::dto::{UpdateResumeRequest, UsernameResponse};
use crate::server::response::{ApiError, ApiResponse};

pub async fn username_exists(
    State(state): State<Arc<AppState>>,
    Path(candidate): Path<String>,
) -> impl IntoResponse {
    let exists = state.resolver.username_exists(&candidate)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(UsernameResponse {
        username: candidate,
        exists,
    })))
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> impl IntoResponse {
    let profile = state.repo.get_profile(&username)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(profile)))
}

pub async fn update_resume(
    auth: RequireSession,
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    Json(req): Json<UpdateResumeRequest>,
) -> impl IntoResponse {
    let profile = state
        .repo
        .update_resume(&auth.session, &username, &req.resume)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(profile)))
}

pub async fn list_tags(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> impl IntoResponse {
    let tags = state.repo.post_tags(&username)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(tags)))
}
