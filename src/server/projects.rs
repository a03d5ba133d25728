use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireSession;
use crate::server::AppState;
use crate::server::dto::CreateProjectRequest;
use crate::server::response::{ApiError, ApiResponse};

pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> impl IntoResponse {
    let projects = state.repo.list_projects(&username)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(projects)))
}

pub async fn create_project(
    auth: RequireSession,
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    Json(req): Json<CreateProjectRequest>,
) -> impl IntoResponse {
    let project = state
        .repo
        .add_project(&auth.session, &req.repo_url, &req.description, &username)
        .await?;
    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(project))))
}

pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Path((username, project_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let project = state.repo.get_project(&username, &project_id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(project)))
}

pub async fn delete_project(
    auth: RequireSession,
    State(state): State<Arc<AppState>>,
    Path((username, project_id)): Path<(String, String)>,
) -> impl IntoResponse {
    state
        .repo
        .delete_project(&auth.session, &project_id, &username)?;
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn list_github_repos(
    State(state): State<Arc<AppState>>,
    Path(login): Path<String>,
) -> impl IntoResponse {
    let repos = state.github.list_user_repos(&login).await?;
    Ok::<_, ApiError>(Json(ApiResponse::success(repos)))
}
