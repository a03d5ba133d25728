use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireSession;
use crate::markdown::table_of_contents;
use crate::repository::{NewPost, PostQuery, PostUpdate};
use crate::server::AppState;
use crate::server::dto::{
    CreateCommentRequest, CreatePostRequest, CreatedResponse, ListPostsParams, UpdatePostRequest,
};
use crate::server::response::{ApiError, ApiResponse};

pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    Query(params): Query<ListPostsParams>,
) -> impl IntoResponse {
    let query = PostQuery {
        tag: params.tag,
        term: params.q,
    };
    let posts = state.repo.search_posts(&username, &query)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(posts)))
}

/// Posts always go into the caller's own namespace.
pub async fn create_post(
    auth: RequireSession,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePostRequest>,
) -> impl IntoResponse {
    let post_id = state.repo.add_post(
        &auth.session,
        NewPost {
            title: req.title,
            content: req.content,
            tags: req.tags,
        },
    )?;

    let username = state.resolver.resolve_username(&auth.session)?;
    let post = state.repo.get_post(&username, &post_id)?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(post))))
}

pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path((username, post_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let post = state.repo.get_post(&username, &post_id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(post)))
}

pub async fn update_post(
    auth: RequireSession,
    State(state): State<Arc<AppState>>,
    Path((username, post_id)): Path<(String, String)>,
    Json(req): Json<UpdatePostRequest>,
) -> impl IntoResponse {
    let post = state.repo.update_post(
        &auth.session,
        &username,
        &post_id,
        PostUpdate {
            title: req.title,
            content: req.content,
            tags: req.tags,
        },
    )?;
    Ok::<_, ApiError>(Json(ApiResponse::success(post)))
}

pub async fn delete_post(
    auth: RequireSession,
    State(state): State<Arc<AppState>>,
    Path((username, post_id)): Path<(String, String)>,
) -> impl IntoResponse {
    state.repo.delete_post(&auth.session, &username, &post_id)?;
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn post_toc(
    State(state): State<Arc<AppState>>,
    Path((username, post_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let post = state.repo.get_post(&username, &post_id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(table_of_contents(&post.content))))
}

pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path((username, post_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let comments = state.repo.list_comments(&username, &post_id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(comments)))
}

pub async fn create_comment(
    auth: RequireSession,
    State(state): State<Arc<AppState>>,
    Path((username, post_id)): Path<(String, String)>,
    Json(req): Json<CreateCommentRequest>,
) -> impl IntoResponse {
    let id = state
        .repo
        .add_comment(&auth.session, &username, &post_id, &req.content)?;
    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreatedResponse { id })),
    ))
}

pub async fn delete_comment(
    auth: RequireSession,
    State(state): State<Arc<AppState>>,
    Path((username, post_id, comment_id)): Path<(String, String, String)>,
) -> impl IntoResponse {
    state
        .repo
        .delete_comment(&auth.session, &username, &post_id, &comment_id)?;
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
