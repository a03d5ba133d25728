use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};

use crate::auth::RequireSession;
use crate::images::decode_payload;
use crate::markdown::image_embed;
use crate::server::AppState;
use crate::server::dto::{UploadImageRequest, UploadImageResponse};
use crate::server::response::{ApiError, ApiResponse};

#[must_use]
fn get_host_from_headers(headers: &HeaderMap) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");

    format!("{scheme}://{host}")
}

pub async fn upload_image(
    auth: RequireSession,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<UploadImageRequest>,
) -> impl IntoResponse {
    let (data, format) = decode_payload(&req.data)?;
    let name = state.images.put(&data, format).await?;

    let base = state
        .public_base_url
        .clone()
        .unwrap_or_else(|| get_host_from_headers(&headers));
    let url = format!("{base}/api/v1/images/{name}");

    tracing::info!("uid {} uploaded image {name}", auth.session.uid);

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(UploadImageResponse {
            markdown: image_embed(&url),
            name,
            url,
        })),
    ))
}

/// Names are content hashes, so a stored image never changes.
pub async fn get_image(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let (data, format) = state.images.get(&name).await?;
    Ok::<_, ApiError>((
        [
            (header::CONTENT_TYPE, format.content_type()),
            (header::CACHE_CONTROL, "public, max-age=31536000, immutable"),
        ],
        data,
    ))
}
