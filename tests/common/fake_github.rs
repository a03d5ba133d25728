//! A stand-in for the GitHub REST and OAuth endpoints the server calls.

use axum::{
    Json, Router,
    extract::Path,
    http::{HeaderMap, StatusCode, header},
    routing::{get, post},
};
use serde_json::{Value, json};

pub const GOOD_CODE: &str = "good-code";
const ACCESS_TOKEN: &str = "gho_test_token";

fn repo_json(owner: &str, name: &str, updated_at: &str, fork: bool) -> Value {
    json!({
        "id": 1296269,
        "name": name,
        "full_name": format!("{owner}/{name}"),
        "description": "This your first repo!",
        "html_url": format!("https://github.com/{owner}/{name}"),
        "stargazers_count": 80,
        "forks_count": 9,
        "language": "Rust",
        "topics": ["octocat", "api"],
        "updated_at": updated_at,
        "fork": fork,
    })
}

async fn get_repo(Path((owner, repo)): Path<(String, String)>) -> Result<Json<Value>, StatusCode> {
    if repo == "missing" {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(repo_json(&owner, &repo, "2024-02-01T10:00:00Z", false)))
}

async fn list_repos(Path(login): Path<String>) -> Result<Json<Value>, StatusCode> {
    if login == "ghost" {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(json!([
        repo_json(&login, "oldest", "2021-01-01T00:00:00Z", false),
        repo_json(&login, "a-fork", "2024-06-01T00:00:00Z", true),
        repo_json(&login, "newest", "2024-05-01T00:00:00Z", false),
    ])))
}

async fn access_token(Json(body): Json<Value>) -> Json<Value> {
    if body["code"] == GOOD_CODE && body["client_secret"] == "test-secret" {
        Json(json!({ "access_token": ACCESS_TOKEN, "token_type": "bearer" }))
    } else {
        Json(json!({
            "error": "bad_verification_code",
            "error_description": "The code passed is incorrect or expired."
        }))
    }
}

async fn current_user(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    let expected = format!("Bearer {ACCESS_TOKEN}");
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(expected.as_str());
    if !authorized {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(json!({
        "id": 583231,
        "login": "octocat",
        "name": "The Octocat",
        "email": null,
    })))
}

/// Serves the fake API on a random local port and returns its base URL.
pub async fn start() -> String {
    let app = Router::new()
        .route("/repos/{owner}/{repo}", get(get_repo))
        .route("/users/{login}/repos", get(list_repos))
        .route("/login/oauth/access_token", post(access_token))
        .route("/user", get(current_user));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake github");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve fake github");
    });

    format!("http://{addr}")
}
