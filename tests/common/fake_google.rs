//! A stand-in for Google's `tokeninfo` endpoint. Only the ID tokens listed
//! here are genuine.

use std::collections::HashMap;

use axum::{Json, Router, extract::Query, http::StatusCode, routing::get};
use chrono::Utc;
use serde_json::{Value, json};

pub const CLIENT_ID: &str = "test-google-client";
pub const MINJI_TOKEN: &str = "minji-id-token";
pub const VICTIM_TOKEN: &str = "victim-id-token";
pub const OTHER_APP_TOKEN: &str = "other-app-id-token";

fn claims(aud: &str, sub: &str, email: &str, name: &str) -> Value {
    json!({
        "iss": "https://accounts.google.com",
        "aud": aud,
        "sub": sub,
        "email": email,
        "email_verified": "true",
        "name": name,
        "exp": (Utc::now().timestamp() + 3600).to_string(),
    })
}

async fn tokeninfo(
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    match params.get("id_token").map(String::as_str) {
        Some(MINJI_TOKEN) => Ok(Json(claims(
            CLIENT_ID,
            "1029384756",
            "minji.kim@example.com",
            "김민지",
        ))),
        Some(VICTIM_TOKEN) => Ok(Json(claims(CLIENT_ID, "42", "victim@example.com", "Victim"))),
        Some(OTHER_APP_TOKEN) => Ok(Json(claims(
            "someone-elses-client",
            "42",
            "victim@example.com",
            "Victim",
        ))),
        _ => Err(StatusCode::BAD_REQUEST),
    }
}

/// Serves the fake endpoint and returns its full `tokeninfo` URL.
pub async fn start() -> String {
    let app = Router::new().route("/tokeninfo", get(tokeninfo));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake google");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve fake google");
    });

    format!("http://{addr}/tokeninfo")
}
