use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use bromine_core::{open_db_in_memory, CoverPalette};
use bromine_server::{router, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    router(AppState::new(
        open_db_in_memory().unwrap(),
        CoverPalette::default(),
    ))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn post_upserts_by_local_id() {
    let app = app();
    let body = json!({"localId": "abc", "title": "Untitled", "content": "<p></p>"});

    let (status, first) = send(&app, "POST", "/notes", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["localId"], "abc");
    assert_eq!(first["title"], "Untitled");

    let again = json!({"localId": "abc", "title": "Renamed", "coverImage": "#FFD700"});
    let (_, second) = send(&app, "POST", "/notes", Some(again)).await;
    assert_eq!(second["id"], first["id"]);
    assert_eq!(second["title"], "Renamed");

    let (status, list) = send(&app, "GET", "/notes", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn post_without_title_is_bad_request() {
    let app = app();
    let (status, body) = send(&app, "POST", "/notes", Some(json!({"localId": "abc"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("title"));
}

#[tokio::test]
async fn put_replaces_fields_and_rejects_unknown_ids() {
    let app = app();
    let (_, created) = send(
        &app,
        "POST",
        "/notes",
        Some(json!({"localId": "abc", "title": "Untitled", "content": "<p>x</p>"})),
    )
    .await;
    let uri = format!("/notes/{}", created["id"].as_str().unwrap());

    let (status, updated) = send(
        &app,
        "PUT",
        &uri,
        Some(json!({"title": "Plan", "content": "<p>y</p>", "coverImage": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Plan");
    assert_eq!(updated["content"], "<p>y</p>");
    assert_eq!(updated["createdAt"], created["createdAt"]);

    let missing = format!("/notes/{}", uuid::Uuid::new_v4());
    let (status, body) = send(&app, "PUT", &missing, Some(json!({"title": "x"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().starts_with("note not found"));

    let (status, _) = send(&app, "PUT", "/notes/not-a-uuid", Some(json!({"title": "x"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "PUT", &uri, Some(json!({"content": "<p>z</p>"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn put_with_older_edit_seq_conflicts() {
    let app = app();
    let (_, created) = send(
        &app,
        "POST",
        "/notes",
        Some(json!({"localId": "abc", "title": "Untitled"})),
    )
    .await;
    let uri = format!("/notes/{}", created["id"].as_str().unwrap());

    let (status, _) = send(&app, "PUT", &uri, Some(json!({"title": "b", "editSeq": 2}))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, "PUT", &uri, Some(json!({"title": "a", "editSeq": 1}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn delete_is_idempotent() {
    let app = app();
    let (_, created) = send(
        &app,
        "POST",
        "/notes",
        Some(json!({"localId": "abc", "title": "Untitled"})),
    )
    .await;
    let uri = format!("/notes/{}", created["id"].as_str().unwrap());

    for _ in 0..2 {
        let (status, body) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Note Deleted"}));
    }

    let (status, body) = send(&app, "DELETE", "/notes/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Note Deleted"}));

    let (_, list) = send(&app, "GET", "/notes", None).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn palette_and_health_are_served() {
    let app = app();
    let (status, palette) = send(&app, "GET", "/palette", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        palette.as_array().unwrap().len(),
        CoverPalette::default().len()
    );

    let (status, health) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");
}
