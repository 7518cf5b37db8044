//! HTTP-level tests of the router, driven with `tower::ServiceExt::oneshot`.

mod test_utils;

use api_lib::adapters::MemoryStore;
use api_lib::config::Config;
use api_lib::web::app_router;
use api_lib::web::state::AppState;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use test_utils::mock_providers::{MockIllustrator, MockNarrator, MockStoryGenerator};
use test_utils::{Harness, STORY_TEXT};
use tower::ServiceExt;

fn router_for(harness: &Harness) -> Router {
    let config = Config {
        public_base_url: "https://stories.test".to_string(),
        ..Config::default()
    };
    let state = AppState {
        workflow: Arc::new(harness.workflow.clone()),
        users: harness.store.clone(),
        config: Arc::new(config),
    };
    app_router(Arc::new(state))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Option<String>, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, set_cookie, bytes.to_vec())
}

fn json_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

/// Signs up a fresh account and returns the `Cookie` header value for its session.
async fn signup(app: &Router, email: &str) -> String {
    let (status, set_cookie, _) = send(
        app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({ "email": email, "password": "hunter2" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let set_cookie = set_cookie.unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

fn story_body() -> Value {
    json!({
        "theme": "nature",
        "characters": ["a fox", "a rabbit"],
        "ageGroup": "5-8"
    })
}

async fn create_story(app: &Router, cookie: &str) -> Value {
    let (status, _, body) = send(app, "POST", "/stories", Some(cookie), Some(story_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    json_body(&body)
}

#[tokio::test]
async fn test_health() {
    let harness = Harness::new();
    let app = router_for(&harness);

    let (status, _, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["status"], "ok");
}

#[tokio::test]
async fn test_anonymous_listing_is_empty() {
    let harness = Harness::new();
    let app = router_for(&harness);
    let cookie = signup(&app, "ana@example.com").await;
    create_story(&app, &cookie).await;

    let (status, _, body) = send(&app, "GET", "/stories", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!([]));

    let (status, _, body) = send(&app, "GET", "/stories", Some("session=stale"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!([]));
}

#[tokio::test]
async fn test_create_requires_a_session() {
    let harness = Harness::new();
    let app = router_for(&harness);

    let (status, _, _) = send(&app, "POST", "/stories", None, Some(story_body())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(harness.generator.call_count(), 0);
}

#[tokio::test]
async fn test_create_and_list_in_camel_case() {
    let harness = Harness::new();
    let app = router_for(&harness);
    let cookie = signup(&app, "ana@example.com").await;

    let story = create_story(&app, &cookie).await;
    assert_eq!(story["title"], "Story about nature");
    assert_eq!(story["content"], STORY_TEXT);
    assert_eq!(story["ageGroup"], "5-8");
    assert_eq!(story["isFavorite"], false);
    assert_eq!(story["characters"], json!(["a fox", "a rabbit"]));
    assert!(story["imageUrl"].is_null());
    assert!(story.get("authorId").is_some());
    assert!(story.get("createdAt").is_some());

    let (status, _, body) = send(&app, "GET", "/stories", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = json_body(&body);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], story["id"]);

    let uri = format!("/stories/{}", story["id"].as_str().unwrap());
    let (status, _, body) = send(&app, "GET", &uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["id"], story["id"]);
}

#[tokio::test]
async fn test_listing_for_someone_else_is_empty() {
    let harness = Harness::new();
    let app = router_for(&harness);
    let cookie = signup(&app, "ana@example.com").await;
    let story = create_story(&app, &cookie).await;

    let uri = format!("/stories?user_id={}", uuid::Uuid::new_v4());
    let (_, _, body) = send(&app, "GET", &uri, Some(&cookie), None).await;
    assert_eq!(json_body(&body), json!([]));

    let uri = format!("/stories?user_id={}", story["authorId"].as_str().unwrap());
    let (_, _, body) = send(&app, "GET", &uri, Some(&cookie), None).await;
    assert_eq!(json_body(&body).as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_input_is_bad_request() {
    let harness = Harness::new();
    let app = router_for(&harness);
    let cookie = signup(&app, "ana@example.com").await;

    let (status, _, body) = send(
        &app,
        "POST",
        "/stories",
        Some(&cookie),
        Some(json!({ "theme": "nature", "characters": [], "ageGroup": "5-8" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8(body).unwrap().contains("character"));

    let (status, _, _) = send(
        &app,
        "POST",
        "/stories",
        Some(&cookie),
        Some(json!({ "characters": ["a fox"], "ageGroup": "5-8" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(harness.generator.call_count(), 0);
}

#[tokio::test]
async fn test_provider_failure_is_bad_gateway_without_details() {
    let harness = Harness::with(
        Arc::new(MemoryStore::new()),
        MockStoryGenerator::new_error("secret upstream detail"),
        MockIllustrator::new_success(),
        MockNarrator::new_success("mp3"),
    );
    let app = router_for(&harness);
    let cookie = signup(&app, "ana@example.com").await;

    let (status, _, body) = send(&app, "POST", "/stories", Some(&cookie), Some(story_body())).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let message = String::from_utf8(body).unwrap();
    assert!(!message.contains("secret upstream detail"));
    assert!(message.contains("Please try again"));
    assert_eq!(harness.store.story_count().await, 0);
}

#[tokio::test]
async fn test_favorite_share_and_delete() {
    let harness = Harness::new();
    let app = router_for(&harness);
    let cookie = signup(&app, "ana@example.com").await;
    let story = create_story(&app, &cookie).await;
    let id = story["id"].as_str().unwrap().to_string();

    let (status, _, body) = send(
        &app,
        "POST",
        &format!("/stories/{}/favorite", id),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!({ "isFavorite": true }));

    let (status, _, body) = send(
        &app,
        "GET",
        &format!("/stories/{}/share", id),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let share = json_body(&body);
    assert_eq!(share["shareUrl"], format!("https://stories.test/stories/{}", id));
    assert_eq!(share["shareData"]["title"], "Story about nature");
    assert_eq!(share["shareData"]["ageGroup"], "5-8");

    let uri = format!("/stories/{}", id);
    let (status, _, _) = send(&app, "DELETE", &uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _, _) = send(&app, "DELETE", &uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_other_users_cannot_see_or_touch_a_story() {
    let harness = Harness::new();
    let app = router_for(&harness);
    let owner = signup(&app, "owner@example.com").await;
    let intruder = signup(&app, "intruder@example.com").await;
    let story = create_story(&app, &owner).await;
    let id = story["id"].as_str().unwrap().to_string();

    for (method, uri) in [
        ("GET", format!("/stories/{}", id)),
        ("POST", format!("/stories/{}/favorite", id)),
        ("POST", format!("/stories/{}/regenerate-illustration", id)),
        ("GET", format!("/stories/{}/share", id)),
        ("DELETE", format!("/stories/{}", id)),
    ] {
        let (status, _, _) = send(&app, method, &uri, Some(&intruder), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{} {}", method, uri);
    }

    let (_, _, body) = send(&app, "GET", "/stories", Some(&intruder), None).await;
    assert_eq!(json_body(&body), json!([]));
    assert_eq!(harness.store.story_count().await, 1);
}

#[tokio::test]
async fn test_regenerate_illustration() {
    let harness = Harness::new();
    let app = router_for(&harness);
    let cookie = signup(&app, "ana@example.com").await;
    let story = create_story(&app, &cookie).await;
    let id = story["id"].as_str().unwrap().to_string();

    let (status, _, body) = send(
        &app,
        "POST",
        &format!("/stories/{}/regenerate-illustration", id),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["id"], id.as_str());
    let image_uri = format!("/stories/{}/image", id);
    assert!(body["imageUrl"]
        .as_str()
        .unwrap()
        .starts_with(&format!("{}?v=", image_uri)));
}

#[tokio::test]
async fn test_illustration_download() {
    let harness = Harness::new();
    let app = router_for(&harness);
    let cookie = signup(&app, "ana@example.com").await;
    let story = create_story(&app, &cookie).await;
    let id = story["id"].as_str().unwrap().to_string();
    let image_uri = format!("/stories/{}/image", id);

    let (status, _, _) = send(&app, "GET", &image_uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let regenerate_uri = format!("/stories/{}/regenerate-illustration", id);
    let (status, _, _) = send(&app, "POST", &regenerate_uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);

    let request = Request::builder()
        .method("GET")
        .uri(&image_uri)
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(bytes.to_vec(), b"png-1".to_vec());

    let intruder = signup(&app, "intruder@example.com").await;
    let (status, _, _) = send(&app, "GET", &image_uri, Some(&intruder), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, _) = send(&app, "GET", &image_uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_failed_regeneration_keeps_the_served_image() {
    let store = Arc::new(MemoryStore::new());
    let working = Harness::with(
        store.clone(),
        MockStoryGenerator::new_success(STORY_TEXT),
        MockIllustrator::new_success(),
        MockNarrator::new_success("mp3"),
    );
    let broken = Harness::with(
        store,
        MockStoryGenerator::new_success(STORY_TEXT),
        MockIllustrator::new_error("content policy"),
        MockNarrator::new_success("mp3"),
    );
    let working_app = router_for(&working);
    let broken_app = router_for(&broken);
    let cookie = signup(&working_app, "ana@example.com").await;
    let story = create_story(&working_app, &cookie).await;
    let id = story["id"].as_str().unwrap().to_string();
    let regenerate_uri = format!("/stories/{}/regenerate-illustration", id);
    let image_uri = format!("/stories/{}/image", id);

    let (status, _, body) = send(&working_app, "POST", &regenerate_uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    let image_url = json_body(&body)["imageUrl"].clone();

    let (status, _, _) = send(&broken_app, "POST", &regenerate_uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (status, _, body) = send(&broken_app, "GET", &image_uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"png-1".to_vec());
    let story_uri = format!("/stories/{}", id);
    let (_, _, body) = send(&broken_app, "GET", &story_uri, Some(&cookie), None).await;
    assert_eq!(json_body(&body)["imageUrl"], image_url);
}

#[tokio::test]
async fn test_malformed_bodies_are_bad_requests() {
    let harness = Harness::new();
    let app = router_for(&harness);
    let cookie = signup(&app, "ana@example.com").await;

    for body in [
        json!({ "theme": null, "characters": ["a fox"], "ageGroup": "5-8" }),
        json!({ "theme": "nature", "characters": "a fox", "ageGroup": "5-8" }),
        json!({ "theme": 7, "characters": ["a fox"], "ageGroup": "5-8" }),
    ] {
        let (status, _, _) =
            send(&app, "POST", "/stories", Some(&cookie), Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    }

    let request = Request::builder()
        .method("POST")
        .uri("/stories")
        .header(header::COOKIE, &cookie)
        .body(Body::from(story_body().to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method("POST")
        .uri("/stories")
        .header(header::COOKIE, &cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"theme\": "))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, _, _) = send(
        &app,
        "POST",
        "/speech",
        Some(&cookie),
        Some(json!({ "text": null })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": 42, "password": "hunter2" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(harness.generator.call_count(), 0);
    assert_eq!(harness.narrator.call_count(), 0);
}

#[tokio::test]
async fn test_malformed_story_ids_are_not_found() {
    let harness = Harness::new();
    let app = router_for(&harness);
    let cookie = signup(&app, "ana@example.com").await;

    for (method, uri) in [
        ("GET", "/stories/42"),
        ("POST", "/stories/42/favorite"),
        ("POST", "/stories/not-a-uuid/regenerate-illustration"),
        ("GET", "/stories/42/image"),
        ("GET", "/stories/42/share"),
        ("POST", "/stories/42/audio"),
        ("GET", "/stories/42/audio"),
        ("DELETE", "/stories/42"),
    ] {
        let (status, _, _) = send(&app, method, uri, Some(&cookie), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{} {}", method, uri);
    }
}

#[tokio::test]
async fn test_narration_and_audio_download() {
    let harness = Harness::new();
    let app = router_for(&harness);
    let cookie = signup(&app, "ana@example.com").await;
    let story = create_story(&app, &cookie).await;
    let id = story["id"].as_str().unwrap().to_string();
    let audio_uri = format!("/stories/{}/audio", id);

    let (status, _, _) = send(&app, "GET", &audio_uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, body) = send(&app, "POST", &audio_uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    let narrated = json_body(&body);
    assert!(narrated["audioUrl"]
        .as_str()
        .unwrap()
        .starts_with(&format!("{}?v=", audio_uri)));

    let (status, _, body) = send(&app, "GET", &audio_uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"mp3-bytes".to_vec());

    send(
        &app,
        "POST",
        &format!("{}?refresh=true", audio_uri),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(harness.narrator.call_count(), 2);
}

#[tokio::test]
async fn test_speech_endpoint() {
    let harness = Harness::new();
    let app = router_for(&harness);

    let (status, _, _) = send(
        &app,
        "POST",
        "/speech",
        None,
        Some(json!({ "text": "Once upon a time" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let cookie = signup(&app, "ana@example.com").await;
    let request = Request::builder()
        .method("POST")
        .uri("/speech")
        .header(header::COOKIE, &cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "text": "Once upon a time" }).to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "audio/mpeg"
    );

    let (status, _, _) = send(
        &app,
        "POST",
        "/speech",
        Some(&cookie),
        Some(json!({ "text": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_and_logout() {
    let harness = Harness::new();
    let app = router_for(&harness);
    signup(&app, "Ana@Example.com").await;

    let (status, _, _) = send(
        &app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({ "email": "ana@example.com", "password": "other" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _, _) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "ana@example.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, set_cookie, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "ana@example.com", "password": "hunter2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["email"], "ana@example.com");
    let cookie = set_cookie.unwrap().split(';').next().unwrap().to_string();

    let (status, _, _) = send(&app, "POST", "/stories", Some(&cookie), Some(story_body())).await;
    assert_eq!(status, StatusCode::CREATED);

    send(&app, "POST", "/auth/logout", Some(&cookie), None).await;
    let (status, _, _) = send(&app, "POST", "/stories", Some(&cookie), Some(story_body())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
