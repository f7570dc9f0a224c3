use std::{path::Path, sync::Arc};

use anyhow::Result;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use super::{API_PREFIX, AppState, extract::USER_ID_HEADER, router};
use crate::{
    media::{MediaUploader, UploadedMedia},
    store::{Id, LikeTarget, Store, testing},
};

const BOUNDARY: &str = "vidshare-test-boundary";

#[derive(Default)]
struct FakeMedia {
    uploads: Mutex<Vec<String>>,
}

impl MediaUploader for FakeMedia {
    fn upload(&self, path: &Path, file_name: Option<&str>) -> Result<UploadedMedia> {
        assert!(path.exists(), "staged file should exist during upload");
        let name = file_name.unwrap_or("file").to_string();
        self.uploads.lock().push(name.clone());
        Ok(UploadedMedia {
            url: format!("https://cdn.test/{name}"),
            duration: name.ends_with(".mp4").then_some(42.0),
        })
    }
}

struct Harness {
    app: Router,
    store: Store,
    media: Arc<FakeMedia>,
    staging: TempDir,
}

fn harness() -> Harness {
    let store = testing::store();
    let media = Arc::new(FakeMedia::default());
    let staging = tempfile::tempdir().unwrap();
    let state = AppState::new(store.clone(), media.clone(), staging.path().to_path_buf());
    Harness {
        app: router(state, 10 * 1024 * 1024),
        store,
        media,
        staging,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn request(method: Method, uri: &str, user: Option<Id>) -> axum::http::request::Builder {
    let mut builder = Request::builder()
        .method(method)
        .uri(format!("{API_PREFIX}{uri}"));
    if let Some(user) = user {
        builder = builder.header(USER_ID_HEADER, user.to_string());
    }
    builder
}

fn empty(method: Method, uri: &str, user: Option<Id>) -> Request<Body> {
    request(method, uri, user).body(Body::empty()).unwrap()
}

fn json_request(method: Method, uri: &str, user: Option<Id>, body: Value) -> Request<Body> {
    request(method, uri, user)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn multipart_request(
    method: Method,
    uri: &str,
    user: Option<Id>,
    fields: &[(&str, &str)],
    files: &[(&str, &str, &[u8])],
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, file_name, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    request(method, uri, user)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn healthcheck_uses_envelope() {
    let h = harness();
    let (status, body) = send(&h.app, empty(Method::GET, "/healthcheck", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["statusCode"], 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], "OK");
}

#[tokio::test]
async fn registers_and_fetches_users() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        json_request(
            Method::POST,
            "/users",
            None,
            json!({"username": "Alice", "email": "alice@example.com", "fullName": "Alice A"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");
    let id = body["data"]["_id"].as_i64().unwrap();

    let (status, body) = send(&h.app, empty(Method::GET, &format!("/users/{id}"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["fullName"], "Alice A");

    let (status, body) = send(
        &h.app,
        json_request(
            Method::POST,
            "/users",
            None,
            json!({"username": "alice", "email": "a2@example.com", "fullName": "Other"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Username already taken");
}

#[tokio::test]
async fn missing_or_unknown_identity_is_rejected() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        json_request(Method::POST, "/tweets", None, json!({"tweet": "hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "unauthorized request");
    assert_eq!(body["errors"], json!([]));

    let (status, _) = send(
        &h.app,
        json_request(Method::POST, "/tweets", Some(77), json!({"tweet": "hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn publishing_a_video_uploads_both_files() {
    let h = harness();
    let alice = testing::user(&h.store, "alice");
    let (status, body) = send(
        &h.app,
        multipart_request(
            Method::POST,
            "/videos",
            Some(alice),
            &[("title", "My first"), ("description", "hello world")],
            &[
                ("videoFile", "clip.mp4", b"not really a video"),
                ("thumbnail", "thumb.jpg", b"not really a jpeg"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let video = &body["data"];
    assert_eq!(video["title"], "My first");
    assert_eq!(video["isPublished"], true);
    assert_eq!(video["videoFile"], "https://cdn.test/clip.mp4");
    assert_eq!(video["thumbnail"], "https://cdn.test/thumb.jpg");
    assert_eq!(video["duration"], 42.0);
    assert_eq!(video["owner"], alice);
    assert_eq!(h.media.uploads.lock().len(), 2);

    let id = video["_id"].as_i64().unwrap();
    let (status, body) = send(&h.app, empty(Method::GET, &format!("/videos/{id}"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["views"], 1);

    let leftovers = std::fs::read_dir(h.staging.path()).unwrap().count();
    assert_eq!(leftovers, 0, "staged files should be cleaned up");
}

#[tokio::test]
async fn publishing_without_thumbnail_is_a_validation_error() {
    let h = harness();
    let alice = testing::user(&h.store, "alice");
    let (status, body) = send(
        &h.app,
        multipart_request(
            Method::POST,
            "/videos",
            Some(alice),
            &[("title", "t"), ("description", "d")],
            &[("videoFile", "clip.mp4", b"bytes")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Thumbnail is required");
    assert!(h.media.uploads.lock().is_empty());
}

#[tokio::test]
async fn owner_edits_video_details() {
    let h = harness();
    let alice = testing::user(&h.store, "alice");
    let video = testing::video(&h.store, alice, "intro");
    let uri = format!("/videos/{video}");

    let (status, body) = send(
        &h.app,
        multipart_request(
            Method::PATCH,
            &uri,
            Some(alice),
            &[("title", "Intro, revised"), ("description", "now longer")],
            &[],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["title"], "Intro, revised");
    assert_eq!(body["data"]["description"], "now longer");
    assert_eq!(body["data"]["thumbnail"], "https://media.example/intro.jpg");
    assert!(h.media.uploads.lock().is_empty());

    let (status, body) = send(
        &h.app,
        multipart_request(
            Method::PATCH,
            &uri,
            Some(alice),
            &[("newTitle", "Intro v3"), ("newDescription", "legacy names")],
            &[("thumbnail", "cover.png", b"png bytes")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["title"], "Intro v3");
    assert_eq!(body["data"]["thumbnail"], "https://cdn.test/cover.png");
    assert_eq!(*h.media.uploads.lock(), vec!["cover.png".to_string()]);

    let (status, body) = send(
        &h.app,
        multipart_request(Method::PATCH, &uri, Some(alice), &[("title", "x")], &[]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid Description");
}

#[tokio::test]
async fn non_owner_edit_is_refused_before_uploading() {
    let h = harness();
    let alice = testing::user(&h.store, "alice");
    let bob = testing::user(&h.store, "bob");
    let video = testing::video(&h.store, alice, "intro");

    let (status, body) = send(
        &h.app,
        multipart_request(
            Method::PATCH,
            &format!("/videos/{video}"),
            Some(bob),
            &[("title", "hijacked"), ("description", "mine now")],
            &[("thumbnail", "evil.png", b"png bytes")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Only the owner can modify this video");
    assert!(h.media.uploads.lock().is_empty());
    assert_eq!(h.store.get_video(video).unwrap().unwrap().title, "intro");
}

#[tokio::test]
async fn toggle_publish_over_http() {
    let h = harness();
    let alice = testing::user(&h.store, "alice");
    let bob = testing::user(&h.store, "bob");
    let video = testing::video(&h.store, alice, "intro");
    let uri = format!("/videos/{video}/toggle-publish");

    let (status, body) = send(&h.app, empty(Method::PATCH, &uri, Some(alice))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isPublished"], false);

    let (status, _) = send(&h.app, empty(Method::PATCH, &uri, Some(bob))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = send(&h.app, empty(Method::PATCH, &uri, Some(alice))).await;
    assert_eq!(body["data"]["isPublished"], true);

    let (status, body) = send(
        &h.app,
        empty(Method::PATCH, "/videos/9999/toggle-publish", Some(alice)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Video not found");
}

#[tokio::test]
async fn video_listing_paginates() {
    let h = harness();
    let alice = testing::user(&h.store, "alice");
    for n in 0..12 {
        testing::video(&h.store, alice, &format!("v{n:02}"));
    }
    let (status, first) = send(&h.app, empty(Method::GET, "/videos?page=1&limit=10", None)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = send(&h.app, empty(Method::GET, "/videos?page=2&limit=10", None)).await;

    let first_docs = first["data"]["docs"].as_array().unwrap();
    let second_docs = second["data"]["docs"].as_array().unwrap();
    assert_eq!(first_docs.len(), 10);
    assert_eq!(second_docs.len(), 2);
    assert_eq!(first["data"]["totalDocs"], 12);
    assert_eq!(first["data"]["hasNextPage"], true);
    assert_eq!(second["data"]["hasNextPage"], false);
    for doc in second_docs {
        assert!(!first_docs.contains(doc));
    }

    let (status, body) = send(&h.app, empty(Method::GET, "/videos?sortBy=password", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = send(
        &h.app,
        empty(
            Method::GET,
            &format!("/videos?sortBy=title&sortType=desc&userId={alice}&limit=1"),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["docs"][0]["title"], "v11");
}

#[tokio::test]
async fn commenting_on_a_video() {
    let h = harness();
    let alice = testing::user(&h.store, "alice");
    let video = testing::video(&h.store, alice, "intro");

    let (status, body) = send(
        &h.app,
        json_request(
            Method::POST,
            &format!("/comments/{video}"),
            Some(alice),
            json!({"comment": "nice"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "nice");
    assert_eq!(body["data"]["video"], video);

    let (status, _) = send(
        &h.app,
        json_request(
            Method::POST,
            &format!("/videos/{video}/comments"),
            Some(alice),
            json!({"comment": "again"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &h.app,
        empty(Method::GET, &format!("/videos/{video}/comments?limit=1&page=2"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["content"], "again");

    let (status, body) = send(
        &h.app,
        json_request(
            Method::POST,
            &format!("/videos/{video}/comments"),
            Some(alice),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid Comment");
}

#[tokio::test]
async fn deletes_check_existence_and_ownership() {
    let h = harness();
    let alice = testing::user(&h.store, "alice");
    let bob = testing::user(&h.store, "bob");
    let video = testing::video(&h.store, alice, "intro");
    let comment = h.store.add_comment(video, alice, "mine").unwrap().unwrap().id;

    let (status, _) = send(
        &h.app,
        empty(Method::DELETE, &format!("/comments/{comment}"), Some(bob)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &h.app,
        empty(Method::DELETE, &format!("/comments/{comment}"), Some(alice)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &h.app,
        empty(Method::DELETE, &format!("/comments/{comment}"), Some(alice)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Comment not found");

    let (status, body) = send(&h.app, empty(Method::DELETE, "/videos/abc", Some(alice))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid video id");
}

#[tokio::test]
async fn like_toggle_round_trips() {
    let h = harness();
    let alice = testing::user(&h.store, "alice");
    let bob = testing::user(&h.store, "bob");
    let video = testing::video(&h.store, alice, "intro");
    let uri = format!("/likes/toggle/video/{video}");

    let (status, body) = send(&h.app, empty(Method::POST, &uri, Some(bob))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isLiked"], true);
    assert_eq!(body["data"]["target"], json!({"kind": "video", "id": video}));

    let (_, liked) = send(&h.app, empty(Method::GET, "/likes/videos", Some(bob))).await;
    assert_eq!(liked["data"].as_array().unwrap().len(), 1);

    let (_, body) = send(&h.app, empty(Method::POST, &uri, Some(bob))).await;
    assert_eq!(body["data"]["isLiked"], false);
    assert!(!h.store.has_liked(LikeTarget::video(video), bob).unwrap());

    let (status, body) = send(
        &h.app,
        empty(Method::POST, "/likes/toggle/tweet/999", Some(bob)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Tweet not found");
}

#[tokio::test]
async fn subscriptions_toggle_and_list() {
    let h = harness();
    let alice = testing::user(&h.store, "alice");
    let bob = testing::user(&h.store, "bob");

    let (status, body) = send(
        &h.app,
        empty(Method::POST, &format!("/subscriptions/{bob}"), Some(bob)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = send(
        &h.app,
        empty(Method::POST, &format!("/subscriptions/{alice}"), Some(bob)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isSubscribed"], true);

    let (_, body) = send(
        &h.app,
        empty(Method::GET, &format!("/subscriptions/{alice}/subscribers"), None),
    )
    .await;
    assert_eq!(body["data"]["subscriberCount"], 1);
    assert_eq!(body["data"]["subscribers"][0]["username"], "bob");

    let (_, body) = send(
        &h.app,
        empty(Method::GET, &format!("/users/{bob}/subscriptions"), None),
    )
    .await;
    assert_eq!(body["data"]["totalSubscribedChannels"], 1);
    assert_eq!(body["data"]["channels"][0]["_id"], alice);
}

#[tokio::test]
async fn playlist_lifecycle() {
    let h = harness();
    let alice = testing::user(&h.store, "alice");
    let first = testing::video(&h.store, alice, "a");
    let second = testing::video(&h.store, alice, "b");

    let (status, body) = send(
        &h.app,
        json_request(
            Method::POST,
            "/playlists",
            Some(alice),
            json!({"name": "mix", "description": "favourites"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let playlist = body["data"]["_id"].as_i64().unwrap();

    for video in [first, second, first] {
        let (status, _) = send(
            &h.app,
            empty(
                Method::PATCH,
                &format!("/playlists/add/{video}/{playlist}"),
                Some(alice),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = send(
        &h.app,
        empty(
            Method::PATCH,
            &format!("/playlists/remove/{first}/{playlist}"),
            Some(alice),
        ),
    )
    .await;
    assert_eq!(body["data"]["videos"], json!([second]));

    let (status, body) = send(
        &h.app,
        json_request(
            Method::PATCH,
            &format!("/playlists/{playlist}"),
            Some(alice),
            json!({"name": "renamed"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Playlist description is required");

    let (_, body) = send(
        &h.app,
        empty(Method::GET, &format!("/playlists/user/{alice}"), None),
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = send(
        &h.app,
        empty(Method::DELETE, &format!("/playlists/{playlist}"), Some(alice)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &h.app,
        empty(Method::GET, &format!("/playlists/{playlist}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dashboard_for_empty_channel_is_zeroed() {
    let h = harness();
    let alice = testing::user(&h.store, "alice");
    let (status, body) = send(&h.app, empty(Method::GET, "/dashboard/stats", Some(alice))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!({"subscribersCount": 0, "totalViews": 0, "videoCount": 0, "likesCount": 0})
    );

    let (_, body) = send(&h.app, empty(Method::GET, "/dashboard/videos", Some(alice))).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn malformed_json_gets_the_error_envelope() {
    let h = harness();
    let alice = testing::user(&h.store, "alice");
    let request = request(Method::POST, "/tweets", Some(alice))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["statusCode"], 400);
}

#[tokio::test]
async fn tweets_are_scoped_to_the_path_user() {
    let h = harness();
    let alice = testing::user(&h.store, "alice");
    let bob = testing::user(&h.store, "bob");
    h.store.create_tweet(alice, "from alice").unwrap();

    let (_, body) = send(
        &h.app,
        empty(Method::GET, &format!("/tweets/user/{alice}"), Some(bob)),
    )
    .await;
    assert_eq!(body["data"][0]["content"], "from alice");

    let (_, body) = send(
        &h.app,
        empty(Method::GET, &format!("/tweets/user/{bob}"), Some(alice)),
    )
    .await;
    assert_eq!(body["data"], json!([]));
}
