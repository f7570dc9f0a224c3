//! HTTP surface: shared state, routing and the per-entity handlers.

use std::{path::PathBuf, sync::Arc};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
};
use tokio::task;
use tower_http::trace::TraceLayer;

use crate::{
    media::{MediaUploader, UploadedMedia},
    store::Store,
};

mod comments;
mod dashboard;
pub mod extract;
mod likes;
mod playlists;
pub mod response;
mod subscriptions;
mod tweets;
pub mod upload;
mod users;
mod videos;

#[cfg(test)]
mod tests;

use response::{ApiError, ApiResponse, ApiResult};
use upload::StagedFile;

pub const API_PREFIX: &str = "/api/v1";

#[derive(Clone)]
pub struct AppState {
    store: Store,
    media: Arc<dyn MediaUploader>,
    upload_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(store: Store, media: Arc<dyn MediaUploader>, upload_dir: PathBuf) -> Self {
        Self {
            store,
            media,
            upload_dir: Arc::new(upload_dir),
        }
    }

    /// Runs a store call on the blocking pool.
    pub(crate) async fn db<F, T>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&Store) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        task::spawn_blocking(move || f(&store))
            .await
            .map_err(|err| ApiError::operation(format!("task join error: {err}")))?
            .map_err(ApiError::from)
    }

    /// Forwards a staged file to the media host; the staged copy is removed
    /// once the upload finishes either way.
    pub(crate) async fn upload(&self, file: StagedFile) -> ApiResult<UploadedMedia> {
        let media = self.media.clone();
        task::spawn_blocking(move || media.upload(file.path(), file.file_name.as_deref()))
            .await
            .map_err(|err| ApiError::operation(format!("task join error: {err}")))?
            .map_err(|err| ApiError::operation(format!("uploading media: {err:#}")))
    }

    pub(crate) fn upload_dir(&self) -> &std::path::Path {
        &self.upload_dir
    }
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let api = Router::new()
        .route("/healthcheck", get(healthcheck))
        .route("/users", post(users::create_user))
        .route("/users/{userId}", get(users::get_user))
        .route(
            "/users/{userId}/subscriptions",
            get(subscriptions::subscribed_channels),
        )
        .route(
            "/videos",
            get(videos::list_videos).post(videos::publish_video),
        )
        .route(
            "/videos/{videoId}",
            get(videos::get_video)
                .patch(videos::update_video)
                .delete(videos::delete_video),
        )
        .route(
            "/videos/{videoId}/toggle-publish",
            patch(videos::toggle_publish),
        )
        .route(
            "/videos/{videoId}/comments",
            get(comments::video_comments).post(comments::add_comment),
        )
        .route(
            "/comments/{id}",
            post(comments::add_comment)
                .patch(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .route("/tweets", post(tweets::create_tweet))
        .route("/tweets/user/{userId}", get(tweets::user_tweets))
        .route(
            "/tweets/{tweetId}",
            patch(tweets::update_tweet).delete(tweets::delete_tweet),
        )
        .route("/likes/toggle/video/{videoId}", post(likes::toggle_video_like))
        .route(
            "/likes/toggle/comment/{commentId}",
            post(likes::toggle_comment_like),
        )
        .route("/likes/toggle/tweet/{tweetId}", post(likes::toggle_tweet_like))
        .route("/likes/videos", get(likes::liked_videos))
        .route(
            "/subscriptions/{channelId}",
            post(subscriptions::toggle_subscription),
        )
        .route(
            "/subscriptions/{channelId}/subscribers",
            get(subscriptions::channel_subscribers),
        )
        .route("/playlists", post(playlists::create_playlist))
        .route("/playlists/user/{userId}", get(playlists::user_playlists))
        .route(
            "/playlists/{playlistId}",
            get(playlists::get_playlist)
                .patch(playlists::update_playlist)
                .delete(playlists::delete_playlist),
        )
        .route(
            "/playlists/add/{videoId}/{playlistId}",
            patch(playlists::add_video),
        )
        .route(
            "/playlists/remove/{videoId}/{playlistId}",
            patch(playlists::remove_video),
        )
        .route("/dashboard/stats", get(dashboard::channel_stats))
        .route("/dashboard/videos", get(dashboard::channel_videos));

    Router::new()
        .nest(API_PREFIX, api)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthcheck() -> ApiResponse<&'static str> {
    ApiResponse::ok("OK", "Health check passed")
}
