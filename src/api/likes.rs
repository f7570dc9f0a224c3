use axum::extract::{Path, State};
use serde::Serialize;

use super::{
    AppState,
    extract::{AuthUser, parse_id},
    response::{ApiError, ApiResponse, ApiResult},
};
use crate::store::{LikeKind, LikeTarget, Toggle, Video};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct LikeState {
    target: LikeTarget,
    is_liked: bool,
}

pub(super) async fn toggle_video_like(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<String>,
) -> ApiResult<ApiResponse<LikeState>> {
    let target = LikeTarget::video(parse_id(&video_id, "video")?);
    toggle(state, user, target).await
}

pub(super) async fn toggle_comment_like(
    State(state): State<AppState>,
    user: AuthUser,
    Path(comment_id): Path<String>,
) -> ApiResult<ApiResponse<LikeState>> {
    let target = LikeTarget::comment(parse_id(&comment_id, "comment")?);
    toggle(state, user, target).await
}

pub(super) async fn toggle_tweet_like(
    State(state): State<AppState>,
    user: AuthUser,
    Path(tweet_id): Path<String>,
) -> ApiResult<ApiResponse<LikeState>> {
    let target = LikeTarget::tweet(parse_id(&tweet_id, "tweet")?);
    toggle(state, user, target).await
}

async fn toggle(
    state: AppState,
    user: AuthUser,
    target: LikeTarget,
) -> ApiResult<ApiResponse<LikeState>> {
    let toggled = state
        .db(move |store| store.toggle_like(target, user.id))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{} not found", noun(target.kind))))?;
    tracing::debug!(kind = %target.kind, target = target.id, user = user.id, ?toggled, "like toggled");
    let (is_liked, message) = match (toggled, target.kind) {
        (Toggle::Added, LikeKind::Video) => (true, "Like Added"),
        (Toggle::Removed, LikeKind::Video) => (false, "Like Removed"),
        (Toggle::Added, LikeKind::Comment) => (true, "Like Added In Comment"),
        (Toggle::Removed, LikeKind::Comment) => (false, "Like removed from comment"),
        (Toggle::Added, LikeKind::Tweet) => (true, "Like Added In Tweet"),
        (Toggle::Removed, LikeKind::Tweet) => (false, "Like removed from tweet"),
    };
    Ok(ApiResponse::ok(LikeState { target, is_liked }, message))
}

fn noun(kind: LikeKind) -> &'static str {
    match kind {
        LikeKind::Video => "Video",
        LikeKind::Comment => "Comment",
        LikeKind::Tweet => "Tweet",
    }
}

pub(super) async fn liked_videos(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<ApiResponse<Vec<Video>>> {
    let videos = state.db(move |store| store.liked_videos(user.id)).await?;
    Ok(ApiResponse::ok(videos, "All liked Video fetched successfully"))
}
