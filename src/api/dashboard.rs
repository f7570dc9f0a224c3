//! Views for the signed-in channel owner.

use axum::extract::State;

use super::{
    AppState,
    extract::AuthUser,
    response::{ApiResponse, ApiResult},
};
use crate::store::{ChannelStats, Video};

pub(super) async fn channel_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<ApiResponse<ChannelStats>> {
    let stats = state.db(move |store| store.channel_stats(user.id)).await?;
    Ok(ApiResponse::ok(stats, "Channel stats fetched successfully"))
}

pub(super) async fn channel_videos(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<ApiResponse<Vec<Video>>> {
    let videos = state.db(move |store| store.videos_by_owner(user.id)).await?;
    Ok(ApiResponse::ok(videos, "All Videos Fetched Successfully"))
}
