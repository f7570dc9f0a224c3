use axum::extract::{Path, State};
use serde::Serialize;

use super::{
    AppState,
    extract::{AuthUser, parse_id},
    response::{ApiError, ApiResponse, ApiResult},
};
use crate::store::{ChannelSubscribers, Id, SubscribedChannels, Toggle};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SubscriptionState {
    channel: Id,
    is_subscribed: bool,
}

pub(super) async fn toggle_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    Path(channel_id): Path<String>,
) -> ApiResult<ApiResponse<SubscriptionState>> {
    let channel = parse_id(&channel_id, "channel")?;
    if channel == user.id {
        return Err(ApiError::validation("Cannot subscribe to your own channel"));
    }
    let toggled = state
        .db(move |store| store.toggle_subscription(channel, user.id))
        .await?
        .ok_or_else(|| ApiError::not_found("Channel not found"))?;
    let (is_subscribed, message) = match toggled {
        Toggle::Added => (true, "Subscription added"),
        Toggle::Removed => (false, "Subscription removed"),
    };
    Ok(ApiResponse::ok(
        SubscriptionState {
            channel,
            is_subscribed,
        },
        message,
    ))
}

pub(super) async fn channel_subscribers(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> ApiResult<ApiResponse<ChannelSubscribers>> {
    let channel = parse_id(&channel_id, "channel")?;
    let subscribers = state
        .db(move |store| store.channel_subscribers(channel))
        .await?;
    Ok(ApiResponse::ok(subscribers, "Successfully Fetched subscribers"))
}

pub(super) async fn subscribed_channels(
    State(state): State<AppState>,
    Path(subscriber_id): Path<String>,
) -> ApiResult<ApiResponse<SubscribedChannels>> {
    let subscriber = parse_id(&subscriber_id, "user")?;
    let channels = state
        .db(move |store| store.subscribed_channels(subscriber))
        .await?;
    Ok(ApiResponse::ok(channels, "Channels Fetched Successfully"))
}
