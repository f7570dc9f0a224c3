use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{
    AppState,
    extract::{AuthUser, json_body, parse_id, required},
    response::{ApiResponse, ApiResult, settle},
};
use crate::store::Tweet;

#[derive(Debug, Deserialize)]
pub(super) struct CreateTweetBody {
    tweet: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UpdateTweetBody {
    updated_tweet: Option<String>,
}

pub(super) async fn create_tweet(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<CreateTweetBody>, JsonRejection>,
) -> ApiResult<ApiResponse<Tweet>> {
    let content = required(json_body(body)?.tweet, "Invalid Tweet")?;
    let tweet = state
        .db(move |store| store.create_tweet(user.id, &content))
        .await?;
    Ok(ApiResponse::ok(tweet, "Tweet created successfully"))
}

pub(super) async fn user_tweets(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<ApiResponse<Vec<Tweet>>> {
    let owner = parse_id(&user_id, "user")?;
    let tweets = state.db(move |store| store.user_tweets(owner)).await?;
    Ok(ApiResponse::ok(tweets, "Tweets Fetched Successfully"))
}

pub(super) async fn update_tweet(
    State(state): State<AppState>,
    user: AuthUser,
    Path(tweet_id): Path<String>,
    body: Result<Json<UpdateTweetBody>, JsonRejection>,
) -> ApiResult<ApiResponse<Tweet>> {
    let id = parse_id(&tweet_id, "tweet")?;
    let content = required(json_body(body)?.updated_tweet, "Tweet Content Invalid")?;
    let outcome = state
        .db(move |store| store.update_tweet(id, user.id, &content))
        .await?;
    Ok(ApiResponse::ok(
        settle(outcome, "Tweet")?,
        "Tweet Updated Successfully",
    ))
}

pub(super) async fn delete_tweet(
    State(state): State<AppState>,
    user: AuthUser,
    Path(tweet_id): Path<String>,
) -> ApiResult<ApiResponse<Value>> {
    let id = parse_id(&tweet_id, "tweet")?;
    let outcome = state
        .db(move |store| store.delete_tweet(id, user.id))
        .await?;
    settle(outcome, "Tweet")?;
    Ok(ApiResponse::ok(json!({}), "Tweet Deleted Successfully"))
}
