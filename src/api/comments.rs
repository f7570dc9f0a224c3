use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{
    AppState,
    extract::{AuthUser, PageParams, json_body, parse_id, query_params, required},
    response::{ApiError, ApiResponse, ApiResult, settle},
};
use crate::store::Comment;

#[derive(Debug, Deserialize)]
pub(super) struct AddCommentBody {
    comment: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UpdateCommentBody {
    new_comment: Option<String>,
}

pub(super) async fn video_comments(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<ApiResponse<Vec<Comment>>> {
    let video = parse_id(&video_id, "video")?;
    let req = query_params(params)?.page_request()?;
    let comments = state
        .db(move |store| store.video_comments(video, req))
        .await?;
    Ok(ApiResponse::ok(comments, "All comments fetched successfully"))
}

/// Mounted both under the video and as `POST /comments/{videoId}`.
pub(super) async fn add_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<String>,
    body: Result<Json<AddCommentBody>, JsonRejection>,
) -> ApiResult<ApiResponse<Comment>> {
    let video = parse_id(&video_id, "video")?;
    let content = required(json_body(body)?.comment, "Invalid Comment")?;
    let comment = state
        .db(move |store| store.add_comment(video, user.id, &content))
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;
    Ok(ApiResponse::ok(comment, "Comment Added Successfully"))
}

pub(super) async fn update_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(comment_id): Path<String>,
    body: Result<Json<UpdateCommentBody>, JsonRejection>,
) -> ApiResult<ApiResponse<Comment>> {
    let id = parse_id(&comment_id, "comment")?;
    let content = required(json_body(body)?.new_comment, "New Comment is required")?;
    let outcome = state
        .db(move |store| store.update_comment(id, user.id, &content))
        .await?;
    Ok(ApiResponse::ok(
        settle(outcome, "Comment")?,
        "Comment Updated Successfully",
    ))
}

pub(super) async fn delete_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(comment_id): Path<String>,
) -> ApiResult<ApiResponse<Value>> {
    let id = parse_id(&comment_id, "comment")?;
    let outcome = state
        .db(move |store| store.delete_comment(id, user.id))
        .await?;
    settle(outcome, "Comment")?;
    Ok(ApiResponse::ok(json!({}), "Comment Deleted Successfully"))
}
