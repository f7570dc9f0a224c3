use axum::extract::{
    Multipart, Path, Query, State, multipart::MultipartRejection, rejection::QueryRejection,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{
    AppState,
    extract::{AuthUser, PageParams, parse_id, query_params, required},
    response::{ApiError, ApiResponse, ApiResult, settle},
    upload::UploadForm,
};
use crate::store::{NewVideo, Page, Video, VideoEdit, VideoFilter, VideoSort, VideoSortKey};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ListVideosParams {
    page: Option<String>,
    limit: Option<String>,
    query: Option<String>,
    sort_by: Option<String>,
    sort_type: Option<String>,
    user_id: Option<String>,
}

impl ListVideosParams {
    fn filter(&self) -> ApiResult<VideoFilter> {
        let query = self
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_owned);
        let owner = match self.user_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_id(raw, "user")?),
        };
        let sort = match self.sort_by.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(field) => {
                let key = VideoSortKey::parse(field)
                    .ok_or_else(|| ApiError::validation(format!("Cannot sort by {field}")))?;
                Some(VideoSort {
                    key,
                    descending: self.sort_type.as_deref() == Some("desc"),
                })
            }
        };
        Ok(VideoFilter { query, owner, sort })
    }
}

pub(super) async fn list_videos(
    State(state): State<AppState>,
    params: Result<Query<ListVideosParams>, QueryRejection>,
) -> ApiResult<ApiResponse<Page<Video>>> {
    let params = query_params(params)?;
    let req = PageParams {
        page: params.page.clone(),
        limit: params.limit.clone(),
    }
    .page_request()?;
    let filter = params.filter()?;
    let page = state
        .db(move |store| store.list_videos(&filter, req))
        .await?;
    Ok(ApiResponse::ok(page, "Video Fetched Successfully"))
}

pub(super) async fn publish_video(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<ApiResponse<Video>> {
    let mut form = UploadForm::read(multipart, state.upload_dir()).await?;
    let title = required(form.take_text("title"), "Title is required")?;
    let description = required(form.take_text("description"), "Description is required")?;
    let video_file = form
        .take_file("videoFile")
        .ok_or_else(|| ApiError::validation("Video is required"))?;
    let thumbnail = form
        .take_file("thumbnail")
        .ok_or_else(|| ApiError::validation("Thumbnail is required"))?;

    let (uploaded_video, uploaded_thumbnail) =
        tokio::try_join!(state.upload(video_file), state.upload(thumbnail))?;

    let new_video = NewVideo {
        owner: user.id,
        title,
        description,
        video_file: uploaded_video.url,
        thumbnail: uploaded_thumbnail.url,
        duration: uploaded_video.duration.unwrap_or_default(),
    };
    let video = state
        .db(move |store| store.create_video(&new_video))
        .await?;
    tracing::info!(video = video.id, owner = video.owner, "video published");
    Ok(ApiResponse::ok(video, "Video Uploaded Successfully"))
}

/// Counts as a view.
pub(super) async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<ApiResponse<Video>> {
    let id = parse_id(&video_id, "video")?;
    let video = state
        .db(move |store| store.view_video(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;
    Ok(ApiResponse::ok(video, "Video fetched Successfully"))
}

pub(super) async fn update_video(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<ApiResponse<Video>> {
    let id = parse_id(&video_id, "video")?;
    let mut form = UploadForm::read(multipart, state.upload_dir()).await?;
    // `newTitle`/`newDescription` are accepted for older clients.
    let title = form.take_text("title").or_else(|| form.take_text("newTitle"));
    let title = required(title, "Invalid title")?;
    let description = form
        .take_text("description")
        .or_else(|| form.take_text("newDescription"));
    let description = required(description, "Invalid Description")?;

    // Refuse before spending an upload on someone else's video.
    let current = state
        .db(move |store| store.get_video(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;
    if current.owner != user.id {
        return Err(ApiError::forbidden("Video"));
    }

    let thumbnail = match form.take_file("thumbnail") {
        Some(file) => Some(state.upload(file).await?.url),
        None => None,
    };
    let edit = VideoEdit {
        title,
        description,
        thumbnail,
    };
    let outcome = state
        .db(move |store| store.update_video(id, user.id, &edit))
        .await?;
    Ok(ApiResponse::ok(
        settle(outcome, "Video")?,
        "Video Updated Successfully",
    ))
}

pub(super) async fn delete_video(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<String>,
) -> ApiResult<ApiResponse<Value>> {
    let id = parse_id(&video_id, "video")?;
    let outcome = state
        .db(move |store| store.delete_video(id, user.id))
        .await?;
    settle(outcome, "Video")?;
    Ok(ApiResponse::ok(json!({}), "Video Deleted Successfully"))
}

pub(super) async fn toggle_publish(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<String>,
) -> ApiResult<ApiResponse<Video>> {
    let id = parse_id(&video_id, "video")?;
    let outcome = state
        .db(move |store| store.toggle_publish(id, user.id))
        .await?;
    Ok(ApiResponse::ok(
        settle(outcome, "Video")?,
        "Video Status Updated Successfully",
    ))
}
