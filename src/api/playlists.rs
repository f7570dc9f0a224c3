use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{
    AppState,
    extract::{AuthUser, json_body, parse_id, required},
    response::{ApiError, ApiResponse, ApiResult, settle},
};
use crate::store::{Outcome, Playlist};

#[derive(Debug, Deserialize)]
pub(super) struct PlaylistBody {
    name: Option<String>,
    description: Option<String>,
}

impl PlaylistBody {
    fn validate(self) -> ApiResult<(String, String)> {
        let name = required(self.name, "Playlist name is required")?;
        let description = required(self.description, "Playlist description is required")?;
        Ok((name, description))
    }
}

pub(super) async fn create_playlist(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<PlaylistBody>, JsonRejection>,
) -> ApiResult<ApiResponse<Playlist>> {
    let (name, description) = json_body(body)?.validate()?;
    let playlist = state
        .db(move |store| store.create_playlist(user.id, &name, &description))
        .await?;
    Ok(ApiResponse::ok(playlist, "Playlist created successfully"))
}

pub(super) async fn user_playlists(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<ApiResponse<Vec<Playlist>>> {
    let owner = parse_id(&user_id, "user")?;
    let playlists = state.db(move |store| store.user_playlists(owner)).await?;
    Ok(ApiResponse::ok(playlists, "Playlists fetched successfully"))
}

pub(super) async fn get_playlist(
    State(state): State<AppState>,
    Path(playlist_id): Path<String>,
) -> ApiResult<ApiResponse<Playlist>> {
    let id = parse_id(&playlist_id, "playlist")?;
    let playlist = state
        .db(move |store| store.get_playlist(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Playlist not found"))?;
    Ok(ApiResponse::ok(playlist, "Playlist fetched successfully"))
}

pub(super) async fn update_playlist(
    State(state): State<AppState>,
    user: AuthUser,
    Path(playlist_id): Path<String>,
    body: Result<Json<PlaylistBody>, JsonRejection>,
) -> ApiResult<ApiResponse<Playlist>> {
    let id = parse_id(&playlist_id, "playlist")?;
    let (name, description) = json_body(body)?.validate()?;
    let outcome = state
        .db(move |store| store.update_playlist(id, user.id, &name, &description))
        .await?;
    Ok(ApiResponse::ok(
        settle(outcome, "Playlist")?,
        "Playlist updated successfully",
    ))
}

pub(super) async fn delete_playlist(
    State(state): State<AppState>,
    user: AuthUser,
    Path(playlist_id): Path<String>,
) -> ApiResult<ApiResponse<Value>> {
    let id = parse_id(&playlist_id, "playlist")?;
    let outcome = state
        .db(move |store| store.delete_playlist(id, user.id))
        .await?;
    settle(outcome, "Playlist")?;
    Ok(ApiResponse::ok(json!({}), "Playlist deleted successfully"))
}

pub(super) async fn add_video(
    State(state): State<AppState>,
    user: AuthUser,
    Path((video_id, playlist_id)): Path<(String, String)>,
) -> ApiResult<ApiResponse<Playlist>> {
    let video = parse_id(&video_id, "video")?;
    let playlist = parse_id(&playlist_id, "playlist")?;
    let outcome = state
        .db(move |store| store.add_video_to_playlist(playlist, video, user.id))
        .await?;
    if matches!(outcome, Outcome::NotFound) {
        return Err(ApiError::not_found("Playlist or video not found"));
    }
    Ok(ApiResponse::ok(
        settle(outcome, "Playlist")?,
        "Video added successfully",
    ))
}

pub(super) async fn remove_video(
    State(state): State<AppState>,
    user: AuthUser,
    Path((video_id, playlist_id)): Path<(String, String)>,
) -> ApiResult<ApiResponse<Playlist>> {
    let video = parse_id(&video_id, "video")?;
    let playlist = parse_id(&playlist_id, "playlist")?;
    let outcome = state
        .db(move |store| store.remove_video_from_playlist(playlist, video, user.id))
        .await?;
    Ok(ApiResponse::ok(
        settle(outcome, "Playlist")?,
        "Video removed from playlist successfully",
    ))
}
