use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::Deserialize;

use super::{
    AppState,
    extract::{json_body, parse_id, required},
    response::{ApiError, ApiResponse, ApiResult},
};
use crate::store::{NewUser, User};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateUserBody {
    username: Option<String>,
    email: Option<String>,
    full_name: Option<String>,
    avatar: Option<String>,
    cover_image: Option<String>,
}

impl CreateUserBody {
    fn validate(self) -> ApiResult<NewUser> {
        let username = required(self.username, "Username is required")?.to_lowercase();
        if username.chars().any(char::is_whitespace) {
            return Err(ApiError::validation("Username cannot contain spaces"));
        }
        let email = required(self.email, "Email is required")?;
        if !email.contains('@') {
            return Err(ApiError::validation("Invalid email"));
        }
        let full_name = required(self.full_name, "Full name is required")?;
        let optional = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Ok(NewUser {
            username,
            email,
            full_name,
            avatar: optional(self.avatar),
            cover_image: optional(self.cover_image),
        })
    }
}

/// Registers the profile of an identity the auth gateway already knows.
pub(super) async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<CreateUserBody>, JsonRejection>,
) -> ApiResult<ApiResponse<User>> {
    let new_user = json_body(body)?.validate()?;
    let user = state
        .db(move |store| store.create_user(&new_user))
        .await?
        .ok_or_else(|| ApiError::validation("Username already taken"))?;
    tracing::info!(user = user.id, username = %user.username, "user registered");
    Ok(ApiResponse::ok(user, "User registered successfully"))
}

pub(super) async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<ApiResponse<User>> {
    let id = parse_id(&user_id, "user")?;
    let user = state
        .db(move |store| store.get_user(id))
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(ApiResponse::ok(user, "User fetched successfully"))
}
