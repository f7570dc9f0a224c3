//! Input parsing shared by the handlers. Every rejection ends up as a
//! `Validation` error so clients always get the envelope.

use axum::{
    Json,
    extract::{
        FromRequestParts, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::request::Parts,
};
use serde::Deserialize;

use super::{
    AppState,
    response::{ApiError, ApiResult},
};
use crate::store::{Id, PageRequest};

/// Header carrying the caller's user id, set by the authentication gateway in
/// front of this service.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Id,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> ApiResult<Self> {
        let id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<Id>().ok())
            .ok_or_else(ApiError::unauthorized)?;
        if !state.db(move |store| store.user_exists(id)).await? {
            return Err(ApiError::unauthorized());
        }
        Ok(AuthUser { id })
    }
}

/// Parses a path identifier; `what` names it in the error message.
pub fn parse_id(raw: &str, what: &str) -> ApiResult<Id> {
    raw.trim()
        .parse::<Id>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::validation(format!("Invalid {what} id")))
}

pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}

pub fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> ApiResult<T> {
    query
        .map(|Query(value)| value)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}

/// A non-blank string field, trimmed.
pub fn required(value: Option<String>, message: &str) -> ApiResult<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::validation(message))
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageParams {
    pub fn page_request(&self) -> ApiResult<PageRequest> {
        let page = match self.page.as_deref().map(str::trim) {
            None | Some("") => 1,
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|page| *page >= 1)
                .ok_or_else(|| ApiError::validation("page must be a positive integer"))?,
        };
        let limit = match self.limit.as_deref().map(str::trim) {
            None | Some("") => PageRequest::DEFAULT_LIMIT,
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|limit| (1..=PageRequest::MAX_LIMIT).contains(limit))
                .ok_or_else(|| {
                    ApiError::validation(format!(
                        "limit must be between 1 and {}",
                        PageRequest::MAX_LIMIT
                    ))
                })?,
        };
        Ok(PageRequest { page, limit })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: Option<&str>, limit: Option<&str>) -> PageParams {
        PageParams {
            page: page.map(str::to_string),
            limit: limit.map(str::to_string),
        }
    }

    #[test]
    fn page_defaults() {
        assert_eq!(
            params(None, None).page_request().unwrap(),
            PageRequest { page: 1, limit: 10 }
        );
    }

    #[test]
    fn page_bounds_are_checked() {
        assert!(params(Some("0"), None).page_request().is_err());
        assert!(params(Some("abc"), None).page_request().is_err());
        assert!(params(None, Some("0")).page_request().is_err());
        assert!(params(None, Some("101")).page_request().is_err());
        assert_eq!(
            params(Some("3"), Some("25")).page_request().unwrap(),
            PageRequest { page: 3, limit: 25 }
        );
    }

    #[test]
    fn ids_must_be_positive_integers() {
        assert_eq!(parse_id("17", "video").unwrap(), 17);
        assert!(parse_id("-1", "video").is_err());
        assert!(parse_id("abc", "video").is_err());
        assert_eq!(
            parse_id("", "comment").unwrap_err().to_string(),
            "Invalid comment id"
        );
    }

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required(Some("  hi ".into()), "x").unwrap(), "hi");
        assert!(required(Some("   ".into()), "x").is_err());
        assert!(required(None, "x").is_err());
    }
}
