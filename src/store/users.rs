use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use serde::Serialize;

use super::{Id, Store, now};

/// Profile row. Credentials live with the upstream auth service, not here.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
}

impl Store {
    /// Returns `None` when the username is already taken.
    pub fn create_user(&self, user: &NewUser) -> Result<Option<User>> {
        let ts = now();
        self.with_conn(|conn| {
            conn.query_row(
                r#"
                INSERT INTO users (
                    username, email, full_name, avatar, cover_image, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                ON CONFLICT(username) DO NOTHING
                RETURNING *
                "#,
                params![
                    user.username,
                    user.email,
                    user.full_name,
                    user.avatar,
                    user.cover_image,
                    ts,
                ],
                row_to_user,
            )
            .optional()
            .context("inserting user")
        })
    }

    pub fn get_user(&self, id: Id) -> Result<Option<User>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT * FROM users WHERE id = ?1", [id], row_to_user)
                .optional()
                .context("loading user")
        })
    }

    pub fn user_exists(&self, id: Id) -> Result<bool> {
        self.with_conn(|conn| super::exists(conn, "users", id))
    }
}

pub(crate) fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        email: row.get("email")?,
        full_name: row.get("full_name")?,
        avatar: row.get("avatar")?,
        cover_image: row.get("cover_image")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
