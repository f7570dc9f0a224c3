use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Row, params};
use serde::Serialize;

use super::{Id, Outcome, PageRequest, Store, exists, now, ownership};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: Id,
    pub content: String,
    pub video: Id,
    pub owner: Id,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    /// Oldest first. An unknown video simply has no comments.
    pub fn video_comments(&self, video: Id, req: PageRequest) -> Result<Vec<Comment>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT * FROM comments
                WHERE video = ?1
                ORDER BY id ASC
                LIMIT ?2 OFFSET ?3
                "#,
            )?;
            let comments = stmt
                .query_map(
                    params![video, i64::from(req.limit), req.offset()],
                    row_to_comment,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("listing comments")?;
            Ok(comments)
        })
    }

    /// Returns `None` when the video does not exist.
    pub fn add_comment(&self, video: Id, owner: Id, content: &str) -> Result<Option<Comment>> {
        let ts = now();
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            if !exists(&tx, "videos", video)? {
                return Ok(None);
            }
            let comment = tx
                .query_row(
                    r#"
                    INSERT INTO comments (content, video, owner, created_at, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?4)
                    RETURNING *
                    "#,
                    params![content, video, owner, ts],
                    row_to_comment,
                )
                .context("inserting comment")?;
            tx.commit()?;
            Ok(Some(comment))
        })
    }

    pub fn update_comment(&self, id: Id, caller: Id, content: &str) -> Result<Outcome<Comment>> {
        let ts = now();
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            if let Some(denied) = ownership(&tx, "comments", id, caller)?.denied() {
                return Ok(denied);
            }
            let comment = tx
                .query_row(
                    "UPDATE comments SET content = ?2, updated_at = ?3 WHERE id = ?1 RETURNING *",
                    params![id, content, ts],
                    row_to_comment,
                )
                .context("updating comment")?;
            tx.commit()?;
            Ok(Outcome::Done(comment))
        })
    }

    pub fn delete_comment(&self, id: Id, caller: Id) -> Result<Outcome<()>> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            if let Some(denied) = ownership(&tx, "comments", id, caller)?.denied() {
                return Ok(denied);
            }
            tx.execute("DELETE FROM comments WHERE id = ?1", [id])
                .context("deleting comment")?;
            tx.commit()?;
            Ok(Outcome::Done(()))
        })
    }
}

fn row_to_comment(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get("id")?,
        content: row.get("content")?,
        video: row.get("video")?,
        owner: row.get("owner")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
