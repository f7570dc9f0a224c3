use std::fmt;

use anyhow::{Context, Result};
use rusqlite::{TransactionBehavior, params};
use serde::Serialize;

use super::{Id, Store, Toggle, Video, exists, now, videos::row_to_video};

/// The kinds of content a like can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeKind {
    Video,
    Comment,
    Tweet,
}

impl LikeKind {
    fn as_str(self) -> &'static str {
        match self {
            LikeKind::Video => "video",
            LikeKind::Comment => "comment",
            LikeKind::Tweet => "tweet",
        }
    }

    fn table(self) -> &'static str {
        match self {
            LikeKind::Video => "videos",
            LikeKind::Comment => "comments",
            LikeKind::Tweet => "tweets",
        }
    }
}

impl fmt::Display for LikeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exactly one liked item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeTarget {
    pub kind: LikeKind,
    pub id: Id,
}

impl LikeTarget {
    pub fn video(id: Id) -> Self {
        Self {
            kind: LikeKind::Video,
            id,
        }
    }

    pub fn comment(id: Id) -> Self {
        Self {
            kind: LikeKind::Comment,
            id,
        }
    }

    pub fn tweet(id: Id) -> Self {
        Self {
            kind: LikeKind::Tweet,
            id,
        }
    }
}

impl Store {
    /// Removes the caller's like on `target` if there is one, adds it
    /// otherwise. `None` when the target does not exist.
    ///
    /// Runs in an immediate transaction and the insert is guarded by the
    /// `(target_kind, target_id, liked_by)` unique key, so concurrent toggles
    /// never leave duplicate rows behind.
    pub fn toggle_like(&self, target: LikeTarget, user: Id) -> Result<Option<Toggle>> {
        let ts = now();
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            if !exists(&tx, target.kind.table(), target.id)? {
                return Ok(None);
            }
            let removed = tx
                .execute(
                    "DELETE FROM likes WHERE target_kind = ?1 AND target_id = ?2 AND liked_by = ?3",
                    params![target.kind.as_str(), target.id, user],
                )
                .context("removing like")?;
            let toggle = if removed > 0 {
                Toggle::Removed
            } else {
                tx.execute(
                    r#"
                    INSERT INTO likes (target_kind, target_id, liked_by, created_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(target_kind, target_id, liked_by) DO NOTHING
                    "#,
                    params![target.kind.as_str(), target.id, user, ts],
                )
                .context("adding like")?;
                Toggle::Added
            };
            tx.commit()?;
            Ok(Some(toggle))
        })
    }

    #[cfg(test)]
    pub(crate) fn has_liked(&self, target: LikeTarget, user: Id) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM likes WHERE target_kind = ?1 AND target_id = ?2 AND liked_by = ?3",
                params![target.kind.as_str(), target.id, user],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    /// Published videos liked by `user`, in the order they were liked.
    pub fn liked_videos(&self, user: Id) -> Result<Vec<Video>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT v.*
                FROM likes l
                JOIN videos v ON v.id = l.target_id
                WHERE l.target_kind = 'video'
                  AND l.liked_by = ?1
                  AND v.is_published = 1
                ORDER BY l.id ASC
                "#,
            )?;
            let videos = stmt
                .query_map([user], row_to_video)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("listing liked videos")?;
            Ok(videos)
        })
    }
}
