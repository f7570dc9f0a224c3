//! Per-channel figures computed at query time.

use anyhow::{Context, Result};
use serde::Serialize;

use super::{Id, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStats {
    pub subscribers_count: i64,
    pub total_views: i64,
    pub video_count: i64,
    /// Likes on the channel's videos; comment and tweet likes are not counted.
    pub likes_count: i64,
}

impl Store {
    pub fn channel_stats(&self, channel: Id) -> Result<ChannelStats> {
        self.with_conn(|conn| {
            conn.query_row(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM subscriptions WHERE channel = ?1) AS subscribers_count,
                    (SELECT COALESCE(SUM(views), 0) FROM videos WHERE owner = ?1) AS total_views,
                    (SELECT COUNT(*) FROM videos WHERE owner = ?1) AS video_count,
                    (SELECT COUNT(*)
                       FROM likes l
                       JOIN videos v ON v.id = l.target_id
                      WHERE l.target_kind = 'video' AND v.owner = ?1) AS likes_count
                "#,
                [channel],
                |row| {
                    Ok(ChannelStats {
                        subscribers_count: row.get("subscribers_count")?,
                        total_views: row.get("total_views")?,
                        video_count: row.get("video_count")?,
                        likes_count: row.get("likes_count")?,
                    })
                },
            )
            .context("computing channel stats")
        })
    }
}
