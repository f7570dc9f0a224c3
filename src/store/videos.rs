use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params, types::Value};
use serde::Serialize;

use super::{Id, Outcome, Page, PageRequest, Store, now, ownership};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(rename = "_id")]
    pub id: Id,
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    pub owner: Id,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVideo {
    pub owner: Id,
    pub title: String,
    pub description: String,
    pub video_file: String,
    pub thumbnail: String,
    pub duration: f64,
}

/// Fields replaced by an edit. `thumbnail` is kept when `None`.
#[derive(Debug, Clone)]
pub struct VideoEdit {
    pub title: String,
    pub description: String,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoSortKey {
    CreatedAt,
    UpdatedAt,
    Title,
    Views,
    Duration,
}

impl VideoSortKey {
    /// Maps the public field name onto a sort key.
    pub fn parse(field: &str) -> Option<Self> {
        match field {
            "createdAt" => Some(Self::CreatedAt),
            "updatedAt" => Some(Self::UpdatedAt),
            "title" => Some(Self::Title),
            "views" => Some(Self::Views),
            "duration" => Some(Self::Duration),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Title => "title",
            Self::Views => "views",
            Self::Duration => "duration",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoSort {
    pub key: VideoSortKey,
    pub descending: bool,
}

#[derive(Debug, Clone, Default)]
pub struct VideoFilter {
    /// Case-insensitive substring of the title.
    pub query: Option<String>,
    pub owner: Option<Id>,
    pub sort: Option<VideoSort>,
}

impl VideoFilter {
    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut conditions = Vec::new();
        let mut values = Vec::new();
        if let Some(query) = &self.query {
            values.push(Value::Text(query.to_lowercase()));
            conditions.push(format!("instr(fold_case(title), ?{}) > 0", values.len()));
        }
        if let Some(owner) = self.owner {
            values.push(Value::Integer(owner));
            conditions.push(format!("owner = ?{}", values.len()));
        }
        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        (clause, values)
    }

    fn order_clause(&self) -> String {
        match self.sort {
            Some(sort) => format!(
                "ORDER BY {} {}, id ASC",
                sort.key.column(),
                if sort.descending { "DESC" } else { "ASC" }
            ),
            None => "ORDER BY id ASC".to_string(),
        }
    }
}

impl Store {
    pub fn create_video(&self, video: &NewVideo) -> Result<Video> {
        let ts = now();
        self.with_conn(|conn| {
            conn.query_row(
                r#"
                INSERT INTO videos (
                    video_file, thumbnail, title, description, duration,
                    owner, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                RETURNING *
                "#,
                params![
                    video.video_file,
                    video.thumbnail,
                    video.title,
                    video.description,
                    video.duration,
                    video.owner,
                    ts,
                ],
                row_to_video,
            )
            .context("inserting video")
        })
    }

    pub fn get_video(&self, id: Id) -> Result<Option<Video>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT * FROM videos WHERE id = ?1", [id], row_to_video)
                .optional()
                .context("loading video")
        })
    }

    /// Fetches a video and counts the view in the same statement.
    pub fn view_video(&self, id: Id) -> Result<Option<Video>> {
        self.with_conn(|conn| {
            conn.query_row(
                "UPDATE videos SET views = views + 1 WHERE id = ?1 RETURNING *",
                [id],
                row_to_video,
            )
            .optional()
            .context("recording video view")
        })
    }

    pub fn list_videos(&self, filter: &VideoFilter, req: PageRequest) -> Result<Page<Video>> {
        let (where_clause, mut values) = filter.where_clause();
        let order = filter.order_clause();
        self.with_conn(|conn| {
            let total: i64 = conn
                .query_row(
                    &format!("SELECT COUNT(*) FROM videos {where_clause}"),
                    rusqlite::params_from_iter(values.iter()),
                    |row| row.get(0),
                )
                .context("counting videos")?;

            values.push(Value::Integer(i64::from(req.limit)));
            values.push(Value::Integer(req.offset()));
            let sql = format!(
                "SELECT * FROM videos {where_clause} {order} LIMIT ?{} OFFSET ?{}",
                values.len() - 1,
                values.len()
            );
            let mut stmt = conn.prepare(&sql)?;
            let docs = stmt
                .query_map(rusqlite::params_from_iter(values.iter()), row_to_video)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("listing videos")?;
            Ok(Page::new(docs, total as u64, req))
        })
    }

    /// Every video of `owner`, published or not, newest first.
    pub fn videos_by_owner(&self, owner: Id) -> Result<Vec<Video>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM videos WHERE owner = ?1 ORDER BY created_at DESC, id DESC",
            )?;
            let videos = stmt
                .query_map([owner], row_to_video)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("listing channel videos")?;
            Ok(videos)
        })
    }

    pub fn update_video(&self, id: Id, caller: Id, edit: &VideoEdit) -> Result<Outcome<Video>> {
        let ts = now();
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            if let Some(denied) = ownership(&tx, "videos", id, caller)?.denied() {
                return Ok(denied);
            }
            let video = tx
                .query_row(
                    r#"
                    UPDATE videos
                    SET title = ?2,
                        description = ?3,
                        thumbnail = COALESCE(?4, thumbnail),
                        updated_at = ?5
                    WHERE id = ?1
                    RETURNING *
                    "#,
                    params![id, edit.title, edit.description, edit.thumbnail, ts],
                    row_to_video,
                )
                .context("updating video")?;
            tx.commit()?;
            Ok(Outcome::Done(video))
        })
    }

    pub fn toggle_publish(&self, id: Id, caller: Id) -> Result<Outcome<Video>> {
        let ts = now();
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            if let Some(denied) = ownership(&tx, "videos", id, caller)?.denied() {
                return Ok(denied);
            }
            let video = tx
                .query_row(
                    r#"
                    UPDATE videos
                    SET is_published = NOT is_published, updated_at = ?2
                    WHERE id = ?1
                    RETURNING *
                    "#,
                    params![id, ts],
                    row_to_video,
                )
                .context("toggling publish status")?;
            tx.commit()?;
            Ok(Outcome::Done(video))
        })
    }

    pub fn delete_video(&self, id: Id, caller: Id) -> Result<Outcome<()>> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            if let Some(denied) = ownership(&tx, "videos", id, caller)?.denied() {
                return Ok(denied);
            }
            tx.execute("DELETE FROM videos WHERE id = ?1", [id])
                .context("deleting video")?;
            tx.commit()?;
            Ok(Outcome::Done(()))
        })
    }
}

pub(crate) fn row_to_video(row: &Row<'_>) -> rusqlite::Result<Video> {
    Ok(Video {
        id: row.get("id")?,
        video_file: row.get("video_file")?,
        thumbnail: row.get("thumbnail")?,
        title: row.get("title")?,
        description: row.get("description")?,
        duration: row.get("duration")?,
        views: row.get("views")?,
        is_published: row.get("is_published")?,
        owner: row.get("owner")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
