use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;

use super::{Id, Outcome, Store, exists, now, ownership};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    #[serde(rename = "_id")]
    pub id: Id,
    pub name: String,
    pub description: String,
    /// Video ids in playlist order; the same video may appear more than once.
    pub videos: Vec<Id>,
    pub owner: Id,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    pub fn create_playlist(&self, owner: Id, name: &str, description: &str) -> Result<Playlist> {
        let ts = now();
        self.with_conn(|conn| {
            conn.query_row(
                r#"
                INSERT INTO playlists (name, description, owner, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?4)
                RETURNING *
                "#,
                params![name, description, owner, ts],
                row_to_playlist,
            )
            .context("inserting playlist")
        })
    }

    pub fn get_playlist(&self, id: Id) -> Result<Option<Playlist>> {
        self.with_conn(|conn| load_playlist(conn, id))
    }

    pub fn user_playlists(&self, owner: Id) -> Result<Vec<Playlist>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT * FROM playlists WHERE owner = ?1 ORDER BY id ASC")?;
            let mut playlists = stmt
                .query_map([owner], row_to_playlist)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("listing playlists")?;
            for playlist in &mut playlists {
                playlist.videos = playlist_videos(conn, playlist.id)?;
            }
            Ok(playlists)
        })
    }

    pub fn update_playlist(
        &self,
        id: Id,
        caller: Id,
        name: &str,
        description: &str,
    ) -> Result<Outcome<Playlist>> {
        let ts = now();
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            if let Some(denied) = ownership(&tx, "playlists", id, caller)?.denied() {
                return Ok(denied);
            }
            tx.execute(
                "UPDATE playlists SET name = ?2, description = ?3, updated_at = ?4 WHERE id = ?1",
                params![id, name, description, ts],
            )
            .context("updating playlist")?;
            let playlist = load_playlist(&tx, id)?;
            tx.commit()?;
            Ok(playlist.map_or(Outcome::NotFound, Outcome::Done))
        })
    }

    pub fn delete_playlist(&self, id: Id, caller: Id) -> Result<Outcome<()>> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            if let Some(denied) = ownership(&tx, "playlists", id, caller)?.denied() {
                return Ok(denied);
            }
            tx.execute("DELETE FROM playlists WHERE id = ?1", [id])
                .context("deleting playlist")?;
            tx.commit()?;
            Ok(Outcome::Done(()))
        })
    }

    /// Appends `video` in a single statement; positions are allocated by the
    /// database so concurrent appends cannot overwrite each other.
    /// `NotFound` covers both an unknown playlist and an unknown video.
    pub fn add_video_to_playlist(
        &self,
        playlist: Id,
        video: Id,
        caller: Id,
    ) -> Result<Outcome<Playlist>> {
        let ts = now();
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            if let Some(denied) = ownership(&tx, "playlists", playlist, caller)?.denied() {
                return Ok(denied);
            }
            if !exists(&tx, "videos", video)? {
                return Ok(Outcome::NotFound);
            }
            tx.execute(
                r#"
                INSERT INTO playlist_videos (playlist_id, position, video_id)
                SELECT ?1, COALESCE(MAX(position), -1) + 1, ?2
                FROM playlist_videos
                WHERE playlist_id = ?1
                "#,
                params![playlist, video],
            )
            .context("appending playlist entry")?;
            touch(&tx, playlist, ts)?;
            let updated = load_playlist(&tx, playlist)?;
            tx.commit()?;
            Ok(updated.map_or(Outcome::NotFound, Outcome::Done))
        })
    }

    /// Drops every occurrence of `video`. Removing a video that is not in the
    /// playlist leaves it unchanged.
    pub fn remove_video_from_playlist(
        &self,
        playlist: Id,
        video: Id,
        caller: Id,
    ) -> Result<Outcome<Playlist>> {
        let ts = now();
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            if let Some(denied) = ownership(&tx, "playlists", playlist, caller)?.denied() {
                return Ok(denied);
            }
            let removed = tx
                .execute(
                    "DELETE FROM playlist_videos WHERE playlist_id = ?1 AND video_id = ?2",
                    params![playlist, video],
                )
                .context("removing playlist entry")?;
            if removed > 0 {
                touch(&tx, playlist, ts)?;
            }
            let updated = load_playlist(&tx, playlist)?;
            tx.commit()?;
            Ok(updated.map_or(Outcome::NotFound, Outcome::Done))
        })
    }
}

fn touch(conn: &Connection, playlist: Id, ts: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "UPDATE playlists SET updated_at = ?2 WHERE id = ?1",
        params![playlist, ts],
    )?;
    Ok(())
}

fn load_playlist(conn: &Connection, id: Id) -> Result<Option<Playlist>> {
    let playlist = conn
        .query_row("SELECT * FROM playlists WHERE id = ?1", [id], row_to_playlist)
        .optional()
        .context("loading playlist")?;
    match playlist {
        Some(mut playlist) => {
            playlist.videos = playlist_videos(conn, id)?;
            Ok(Some(playlist))
        }
        None => Ok(None),
    }
}

fn playlist_videos(conn: &Connection, playlist: Id) -> Result<Vec<Id>> {
    let mut stmt = conn.prepare(
        "SELECT video_id FROM playlist_videos WHERE playlist_id = ?1 ORDER BY position ASC",
    )?;
    let videos = stmt
        .query_map([playlist], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<Id>>>()
        .context("loading playlist entries")?;
    Ok(videos)
}

/// Entries are filled in separately.
fn row_to_playlist(row: &Row<'_>) -> rusqlite::Result<Playlist> {
    Ok(Playlist {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        videos: Vec::new(),
        owner: row.get("owner")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
