//! SQLite persistence for every entity the API exposes.
//!
//! A single connection is shared behind a mutex; callers are expected to run
//! store methods on the blocking pool. Each entity lives in its own submodule
//! with its record type, its queries and their tests.

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, functions::FunctionFlags};
use serde::Serialize;

pub mod comments;
pub mod likes;
pub mod playlists;
pub mod stats;
pub mod subscriptions;
pub mod tweets;
pub mod users;
pub mod videos;

pub use comments::Comment;
pub use likes::{LikeKind, LikeTarget};
pub use playlists::Playlist;
pub use stats::ChannelStats;
pub use subscriptions::{ChannelSubscribers, SubscribedChannels, UserSummary};
pub use tweets::Tweet;
pub use users::{NewUser, User};
pub use videos::{NewVideo, Video, VideoEdit, VideoFilter, VideoSort, VideoSortKey};

pub type Id = i64;

/// Result of a write against an owned entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Done(T),
    NotFound,
    Forbidden,
}

/// Which way a toggle went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Added,
    Removed,
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// One page of results plus the bookkeeping clients use to navigate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub docs: Vec<T>,
    pub total_docs: u64,
    pub limit: u32,
    pub page: u32,
    pub total_pages: u64,
    pub paging_counter: u64,
    pub has_prev_page: bool,
    pub has_next_page: bool,
    pub prev_page: Option<u32>,
    pub next_page: Option<u32>,
}

impl<T> Page<T> {
    pub fn new(docs: Vec<T>, total_docs: u64, req: PageRequest) -> Self {
        let limit = u64::from(req.limit.max(1));
        let total_pages = total_docs.div_ceil(limit).max(1);
        let page = u64::from(req.page);
        Self {
            docs,
            total_docs,
            limit: req.limit,
            page: req.page,
            total_pages,
            paging_counter: page.saturating_sub(1) * limit + 1,
            has_prev_page: page > 1,
            has_next_page: page < total_pages,
            prev_page: (page > 1).then(|| req.page - 1),
            next_page: (page < total_pages).then(|| req.page + 1),
        }
    }
}

/// Cloneable handle to the database.
#[derive(Debug, Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Opens (and if necessary creates) the database file and ensures the
    /// schema exists. WAL mode keeps readers from blocking the writer.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating database directory {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("opening database {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("enabling WAL mode")?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .context("setting synchronous mode")?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("opening in-memory database")?;
        Self::init(conn)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")
            .context("enabling foreign keys")?;
        register_functions(&conn)?;
        ensure_tables(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock();
        f(&mut conn)
    }
}

/// SQLite's own `lower()` only folds ASCII; `fold_case` lowercases the full
/// Unicode range the same way Rust does.
fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|text| text.to_lowercase()))
        },
    )
    .context("registering fold_case")?;
    Ok(())
}

/// Creates every table if missing, inside one transaction so a failure leaves
/// the database untouched.
fn ensure_tables(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL,
            full_name TEXT NOT NULL,
            avatar TEXT,
            cover_image TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS videos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            video_file TEXT NOT NULL,
            thumbnail TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            duration REAL NOT NULL DEFAULT 0,
            views INTEGER NOT NULL DEFAULT 0,
            is_published INTEGER NOT NULL DEFAULT 1,
            owner INTEGER NOT NULL REFERENCES users(id),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content TEXT NOT NULL,
            video INTEGER NOT NULL,
            owner INTEGER NOT NULL REFERENCES users(id),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tweets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content TEXT NOT NULL,
            owner INTEGER NOT NULL REFERENCES users(id),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS likes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            target_kind TEXT NOT NULL CHECK (target_kind IN ('video', 'comment', 'tweet')),
            target_id INTEGER NOT NULL,
            liked_by INTEGER NOT NULL REFERENCES users(id),
            created_at TEXT NOT NULL,
            UNIQUE (target_kind, target_id, liked_by)
        );

        CREATE TABLE IF NOT EXISTS subscriptions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            subscriber INTEGER NOT NULL REFERENCES users(id),
            channel INTEGER NOT NULL REFERENCES users(id),
            created_at TEXT NOT NULL,
            UNIQUE (subscriber, channel),
            CHECK (subscriber <> channel)
        );

        CREATE TABLE IF NOT EXISTS playlists (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            owner INTEGER NOT NULL REFERENCES users(id),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS playlist_videos (
            playlist_id INTEGER NOT NULL REFERENCES playlists(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            video_id INTEGER NOT NULL,
            PRIMARY KEY (playlist_id, position)
        );

        CREATE INDEX IF NOT EXISTS idx_videos_owner ON videos(owner);
        CREATE INDEX IF NOT EXISTS idx_comments_video ON comments(video);
        CREATE INDEX IF NOT EXISTS idx_tweets_owner ON tweets(owner);
        CREATE INDEX IF NOT EXISTS idx_likes_liked_by ON likes(liked_by);
        CREATE INDEX IF NOT EXISTS idx_subscriptions_channel ON subscriptions(channel);
        CREATE INDEX IF NOT EXISTS idx_playlists_owner ON playlists(owner);
        "#,
    )?;

    tx.commit()?;
    Ok(())
}

/// Relationship between a caller and an owned row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ownership {
    Owner,
    Other,
    Missing,
}

impl Ownership {
    /// `None` when the caller may proceed.
    fn denied<T>(self) -> Option<Outcome<T>> {
        match self {
            Ownership::Owner => None,
            Ownership::Other => Some(Outcome::Forbidden),
            Ownership::Missing => Some(Outcome::NotFound),
        }
    }
}

/// `table` is always one of this module's literal table names.
fn ownership(conn: &Connection, table: &str, id: Id, caller: Id) -> Result<Ownership> {
    let owner: Option<Id> = conn
        .query_row(
            &format!("SELECT owner FROM {table} WHERE id = ?1"),
            [id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(match owner {
        None => Ownership::Missing,
        Some(owner) if owner == caller => Ownership::Owner,
        Some(_) => Ownership::Other,
    })
}

fn exists(conn: &Connection, table: &str, id: Id) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(&format!("SELECT 1 FROM {table} WHERE id = ?1"), [id], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(found.is_some())
}

fn now() -> DateTime<Utc> {
    Utc::now()
}
