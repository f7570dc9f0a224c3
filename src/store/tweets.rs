use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Row, params};
use serde::Serialize;

use super::{Id, Outcome, Store, now, ownership};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tweet {
    #[serde(rename = "_id")]
    pub id: Id,
    pub content: String,
    pub owner: Id,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    pub fn create_tweet(&self, owner: Id, content: &str) -> Result<Tweet> {
        let ts = now();
        self.with_conn(|conn| {
            conn.query_row(
                r#"
                INSERT INTO tweets (content, owner, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?3)
                RETURNING *
                "#,
                params![content, owner, ts],
                row_to_tweet,
            )
            .context("inserting tweet")
        })
    }

    /// Newest first.
    pub fn user_tweets(&self, owner: Id) -> Result<Vec<Tweet>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT * FROM tweets WHERE owner = ?1 ORDER BY id DESC")?;
            let tweets = stmt
                .query_map([owner], row_to_tweet)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("listing tweets")?;
            Ok(tweets)
        })
    }

    pub fn update_tweet(&self, id: Id, caller: Id, content: &str) -> Result<Outcome<Tweet>> {
        let ts = now();
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            if let Some(denied) = ownership(&tx, "tweets", id, caller)?.denied() {
                return Ok(denied);
            }
            let tweet = tx
                .query_row(
                    "UPDATE tweets SET content = ?2, updated_at = ?3 WHERE id = ?1 RETURNING *",
                    params![id, content, ts],
                    row_to_tweet,
                )
                .context("updating tweet")?;
            tx.commit()?;
            Ok(Outcome::Done(tweet))
        })
    }

    pub fn delete_tweet(&self, id: Id, caller: Id) -> Result<Outcome<()>> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            if let Some(denied) = ownership(&tx, "tweets", id, caller)?.denied() {
                return Ok(denied);
            }
            tx.execute("DELETE FROM tweets WHERE id = ?1", [id])
                .context("deleting tweet")?;
            tx.commit()?;
            Ok(Outcome::Done(()))
        })
    }
}

fn row_to_tweet(row: &Row<'_>) -> rusqlite::Result<Tweet> {
    Ok(Tweet {
        id: row.get("id")?,
        content: row.get("content")?,
        owner: row.get("owner")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
