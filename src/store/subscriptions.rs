use anyhow::{Context, Result};
use rusqlite::{Row, TransactionBehavior, params};
use serde::Serialize;

use super::{Id, Store, Toggle, exists, now};

/// Public identity fields joined onto subscription edges.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: Id,
    pub username: String,
    pub full_name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSubscribers {
    pub channel: Id,
    pub subscribers: Vec<UserSummary>,
    pub subscriber_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribedChannels {
    pub subscriber: Id,
    pub channels: Vec<UserSummary>,
    pub total_subscribed_channels: usize,
}

impl Store {
    /// Subscribes `subscriber` to `channel`, or unsubscribes if already
    /// subscribed. `None` when the channel does not exist. Callers reject
    /// self-subscription before getting here; the schema refuses it too.
    pub fn toggle_subscription(&self, channel: Id, subscriber: Id) -> Result<Option<Toggle>> {
        let ts = now();
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            if !exists(&tx, "users", channel)? {
                return Ok(None);
            }
            let removed = tx
                .execute(
                    "DELETE FROM subscriptions WHERE channel = ?1 AND subscriber = ?2",
                    params![channel, subscriber],
                )
                .context("removing subscription")?;
            let toggle = if removed > 0 {
                Toggle::Removed
            } else {
                tx.execute(
                    r#"
                    INSERT INTO subscriptions (subscriber, channel, created_at)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT(subscriber, channel) DO NOTHING
                    "#,
                    params![subscriber, channel, ts],
                )
                .context("adding subscription")?;
                Toggle::Added
            };
            tx.commit()?;
            Ok(Some(toggle))
        })
    }

    /// Everyone subscribed to `channel`, in subscription order.
    pub fn channel_subscribers(&self, channel: Id) -> Result<ChannelSubscribers> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT u.id, u.username, u.full_name, u.avatar
                FROM subscriptions s
                JOIN users u ON u.id = s.subscriber
                WHERE s.channel = ?1
                ORDER BY s.id ASC
                "#,
            )?;
            let subscribers = stmt
                .query_map([channel], row_to_summary)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("listing channel subscribers")?;
            Ok(ChannelSubscribers {
                channel,
                subscriber_count: subscribers.len(),
                subscribers,
            })
        })
    }

    /// Every channel `subscriber` follows, in subscription order.
    pub fn subscribed_channels(&self, subscriber: Id) -> Result<SubscribedChannels> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT u.id, u.username, u.full_name, u.avatar
                FROM subscriptions s
                JOIN users u ON u.id = s.channel
                WHERE s.subscriber = ?1
                ORDER BY s.id ASC
                "#,
            )?;
            let channels = stmt
                .query_map([subscriber], row_to_summary)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("listing subscribed channels")?;
            Ok(SubscribedChannels {
                subscriber,
                total_subscribed_channels: channels.len(),
                channels,
            })
        })
    }
}

fn row_to_summary(row: &Row<'_>) -> rusqlite::Result<UserSummary> {
    Ok(UserSummary {
        id: row.get("id")?,
        username: row.get("username")?,
        full_name: row.get("full_name")?,
        avatar: row.get("avatar")?,
    })
}
