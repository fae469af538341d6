use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Error as SqlxError;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

use crate::models::QueueMessage;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] SqlxError),
    #[error("invalid table name '{0}'")]
    InvalidTable(String),
}

/// Message row as written by the queue consumer
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MessageRow {
    pub message_id: String,
    pub room_id: String,
    pub user_id: String,
    pub username: String,
    pub message: String,
    pub message_type: String,
    pub timestamp: String,
}

impl From<MessageRow> for QueueMessage {
    fn from(row: MessageRow) -> Self {
        QueueMessage {
            message_id: row.message_id,
            room_id: row.room_id,
            user_id: row.user_id,
            username: row.username,
            message: row.message,
            message_type: row.message_type,
            timestamp: row.timestamp,
        }
    }
}

/// Per user and room participation counters maintained by the consumer
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ParticipationRow {
    pub user_id: String,
    pub room_id: String,
    pub message_count: Option<i64>,
    pub last_activity_time: Option<String>,
}

/// Read-only access to the persisted chat tables
pub struct ChatStore {
    pool: PgPool,
    messages_table: String,
    participation_table: String,
}

fn checked_table(name: &str) -> Result<String, StoreError> {
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(name.to_string())
    } else {
        Err(StoreError::InvalidTable(name.to_string()))
    }
}

const MESSAGE_COLUMNS: &str = r#"message_id, room_id, user_id, username, message, message_type, "timestamp""#;

impl ChatStore {
    /// Create a new database connection pool
    pub async fn connect(
        database_url: &str,
        messages_table: &str,
        participation_table: &str,
    ) -> Result<Self, StoreError> {
        let messages_table = checked_table(messages_table)?;
        let participation_table = checked_table(participation_table)?;

        info!("Connecting to database...");
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await
            .map_err(|e| {
                error!("Failed to connect to database: {}", e);
                e
            })?;
        info!("Database connection pool created successfully");

        Ok(Self { pool, messages_table, participation_table })
    }

    /// Messages of one room with `start <= timestamp <= end`
    pub async fn room_messages(&self, room_id: &str, start: &str, end: &str) -> Result<Vec<MessageRow>, StoreError> {
        let sql = format!(
            r#"SELECT {} FROM {} WHERE room_id = $1 AND "timestamp" BETWEEN $2 AND $3"#,
            MESSAGE_COLUMNS, self.messages_table
        );
        Ok(sqlx::query_as::<_, MessageRow>(&sql)
            .bind(room_id)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Messages of one user, optionally limited to a time range
    pub async fn user_messages(
        &self,
        user_id: &str,
        range: Option<(&str, &str)>,
    ) -> Result<Vec<MessageRow>, StoreError> {
        let rows = match range {
            Some((start, end)) => {
                let sql = format!(
                    r#"SELECT {} FROM {} WHERE user_id = $1 AND "timestamp" BETWEEN $2 AND $3 ORDER BY "timestamp""#,
                    MESSAGE_COLUMNS, self.messages_table
                );
                sqlx::query_as::<_, MessageRow>(&sql)
                    .bind(user_id)
                    .bind(start)
                    .bind(end)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    r#"SELECT {} FROM {} WHERE user_id = $1 ORDER BY "timestamp""#,
                    MESSAGE_COLUMNS, self.messages_table
                );
                sqlx::query_as::<_, MessageRow>(&sql)
                    .bind(user_id)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows)
    }

    /// Author of every message in the time range, one entry per message
    pub async fn user_ids_between(&self, start: &str, end: &str) -> Result<Vec<String>, StoreError> {
        let sql = format!(
            r#"SELECT user_id FROM {} WHERE "timestamp" BETWEEN $1 AND $2"#,
            self.messages_table
        );
        Ok(sqlx::query_scalar::<_, String>(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn timestamps_between(&self, start: &str, end: &str) -> Result<Vec<String>, StoreError> {
        let sql = format!(
            r#"SELECT "timestamp" FROM {} WHERE "timestamp" BETWEEN $1 AND $2"#,
            self.messages_table
        );
        Ok(sqlx::query_scalar::<_, String>(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?)
    }

    /// `(user_id, username)` of every stored message
    pub async fn message_authors(&self) -> Result<Vec<(String, String)>, StoreError> {
        let sql = format!("SELECT user_id, username FROM {}", self.messages_table);
        Ok(sqlx::query_as::<_, (String, String)>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Room of every stored message
    pub async fn message_rooms(&self) -> Result<Vec<String>, StoreError> {
        let sql = format!("SELECT room_id FROM {}", self.messages_table);
        Ok(sqlx::query_scalar::<_, String>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn user_participation(&self, user_id: &str) -> Result<Vec<ParticipationRow>, StoreError> {
        let sql = format!(
            "SELECT user_id, room_id, message_count, last_activity_time FROM {} WHERE user_id = $1",
            self.participation_table
        );
        Ok(sqlx::query_as::<_, ParticipationRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn all_participation(&self) -> Result<Vec<ParticipationRow>, StoreError> {
        let sql = format!(
            "SELECT user_id, room_id, message_count, last_activity_time FROM {}",
            self.participation_table
        );
        Ok(sqlx::query_as::<_, ParticipationRow>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }
}
