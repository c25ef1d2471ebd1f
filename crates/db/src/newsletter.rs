//! Newsletter subscriber repository.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use zolar_core::{Email, SubscriberId};

use super::RepositoryError;

/// A newsletter subscriber. Unsubscribed rows are kept so a later signup
/// counts as a resubscribe.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub email: Email,
    pub source: Option<String>,
    pub subscribed_at: DateTime<Utc>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

/// What a signup did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscribeOutcome {
    Subscribed,
    AlreadySubscribed,
    Resubscribed,
}

/// Repository for newsletter database operations.
pub struct NewsletterRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NewsletterRepository<'a> {
    /// Create a new newsletter repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Subscribe an email. Idempotent: signing up twice is not an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self, email))]
    pub async fn subscribe(
        &self,
        email: &Email,
        source: Option<&str>,
    ) -> Result<SubscribeOutcome, RepositoryError> {
        // xmax = 0 only for freshly inserted rows.
        let (inserted, was_unsubscribed): (bool, bool) = sqlx::query_as(
            r"
            WITH previous AS (
                SELECT unsubscribed_at IS NOT NULL AS was_unsubscribed
                FROM newsletter_subscriber WHERE email = $1
            )
            INSERT INTO newsletter_subscriber (email, source)
            VALUES ($1, $2)
            ON CONFLICT (email) DO UPDATE SET
                unsubscribed_at = NULL,
                subscribed_at = CASE
                    WHEN newsletter_subscriber.unsubscribed_at IS NULL
                    THEN newsletter_subscriber.subscribed_at
                    ELSE NOW()
                END
            RETURNING (xmax = 0) AS inserted,
                      COALESCE((SELECT was_unsubscribed FROM previous), FALSE) AS was_unsubscribed
            ",
        )
        .bind(email)
        .bind(source)
        .fetch_one(self.pool)
        .await?;

        Ok(match (inserted, was_unsubscribed) {
            (true, _) => SubscribeOutcome::Subscribed,
            (false, true) => SubscribeOutcome::Resubscribed,
            (false, false) => SubscribeOutcome::AlreadySubscribed,
        })
    }

    /// List subscribers, newest first. Returns the page and the total count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        active_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Subscriber>, i64), RepositoryError> {
        let subscribers = sqlx::query_as::<_, Subscriber>(
            r"
            SELECT id, email, source, subscribed_at, unsubscribed_at
            FROM newsletter_subscriber
            WHERE (NOT $1 OR unsubscribed_at IS NULL)
            ORDER BY subscribed_at DESC, id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(active_only)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM newsletter_subscriber WHERE (NOT $1 OR unsubscribed_at IS NULL)",
        )
        .bind(active_only)
        .fetch_one(self.pool)
        .await?;

        Ok((subscribers, total))
    }

    /// Mark a subscriber as unsubscribed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no active subscriber has this ID.
    pub async fn unsubscribe(&self, id: SubscriberId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE newsletter_subscriber SET unsubscribed_at = NOW() \
             WHERE id = $1 AND unsubscribed_at IS NULL",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
