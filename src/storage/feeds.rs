use super::schema::Database;
use super::types::{Feed, StoreError};

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Subscribe a new feed. Returns the new feed's id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateFeed`] when the URL is already
    /// subscribed (feeds.url is globally unique).
    pub async fn insert_feed(
        &self,
        name: &str,
        url: &str,
        user: Option<&str>,
    ) -> Result<i64, StoreError> {
        let now = chrono::Utc::now().timestamp();
        let result: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO feeds (name, url, user, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
        "#,
        )
        .bind(name)
        .bind(url)
        .bind(user)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx(e, StoreError::DuplicateFeed))?;

        Ok(result.0)
    }

    /// Look up a feed by its source URL.
    pub async fn feed_by_url(&self, url: &str) -> Result<Option<Feed>, StoreError> {
        let feed = sqlx::query_as::<_, Feed>(
            r#"
            SELECT id, name, url, user, created_at, updated_at, last_fetched_at
            FROM feeds
            WHERE url = ?
        "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(feed)
    }

    /// List all subscribed feeds, alphabetically.
    pub async fn list_feeds(&self) -> Result<Vec<Feed>, StoreError> {
        let feeds = sqlx::query_as::<_, Feed>(
            r#"
            SELECT id, name, url, user, created_at, updated_at, last_fetched_at
            FROM feeds
            ORDER BY name
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(feeds)
    }

    /// Select the feed the scheduler should fetch next: the one with the
    /// oldest `last_fetched_at`, never-fetched feeds first.
    ///
    /// Returns `None` when no feeds are subscribed (the scheduler treats
    /// that tick as a no-op).
    pub async fn next_feed_to_fetch(&self) -> Result<Option<Feed>, StoreError> {
        let feed = sqlx::query_as::<_, Feed>(
            r#"
            SELECT id, name, url, user, created_at, updated_at, last_fetched_at
            FROM feeds
            ORDER BY last_fetched_at ASC NULLS FIRST
            LIMIT 1
        "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(feed)
    }

    /// Stamp `last_fetched_at` (and `updated_at`) with the current time.
    ///
    /// Called before the fetch is attempted, so a slow or failing feed does
    /// not keep winning the least-recently-fetched selection.
    pub async fn mark_feed_fetched(&self, feed_id: i64) -> Result<(), StoreError> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query("UPDATE feeds SET last_fetched_at = ?, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(now)
            .bind(feed_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Unsubscribe a feed. Posts cascade via the foreign key.
    pub async fn delete_feed(&self, feed_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM feeds WHERE id = ?")
            .bind(feed_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
