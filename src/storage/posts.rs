use super::schema::Database;
use super::types::{NewPost, Post, StoreError};

impl Database {
    // ========================================================================
    // Post Operations
    // ========================================================================

    /// Insert a post produced by the ingestion pipeline. Returns the new
    /// post's id.
    ///
    /// This is a plain INSERT, not an upsert: a post is created exactly once
    /// per (feed, URL) pair and its content is never re-synced on later
    /// fetches of the same URL.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicatePost`] on a UNIQUE(feed_id, url)
    /// violation. Callers treat that as "already present" and skip silently.
    pub async fn insert_post(&self, feed_id: i64, post: &NewPost) -> Result<i64, StoreError> {
        let now = chrono::Utc::now().timestamp();
        let result: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO posts (feed_id, title, url, description, published_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id
        "#,
        )
        .bind(feed_id)
        .bind(&post.title)
        .bind(&post.url)
        .bind(&post.description)
        .bind(post.published_at)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx(e, StoreError::DuplicatePost))?;

        Ok(result.0)
    }

    /// Recent posts across all feeds, newest published first. Posts without
    /// a parseable publish date sort last, by insertion recency.
    pub async fn recent_posts(&self, limit: i64) -> Result<Vec<Post>, StoreError> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, feed_id, title, url, description, published_at, created_at, updated_at
            FROM posts
            ORDER BY published_at DESC, created_at DESC
            LIMIT ?
        "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    /// All posts for one feed, in insertion order (matches the order items
    /// appeared in the source document).
    pub async fn posts_for_feed(&self, feed_id: i64) -> Result<Vec<Post>, StoreError> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, feed_id, title, url, description, published_at, created_at, updated_at
            FROM posts
            WHERE feed_id = ?
            ORDER BY id
        "#,
        )
        .bind(feed_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }
}
