use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Storage errors with the duplicate cases split out, since callers treat
/// them as expected conditions rather than failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Insert hit the UNIQUE(feed_id, url) constraint: the post already exists.
    #[error("post already exists for this feed and URL")]
    DuplicatePost,

    /// A feed with this URL is already subscribed.
    #[error("feed URL is already subscribed")]
    DuplicateFeed,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl StoreError {
    /// Classify a sqlx error, mapping SQLite uniqueness violations to the
    /// given duplicate variant.
    ///
    /// SQLite reports these as SQLITE_CONSTRAINT with a message of the form
    /// "UNIQUE constraint failed: posts.feed_id, posts.url".
    pub(crate) fn from_sqlx(err: sqlx::Error, on_unique: StoreError) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.message().contains("UNIQUE constraint failed") {
                return on_unique;
            }
        }
        StoreError::Other(err)
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A subscribed feed row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Feed {
    pub id: i64,
    pub name: String,
    pub url: String,
    /// Opaque owner reference; user management lives outside this crate.
    pub user: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    /// Unix seconds of the last scheduler pick. NULL until first fetch.
    pub last_fetched_at: Option<i64>,
}

/// A persisted, deduplicated feed entry.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub feed_id: i64,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Fields for a post about to be inserted, produced by the ingestion pipeline.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub url: String,
    /// Cleaned plain-text description; `None` when cleanup left nothing.
    pub description: Option<String>,
    /// Unix seconds; `None` when no date format matched.
    pub published_at: Option<i64>,
}
