use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another instance of the application has locked the database
    #[error("Another instance of trawl appears to be running. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5), SQLITE_LOCKED (6), SQLITE_CANTOPEN (14)
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return DatabaseError::InstanceLocked;
        }

        DatabaseError::Other(err)
    }

    /// True when the underlying error is a UNIQUE constraint violation.
    ///
    /// Lets callers turn duplicate registrations into clean messages instead
    /// of surfacing raw SQLite errors.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DatabaseError::Other(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A registered account. The "current" user lives in configuration, not here.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A registered feed with its polling metadata.
///
/// `last_fetched_at` is NULL until the first poll and only ever moves forward;
/// the ingestion pipeline stamps it when it claims the feed, before the
/// network fetch.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Feed {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub user_id: i64,
    pub last_fetched_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One ingested item. Unique per (feed_id, link); never updated after insert.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub feed_id: i64,
    pub title: Option<String>,
    pub link: String,
    pub description: Option<String>,
    pub published_at: Option<i64>,
    pub created_at: i64,
}

/// A (user, feed) subscription.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedFollow {
    pub id: i64,
    pub user_id: i64,
    pub feed_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Insert parameters for one post, already normalized by the pipeline.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: Option<String>,
    pub link: String,
    pub description: Option<String>,
    pub published_at: Option<i64>,
}

/// Row for the feed listing: feed plus its owner's name.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedListing {
    pub name: String,
    pub url: String,
    pub owner: String,
}
