use super::schema::Database;
use super::types::{DatabaseError, NewPost, Post};

impl Database {
    // ========================================================================
    // Post Operations
    // ========================================================================

    /// Insert one post for a feed.
    ///
    /// Idempotent on (feed_id, link): re-inserting an already-seen item is a
    /// no-op, not an error. Returns true when a row was actually written.
    pub async fn insert_post(&self, feed_id: i64, post: &NewPost) -> Result<bool, DatabaseError> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            "INSERT INTO posts (feed_id, title, link, description, published_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(feed_id, link) DO NOTHING",
        )
        .bind(feed_id)
        .bind(&post.title)
        .bind(&post.link)
        .bind(&post.description)
        .bind(post.published_at)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All posts for one feed, in insertion order.
    pub async fn posts_for_feed(&self, feed_id: i64) -> Result<Vec<Post>, DatabaseError> {
        let posts = sqlx::query_as::<_, Post>(
            "SELECT id, feed_id, title, link, description, published_at, created_at
             FROM posts WHERE feed_id = ?1 ORDER BY id",
        )
        .bind(feed_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    /// Newest posts from the feeds a user follows.
    ///
    /// Ordered by publication time descending; posts without one sort last
    /// (SQLite puts NULLs last in DESC order).
    pub async fn posts_for_user(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<Post>, DatabaseError> {
        let posts = sqlx::query_as::<_, Post>(
            "SELECT p.id, p.feed_id, p.title, p.link, p.description, p.published_at, p.created_at
             FROM posts p
             JOIN feed_follows ff ON ff.feed_id = p.feed_id
             WHERE ff.user_id = ?1
             ORDER BY p.published_at DESC, p.id DESC
             LIMIT ?2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }
}
