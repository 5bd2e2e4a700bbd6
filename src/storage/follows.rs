use super::schema::Database;
use super::types::{DatabaseError, FeedFollow};

impl Database {
    // ========================================================================
    // Follow Operations
    // ========================================================================

    /// Subscribe a user to a feed. Fails with a UNIQUE violation if the
    /// follow already exists.
    pub async fn create_follow(
        &self,
        user_id: i64,
        feed_id: i64,
    ) -> Result<FeedFollow, DatabaseError> {
        let now = chrono::Utc::now().timestamp();
        let follow = sqlx::query_as::<_, FeedFollow>(
            "INSERT INTO feed_follows (user_id, feed_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             RETURNING id, user_id, feed_id, created_at, updated_at",
        )
        .bind(user_id)
        .bind(feed_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(follow)
    }

    /// Remove a user's follow of a feed. Returns false if there was none.
    pub async fn delete_follow(&self, user_id: i64, feed_id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM feed_follows WHERE user_id = ?1 AND feed_id = ?2")
            .bind(user_id)
            .bind(feed_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Names of the feeds a user follows, sorted by feed name.
    pub async fn list_followed_feed_names(
        &self,
        user_id: i64,
    ) -> Result<Vec<String>, DatabaseError> {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT f.name
             FROM feed_follows ff
             JOIN feeds f ON f.id = ff.feed_id
             WHERE ff.user_id = ?1
             ORDER BY f.name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }
}
