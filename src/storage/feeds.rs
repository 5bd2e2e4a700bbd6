use super::schema::Database;
use super::types::{DatabaseError, Feed, FeedListing};

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Register a feed owned by `user_id`. Fails with a UNIQUE violation if
    /// the URL is already registered.
    pub async fn create_feed(
        &self,
        name: &str,
        url: &str,
        user_id: i64,
    ) -> Result<Feed, DatabaseError> {
        let now = chrono::Utc::now().timestamp();
        let feed = sqlx::query_as::<_, Feed>(
            "INSERT INTO feeds (name, url, user_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             RETURNING id, name, url, user_id, last_fetched_at, created_at, updated_at",
        )
        .bind(name)
        .bind(url)
        .bind(user_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(feed)
    }

    /// Look up a feed by its source URL.
    pub async fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>, DatabaseError> {
        let feed = sqlx::query_as::<_, Feed>(
            "SELECT id, name, url, user_id, last_fetched_at, created_at, updated_at
             FROM feeds WHERE url = ?1",
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(feed)
    }

    /// All feeds with their owners' names, sorted by feed name.
    pub async fn list_feeds_with_owners(&self) -> Result<Vec<FeedListing>, DatabaseError> {
        let listings = sqlx::query_as::<_, FeedListing>(
            "SELECT f.name AS name, f.url AS url, u.name AS owner
             FROM feeds f
             JOIN users u ON u.id = f.user_id
             ORDER BY f.name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(listings)
    }

    /// Atomically claim the next feed due for polling and stamp it fetched.
    ///
    /// Due order is oldest `last_fetched_at` first, with never-fetched (NULL)
    /// ahead of everything and ties broken by ascending id. Selection and
    /// stamp are one statement, so concurrent pollers cannot claim the same
    /// feed for the same pass. Returns `None` when no feeds are registered;
    /// the returned row carries the new `last_fetched_at`.
    pub async fn claim_due_feed(&self, now: i64) -> Result<Option<Feed>, DatabaseError> {
        let feed = sqlx::query_as::<_, Feed>(
            "UPDATE feeds
             SET last_fetched_at = ?1, updated_at = ?1
             WHERE id = (
                 SELECT id FROM feeds
                 ORDER BY last_fetched_at ASC NULLS FIRST, id ASC
                 LIMIT 1
             )
             RETURNING id, name, url, user_id, last_fetched_at, created_at, updated_at",
        )
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(feed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    async fn seed_user(db: &Database, name: &str) -> i64 {
        db.create_user(name).await.unwrap().id
    }

    #[tokio::test]
    async fn test_create_and_get_feed() {
        let db = test_db().await;
        let user_id = seed_user(&db, "alice").await;

        let feed = db
            .create_feed("Blog", "https://example.com/feed.xml", user_id)
            .await
            .unwrap();
        assert_eq!(feed.name, "Blog");
        assert_eq!(feed.last_fetched_at, None);

        let found = db
            .get_feed_by_url("https://example.com/feed.xml")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, feed.id);

        assert!(db
            .get_feed_by_url("https://other.example/rss")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_url_is_unique_violation() {
        let db = test_db().await;
        let user_id = seed_user(&db, "alice").await;
        db.create_feed("One", "https://example.com/feed.xml", user_id)
            .await
            .unwrap();

        let err = db
            .create_feed("Two", "https://example.com/feed.xml", user_id)
            .await
            .unwrap_err();
        assert!(err.is_unique_violation(), "got: {:?}", err);
    }

    #[tokio::test]
    async fn test_list_feeds_with_owners() {
        let db = test_db().await;
        let alice = seed_user(&db, "alice").await;
        let bob = seed_user(&db, "bob").await;
        db.create_feed("Zebra News", "https://zebra.example/rss", alice)
            .await
            .unwrap();
        db.create_feed("Ant Weekly", "https://ant.example/rss", bob)
            .await
            .unwrap();

        let listings = db.list_feeds_with_owners().await.unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].name, "Ant Weekly");
        assert_eq!(listings[0].owner, "bob");
        assert_eq!(listings[1].name, "Zebra News");
        assert_eq!(listings[1].owner, "alice");
    }

    #[tokio::test]
    async fn test_claim_with_no_feeds_is_none() {
        let db = test_db().await;
        assert!(db.claim_due_feed(100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_claim_rotates_least_recently_fetched() {
        let db = test_db().await;
        let user_id = seed_user(&db, "alice").await;
        let f1 = db
            .create_feed("One", "https://one.example/rss", user_id)
            .await
            .unwrap();
        let f2 = db
            .create_feed("Two", "https://two.example/rss", user_id)
            .await
            .unwrap();
        let f3 = db
            .create_feed("Three", "https://three.example/rss", user_id)
            .await
            .unwrap();

        // Never-fetched feeds go first, in id order
        let first = db.claim_due_feed(100).await.unwrap().unwrap();
        assert_eq!(first.id, f1.id);
        assert_eq!(first.last_fetched_at, Some(100));

        let second = db.claim_due_feed(200).await.unwrap().unwrap();
        assert_eq!(second.id, f2.id);

        let third = db.claim_due_feed(300).await.unwrap().unwrap();
        assert_eq!(third.id, f3.id);

        // Everyone fetched once; rotation wraps to the oldest stamp
        let fourth = db.claim_due_feed(400).await.unwrap().unwrap();
        assert_eq!(fourth.id, f1.id);
        assert_eq!(fourth.last_fetched_at, Some(400));
    }

    #[tokio::test]
    async fn test_never_fetched_beats_any_timestamp() {
        let db = test_db().await;
        let user_id = seed_user(&db, "alice").await;
        let f1 = db
            .create_feed("One", "https://one.example/rss", user_id)
            .await
            .unwrap();
        db.claim_due_feed(100).await.unwrap();

        // Registered after f1 was stamped, still jumps the queue
        let f2 = db
            .create_feed("Two", "https://two.example/rss", user_id)
            .await
            .unwrap();

        let next = db.claim_due_feed(200).await.unwrap().unwrap();
        assert_eq!(next.id, f2.id);

        let after = db.claim_due_feed(300).await.unwrap().unwrap();
        assert_eq!(after.id, f1.id);
    }
}
