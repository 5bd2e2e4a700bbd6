//! SQLite persistence.
//!
//! One [`Database`] handle wraps the connection pool; entity operations live
//! in their own files as `impl Database` blocks.

mod feeds;
mod follows;
mod posts;
mod schema;
mod types;
mod users;

pub use schema::Database;
pub use types::{DatabaseError, Feed, FeedFollow, FeedListing, NewPost, Post, User};
