//! trawl polls registered RSS feeds on a fixed interval, one feed per tick in
//! least-recently-fetched order, and stores newly discovered items as posts
//! in SQLite.

pub mod commands;
pub mod config;
pub mod feed;
pub mod ingest;
pub mod scheduler;
pub mod storage;
pub mod util;
