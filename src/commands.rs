//! Command layer: argument definitions and one handler per subcommand.
//!
//! Commands load configuration, open the database, run one operation, and
//! print plain text to stdout. Diagnostics go through `tracing`. None of the
//! ingestion logic lives here.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::Path;
use std::time::Duration;

use crate::config::{self, Config};
use crate::feed::Fetcher;
use crate::scheduler;
use crate::storage::{Database, DatabaseError, User};
use crate::util::validate_url;

#[derive(Parser, Debug)]
#[command(name = "trawl", about = "Polls registered RSS feeds and collects their posts", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new user and log in as them
    Register {
        /// User name to create
        name: String,
    },

    /// Switch to an existing user
    Login {
        /// User name to log in as
        name: String,
    },

    /// List registered users
    Users,

    /// Delete all users, feeds, follows, and posts
    Reset,

    /// Register a feed owned by the current user and follow it
    #[command(name = "addfeed")]
    AddFeed {
        /// Display name for the feed
        name: String,
        /// Feed URL (http or https)
        url: String,
    },

    /// List all registered feeds with their owners
    Feeds,

    /// Follow an already-registered feed by URL
    Follow {
        /// URL of the feed to follow
        url: String,
    },

    /// Stop following a feed
    Unfollow {
        /// URL of the feed to unfollow
        url: String,
    },

    /// List the feeds the current user follows
    Following,

    /// Show the newest posts from feeds the current user follows
    Browse {
        /// Maximum number of posts to show
        #[arg(default_value_t = 2, value_parser = clap::value_parser!(i64).range(1..))]
        limit: i64,
    },

    /// Poll feeds continuously until Ctrl-C or SIGTERM
    Agg {
        /// Time between polls, e.g. "30s", "1m", "1h30m"
        #[arg(value_parser = parse_interval)]
        interval: Duration,
    },
}

/// Parse a duration string of number+unit segments, e.g. "30s", "1m",
/// "1h30m", "500ms". Zero durations are rejected.
pub fn parse_interval(raw: &str) -> Result<Duration, String> {
    let s = raw.trim();
    if s.is_empty() {
        return Err("empty duration".to_string());
    }

    let bytes = s.as_bytes();
    let mut i = 0;
    let mut total = Duration::ZERO;
    while i < bytes.len() {
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == start {
            return Err(format!("expected a number at {:?}", &s[i..]));
        }
        let value: u64 = s[start..i]
            .parse()
            .map_err(|_| format!("number out of range in {:?}", s))?;

        let unit_start = i;
        while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
            i += 1;
        }
        let seconds_per_unit = match &s[unit_start..i] {
            "ms" => None,
            "s" => Some(1),
            "m" => Some(60),
            "h" => Some(3600),
            "" => return Err("missing unit (use ms, s, m, or h)".to_string()),
            other => return Err(format!("unknown unit {:?} (use ms, s, m, or h)", other)),
        };
        let segment = match seconds_per_unit {
            Some(factor) => Duration::from_secs(
                value
                    .checked_mul(factor)
                    .ok_or_else(|| format!("duration overflows in {:?}", s))?,
            ),
            None => Duration::from_millis(value),
        };
        total = total
            .checked_add(segment)
            .ok_or_else(|| format!("duration overflows in {:?}", s))?;
    }

    if total.is_zero() {
        return Err("interval must be greater than zero".to_string());
    }
    Ok(total)
}

/// Render a duration in the same number+unit shape `parse_interval` accepts.
fn format_interval(d: Duration) -> String {
    let total = d.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    let millis = d.subsec_millis();

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    if seconds > 0 {
        out.push_str(&format!("{}s", seconds));
    }
    if millis > 0 {
        out.push_str(&format!("{}ms", millis));
    }
    if out.is_empty() {
        out.push_str("0s");
    }
    out
}

/// Dispatch a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let config_path = config::config_path()?;
    let mut cfg = Config::load(&config_path).context("Failed to load configuration")?;

    let db_path = cfg.database_path()?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of trawl appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    match cli.command {
        Command::Register { name } => register(&db, &mut cfg, &config_path, &name).await,
        Command::Login { name } => login(&db, &mut cfg, &config_path, &name).await,
        Command::Users => users(&db, &cfg).await,
        Command::Reset => reset(&db).await,
        Command::AddFeed { name, url } => add_feed(&db, &cfg, &name, &url).await,
        Command::Feeds => feeds(&db).await,
        Command::Follow { url } => follow(&db, &cfg, &url).await,
        Command::Unfollow { url } => unfollow(&db, &cfg, &url).await,
        Command::Following => following(&db, &cfg).await,
        Command::Browse { limit } => browse(&db, &cfg, limit).await,
        Command::Agg { interval } => agg(db, interval).await,
    }
}

/// Resolve the current user from configuration.
///
/// Fails when no user is set, and when the configured name no longer exists
/// in the database (e.g. after a reset).
async fn require_current_user(db: &Database, cfg: &Config) -> Result<User> {
    let name = cfg
        .current_user_name
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("Not logged in. Run `trawl login <name>` first."))?;
    db.get_user_by_name(name)
        .await
        .context("Failed to look up current user")?
        .with_context(|| format!("User '{}' no longer exists. Log in or register again.", name))
}

async fn register(db: &Database, cfg: &mut Config, config_path: &Path, name: &str) -> Result<()> {
    let user = match db.create_user(name).await {
        Ok(user) => user,
        Err(e) if e.is_unique_violation() => bail!("User '{}' already exists", name),
        Err(e) => return Err(e).context("Failed to create user"),
    };

    cfg.current_user_name = Some(user.name.clone());
    cfg.store(config_path).context("Failed to save configuration")?;
    println!("Registered user '{}' and logged in.", user.name);
    Ok(())
}

async fn login(db: &Database, cfg: &mut Config, config_path: &Path, name: &str) -> Result<()> {
    let user = db
        .get_user_by_name(name)
        .await
        .context("Failed to look up user")?
        .with_context(|| format!("User '{}' doesn't exist", name))?;

    cfg.current_user_name = Some(user.name.clone());
    cfg.store(config_path).context("Failed to save configuration")?;
    println!("Logged in as '{}'.", user.name);
    Ok(())
}

async fn users(db: &Database, cfg: &Config) -> Result<()> {
    let users = db.list_users().await.context("Failed to list users")?;
    if users.is_empty() {
        println!("No users registered.");
        return Ok(());
    }

    for user in users {
        if Some(user.name.as_str()) == cfg.current_user_name.as_deref() {
            println!("* {} (current)", user.name);
        } else {
            println!("* {}", user.name);
        }
    }
    Ok(())
}

async fn reset(db: &Database) -> Result<()> {
    let count = db
        .delete_all_users()
        .await
        .context("Failed to reset database")?;
    println!("Database reset ({} users deleted).", count);
    Ok(())
}

async fn add_feed(db: &Database, cfg: &Config, name: &str, url: &str) -> Result<()> {
    let user = require_current_user(db, cfg).await?;
    let parsed = validate_url(url)?;

    let feed = match db.create_feed(name, parsed.as_str(), user.id).await {
        Ok(feed) => feed,
        Err(e) if e.is_unique_violation() => {
            bail!("A feed with URL '{}' is already registered", parsed)
        }
        Err(e) => return Err(e).context("Failed to create feed"),
    };
    db.create_follow(user.id, feed.id)
        .await
        .context("Failed to follow new feed")?;

    println!("Added feed '{}' ({}), now following it.", feed.name, feed.url);
    Ok(())
}

async fn feeds(db: &Database) -> Result<()> {
    let listings = db
        .list_feeds_with_owners()
        .await
        .context("Failed to list feeds")?;
    if listings.is_empty() {
        println!("No feeds registered.");
        return Ok(());
    }

    for listing in listings {
        println!("* {} ({}) added by {}", listing.name, listing.url, listing.owner);
    }
    Ok(())
}

async fn follow(db: &Database, cfg: &Config, url: &str) -> Result<()> {
    let user = require_current_user(db, cfg).await?;
    let feed = db
        .get_feed_by_url(url)
        .await
        .context("Failed to look up feed")?
        .with_context(|| format!("No feed registered at '{}'. Use `trawl addfeed`.", url))?;

    match db.create_follow(user.id, feed.id).await {
        Ok(_) => {
            println!("'{}' is now following '{}'.", user.name, feed.name);
            Ok(())
        }
        Err(e) if e.is_unique_violation() => bail!("Already following '{}'", feed.name),
        Err(e) => Err(e).context("Failed to follow feed"),
    }
}

async fn unfollow(db: &Database, cfg: &Config, url: &str) -> Result<()> {
    let user = require_current_user(db, cfg).await?;
    let feed = db
        .get_feed_by_url(url)
        .await
        .context("Failed to look up feed")?
        .with_context(|| format!("No feed registered at '{}'", url))?;

    let removed = db
        .delete_follow(user.id, feed.id)
        .await
        .context("Failed to unfollow feed")?;
    if !removed {
        bail!("Not following '{}'", feed.name);
    }
    println!("Unfollowed '{}'.", feed.name);
    Ok(())
}

async fn following(db: &Database, cfg: &Config) -> Result<()> {
    let user = require_current_user(db, cfg).await?;
    let names = db
        .list_followed_feed_names(user.id)
        .await
        .context("Failed to list followed feeds")?;
    if names.is_empty() {
        println!("Not following any feeds.");
        return Ok(());
    }

    for name in names {
        println!("* {}", name);
    }
    Ok(())
}

async fn browse(db: &Database, cfg: &Config, limit: i64) -> Result<()> {
    let user = require_current_user(db, cfg).await?;
    let posts = db
        .posts_for_user(user.id, limit)
        .await
        .context("Failed to load posts")?;
    if posts.is_empty() {
        println!("No posts yet. Run `trawl agg <interval>` to start collecting.");
        return Ok(());
    }

    for post in posts {
        println!("{}", post.title.as_deref().unwrap_or("(untitled)"));
        println!("  {}", post.link);
        if let Some(ts) = post.published_at {
            if let Some(published) = chrono::DateTime::from_timestamp(ts, 0) {
                println!("  published {}", published.format("%Y-%m-%d %H:%M UTC"));
            }
        }
        if let Some(description) = &post.description {
            println!("  {}", description);
        }
        println!();
    }
    Ok(())
}

async fn agg(db: Database, interval: Duration) -> Result<()> {
    let fetcher = Fetcher::new().context("Failed to build HTTP client")?;

    println!("Collecting feeds every {}. Press Ctrl-C to stop.", format_interval(interval));
    let handle = scheduler::spawn(db, fetcher, interval);

    wait_for_shutdown_signal().await?;
    handle.shutdown().await;
    println!("Stopped.");
    Ok(())
}

/// Block until SIGTERM or SIGINT (Ctrl-C on non-Unix platforms).
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, shutting down gracefully");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, shutting down gracefully");
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        tracing::info!("Received Ctrl-C, shutting down gracefully");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interval_single_units() {
        assert_eq!(parse_interval("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_interval("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_interval("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_interval("500ms").unwrap(), Duration::from_millis(500));
    }

    #[test]
    fn test_parse_interval_compound() {
        assert_eq!(parse_interval("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_interval("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_interval("1s500ms").unwrap(), Duration::from_millis(1500));
    }

    #[test]
    fn test_parse_interval_trims_whitespace() {
        assert_eq!(parse_interval("  45s ").unwrap(), Duration::from_secs(45));
    }

    #[test]
    fn test_parse_interval_rejects_zero() {
        assert!(parse_interval("0s").is_err());
        assert!(parse_interval("0m0s").is_err());
    }

    #[test]
    fn test_parse_interval_rejects_garbage() {
        assert!(parse_interval("").is_err());
        assert!(parse_interval("ten seconds").is_err());
        assert!(parse_interval("10").is_err());
        assert!(parse_interval("10x").is_err());
        assert!(parse_interval("-5s").is_err());
        assert!(parse_interval("99999999999999999999999h").is_err());
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(Duration::from_secs(30)), "30s");
        assert_eq!(format_interval(Duration::from_secs(90)), "1m30s");
        assert_eq!(format_interval(Duration::from_secs(3600)), "1h");
        assert_eq!(format_interval(Duration::from_secs(5400)), "1h30m");
        assert_eq!(format_interval(Duration::from_millis(500)), "500ms");
        assert_eq!(format_interval(Duration::ZERO), "0s");
    }

    #[test]
    fn test_cli_parses_agg_interval() {
        let cli = Cli::try_parse_from(["trawl", "agg", "1m"]).unwrap();
        match cli.command {
            Command::Agg { interval } => assert_eq!(interval, Duration::from_secs(60)),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_rejects_zero_agg_interval() {
        assert!(Cli::try_parse_from(["trawl", "agg", "0s"]).is_err());
    }

    #[test]
    fn test_cli_browse_limit_defaults_to_two() {
        let cli = Cli::try_parse_from(["trawl", "browse"]).unwrap();
        match cli.command {
            Command::Browse { limit } => assert_eq!(limit, 2),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_browse_rejects_nonpositive_limit() {
        assert!(Cli::try_parse_from(["trawl", "browse", "0"]).is_err());
        assert!(Cli::try_parse_from(["trawl", "browse", "-3"]).is_err());
    }

    #[test]
    fn test_cli_addfeed_requires_name_and_url() {
        assert!(Cli::try_parse_from(["trawl", "addfeed", "Blog"]).is_err());
        let cli =
            Cli::try_parse_from(["trawl", "addfeed", "Blog", "https://example.com/rss"]).unwrap();
        match cli.command {
            Command::AddFeed { name, url } => {
                assert_eq!(name, "Blog");
                assert_eq!(url, "https://example.com/rss");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["trawl", "frobnicate"]).is_err());
    }
}
