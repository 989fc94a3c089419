//! Command-line interface definitions.
//!
//! Global options can also come from the environment (`DATA_DIR`,
//! `BASE_URL`). Anything not given falls back to the config file, then to
//! built-in defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// # Examples
///
/// ```sh
/// # Rebuild every configured feed
/// sitefeed refresh
///
/// # Rebuild one feed after clearing cached reading times
/// sitefeed refresh --url https://claude.com/blog --force
///
/// # Print a feed
/// sitefeed feed --url https://www.seattletimes.com/sports/mariners/ --format atom
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a config.yaml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for articles.json and feeds/
    #[arg(long, env = "DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Public base URL used in feed self links
    #[arg(long, env = "BASE_URL", global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Re-scrape configured sources and repopulate both cache tiers
    Refresh {
        /// Refresh only this source
        #[arg(long)]
        url: Option<String>,

        /// Clear cached reading times first
        #[arg(long)]
        force: bool,
    },
    /// Print one feed, serving from cache when possible
    Feed {
        #[arg(long)]
        url: String,

        /// rss, atom or json; anything else means rss
        #[arg(short, long)]
        format: Option<String>,
    },
    /// Print the cache status of every source as JSON
    Status,
    /// List configured sources
    Sources,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_flags() {
        let cli = Cli::parse_from([
            "sitefeed",
            "refresh",
            "--url",
            "https://claude.com/blog",
            "--force",
        ]);
        assert_eq!(
            cli.command,
            Command::Refresh {
                url: Some("https://claude.com/blog".to_string()),
                force: true,
            }
        );
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::parse_from([
            "sitefeed",
            "feed",
            "--url",
            "https://claude.com/blog",
            "-f",
            "json",
            "--data-dir",
            "/tmp/sitefeed",
        ]);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/sitefeed")));
        assert_eq!(
            cli.command,
            Command::Feed {
                url: "https://claude.com/blog".to_string(),
                format: Some("json".to_string()),
            }
        );
    }

    #[test]
    fn test_feed_requires_url() {
        assert!(Cli::try_parse_from(["sitefeed", "feed"]).is_err());
    }
}
