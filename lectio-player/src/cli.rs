use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Headless scripture audio player with verse-synchronized highlighting
#[derive(Debug, Parser)]
#[command(name = "lectio", version, about)]
pub struct Cli {
    /// Config file (defaults to ~/.config/lectio/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verse timing database (overrides content.database_path)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Play tracks from the content database in order
    Play {
        /// Track ids to queue
        #[arg(required = true)]
        tracks: Vec<String>,

        /// Simulated clock speed multiplier
        #[arg(long, default_value_t = 1)]
        speed: u32,

        /// Print every snapshot as JSON instead of logging changes
        #[arg(long)]
        json: bool,
    },
    /// Import tracks and verse timings from a JSON file
    Import {
        /// JSON file with an array of tracks
        file: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_play() {
        let cli = Cli::try_parse_from([
            "lectio", "--db", "/tmp/v.db", "play", "jhn.1", "jhn.2", "--speed", "8",
        ])
        .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/v.db")));
        match cli.command {
            Command::Play { tracks, speed, json } => {
                assert_eq!(tracks, vec!["jhn.1", "jhn.2"]);
                assert_eq!(speed, 8);
                assert!(!json);
            }
            Command::Import { .. } => unreachable!("parsed as import"),
        }
    }

    #[test]
    fn test_play_requires_tracks() {
        assert!(Cli::try_parse_from(["lectio", "play"]).is_err());
    }
}
