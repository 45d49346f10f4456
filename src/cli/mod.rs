//! Command-line interface.

use crate::parser::NumberingScheme;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Showarr - episode release resolver
/// Polls torrent feeds and sends the best release of each wanted episode to
/// the download client
#[derive(Debug, Parser)]
#[command(name = "showarr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default search paths
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Poll every source once and dispatch the winners
    Check {
        /// Only log what would be downloaded
        #[arg(long)]
        dry_run: bool,

        /// Print run statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Poll on the configured interval until interrupted
    Daemon,

    /// List configured sources
    #[command(alias = "ls")]
    Sources,

    /// Parse a release name and print what was recognised
    Parse {
        /// Release title or filename
        name: String,

        /// Numbering scheme to parse with
        #[arg(long, default_value = "scene")]
        numbering: NumberingScheme,

        /// Treat the name as a filename with an extension
        #[arg(long)]
        has_ext: bool,
    },

    /// Create a starter config file
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check_flags() {
        let cli = Cli::try_parse_from(["showarr", "check", "--dry-run", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Check {
                dry_run: true,
                json: true
            })
        ));
    }

    #[test]
    fn test_parse_command_options() {
        let cli = Cli::try_parse_from([
            "showarr",
            "parse",
            "[Group] Show - 05 [1080p].mkv",
            "--numbering",
            "absolute",
            "--has-ext",
            "--config",
            "/tmp/showarr.toml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/showarr.toml")));
        match cli.command {
            Some(Commands::Parse {
                name,
                numbering,
                has_ext,
            }) => {
                assert_eq!(name, "[Group] Show - 05 [1080p].mkv");
                assert_eq!(numbering, NumberingScheme::Absolute);
                assert!(has_ext);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_no_command() {
        let cli = Cli::try_parse_from(["showarr"]).unwrap();
        assert!(cli.command.is_none());
    }
}
