use clap::{Parser, Subcommand};

use rdjd::config::MAX_BATCH_CONCURRENCY;

#[derive(Parser)]
#[command(name = "rdjd")]
#[command(about = "Send anime episodes through Real-Debrid to JDownloader")]
#[command(long_about = "
rdjd finds magnet links for anime episodes, caches them on Real-Debrid, waits
for the remote download to finish, unrestricts the resulting links and hands
them to JDownloader over Click'n'Load.

Examples:
  rdjd auth set                           # Store your Real-Debrid API token
  rdjd fetch 'magnet:?xt=urn:btih:...'    # One magnet, start to finish
  rdjd season 'Sousou no Frieren' 28 --send
  rdjd batch --file magnets.txt
  rdjd scan https://nyaa.si/?q=frieren --send
")]
#[command(version)]
pub struct Cli {
    /// Override config file path
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage the Real-Debrid API token
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Add a magnet to Real-Debrid and select all files, without waiting
    #[command(visible_alias = "a")]
    Add {
        /// Magnet link
        magnet: String,
    },

    /// Process one magnet: add, wait, unrestrict and send to JDownloader
    #[command(visible_alias = "f")]
    Fetch {
        /// Magnet link
        magnet: String,

        /// Print the direct links instead of sending them
        #[arg(long)]
        no_dispatch: bool,
    },

    /// Process many magnets, collecting every direct link
    #[command(visible_alias = "b")]
    Batch {
        /// Magnet links
        magnets: Vec<String>,

        /// Read magnet links from a file, one per line
        #[arg(short, long, value_name = "FILE")]
        file: Option<String>,

        /// Print the direct links instead of sending them
        #[arg(long)]
        no_dispatch: bool,

        /// Items processed at the same time (overrides batch.max_concurrent)
        #[arg(long, value_name = "N")]
        concurrency: Option<usize>,
    },

    /// Extract magnet links from a web page
    Scan {
        /// Page URL
        url: String,

        /// Process every magnet found as a batch
        #[arg(short, long)]
        send: bool,
    },

    /// Find the top magnet for one episode
    #[command(visible_alias = "r")]
    Resolve {
        /// Series name as used by uploaders
        series: String,

        /// Episode number
        episode: u32,

        /// Season number (overrides resolver.season)
        #[arg(short, long, value_name = "N")]
        season: Option<u32>,
    },

    /// Find magnets for episodes 1..=EPISODES of a series
    Season {
        /// Series name as used by uploaders
        series: String,

        /// Number of episodes to search for
        episodes: u32,

        /// Season number (overrides resolver.season)
        #[arg(short, long, value_name = "N")]
        season: Option<u32>,

        /// Process every magnet found as a batch
        #[arg(long)]
        send: bool,
    },

    /// List torrents on the Real-Debrid account
    #[command(visible_alias = "ls")]
    List,

    /// Manage configuration
    #[command(visible_alias = "cfg")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum AuthAction {
    /// Store an API token (prompts when omitted)
    Set {
        /// API token from https://real-debrid.com/apitoken
        token: Option<String>,
    },

    /// Show whether a token is stored
    Show,

    /// Remove the stored token
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Print the config file location
    Path,

    /// Validate configuration
    #[command(visible_alias = "check")]
    Validate,

    /// Create sample configuration
    Sample,
}

impl Cli {
    /// Validate CLI arguments and show helpful error messages
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            Commands::Add { magnet } | Commands::Fetch { magnet, .. } => {
                if !magnet.trim().to_ascii_lowercase().starts_with("magnet:?") {
                    return Err("Argument must be a magnet link (magnet:?...)".to_string());
                }
            }
            Commands::Batch {
                magnets,
                file,
                concurrency,
                ..
            } => {
                if magnets.is_empty() && file.is_none() {
                    return Err("Provide magnet links or --file".to_string());
                }
                if let Some(n) = concurrency {
                    if *n == 0 || *n > MAX_BATCH_CONCURRENCY {
                        return Err(format!(
                            "Concurrency must be between 1 and {}",
                            MAX_BATCH_CONCURRENCY
                        ));
                    }
                }
            }
            Commands::Resolve {
                series, episode, ..
            } => {
                if series.trim().is_empty() {
                    return Err("Series name cannot be empty".to_string());
                }
                if *episode == 0 {
                    return Err("Episode numbers start at 1".to_string());
                }
            }
            Commands::Season {
                series, episodes, ..
            } => {
                if series.trim().is_empty() {
                    return Err("Series name cannot be empty".to_string());
                }
                if *episodes == 0 || *episodes > 500 {
                    return Err("Episode count must be between 1 and 500".to_string());
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Check if command talks to Real-Debrid
    pub fn requires_token(&self) -> bool {
        match &self.command {
            Commands::Add { .. }
            | Commands::Fetch { .. }
            | Commands::Batch { .. }
            | Commands::List => true,
            Commands::Scan { send, .. } | Commands::Season { send, .. } => *send,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    const MAGNET: &str = "magnet:?xt=urn:btih:c12fe1c06bba254a9dc9f519b335aa7c1367a88a";

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["rdjd", "list"]).unwrap();
        assert!(matches!(cli.command, Commands::List));

        let cli = Cli::try_parse_from(["rdjd", "fetch", MAGNET, "--no-dispatch"]).unwrap();
        if let Commands::Fetch {
            magnet,
            no_dispatch,
        } = cli.command
        {
            assert_eq!(magnet, MAGNET);
            assert!(no_dispatch);
        } else {
            panic!("Expected Fetch command");
        }
    }

    #[test]
    fn test_season_command_options() {
        let cli = Cli::try_parse_from([
            "rdjd",
            "season",
            "Sousou no Frieren",
            "28",
            "--season",
            "2",
            "--send",
        ])
        .unwrap();

        if let Commands::Season {
            series,
            episodes,
            season,
            send,
        } = cli.command
        {
            assert_eq!(series, "Sousou no Frieren");
            assert_eq!(episodes, 28);
            assert_eq!(season, Some(2));
            assert!(send);
        } else {
            panic!("Expected Season command");
        }
    }

    #[test]
    fn test_validation() {
        let cli = Cli::try_parse_from(["rdjd", "fetch", MAGNET]).unwrap();
        assert!(cli.validate().is_ok());

        let cli = Cli::try_parse_from(["rdjd", "fetch", "https://example.com"]).unwrap();
        assert!(cli.validate().is_err());

        let cli = Cli::try_parse_from(["rdjd", "batch"]).unwrap();
        assert!(cli.validate().is_err());

        let cli = Cli::try_parse_from(["rdjd", "batch", MAGNET, "--concurrency", "9"]).unwrap();
        assert!(cli.validate().is_err());

        let cli = Cli::try_parse_from(["rdjd", "resolve", "Show", "0"]).unwrap();
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_helper_methods() {
        let cli = Cli::try_parse_from(["rdjd", "resolve", "Show", "3"]).unwrap();
        assert!(!cli.requires_token());

        let cli = Cli::try_parse_from(["rdjd", "season", "Show", "12"]).unwrap();
        assert!(!cli.requires_token());

        let cli = Cli::try_parse_from(["rdjd", "season", "Show", "12", "--send"]).unwrap();
        assert!(cli.requires_token());

        let cli = Cli::try_parse_from(["rdjd", "add", MAGNET]).unwrap();
        assert!(cli.requires_token());
    }
}
