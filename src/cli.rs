use clap::{Parser, Subcommand};
use jellystream::headless::HeadlessAutoplay;
use jellystream_common::{ImageType, StreamingStrategy};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "jellystream")]
#[command(author, version, about = "Media server client with adaptive playback")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Media server URL (overrides the config file)
    #[arg(long, global = true, env = "JELLYSTREAM_SERVER")]
    pub server: Option<String>,

    /// User to sign in as (overrides the config file)
    #[arg(short, long, global = true, env = "JELLYSTREAM_USERNAME")]
    pub username: Option<String>,

    /// Password for the user
    #[arg(long, global = true, env = "JELLYSTREAM_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and check that the server is reachable
    Login,

    /// List the user's libraries
    Libraries,

    /// Show libraries, recently added movies and shows
    Home,

    /// List items in a library or folder
    Items {
        /// Parent library or folder ID
        parent: String,

        /// Maximum number of items
        #[arg(short, long, default_value = "50")]
        limit: u32,

        /// Sort field, e.g. DateCreated or SortName
        #[arg(long)]
        sort_by: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show details for one item
    Show {
        /// Item ID
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print an item's image URL
    ImageUrl {
        /// Item ID
        id: String,

        /// Image type
        #[arg(long, default_value = "primary")]
        image_type: ImageType,
    },

    /// Print the stream URL for an item and strategy
    StreamUrl {
        /// Item ID
        id: String,

        /// Streaming strategy: adaptive, progressive or passthrough
        #[arg(short, long, default_value = "adaptive")]
        strategy: StreamingStrategy,
    },

    /// Start playback headlessly and follow it until it plays or gives up
    Play {
        /// Item ID
        id: String,

        /// Autoplay policy of the headless player
        #[arg(long, value_enum, default_value_t = HeadlessAutoplay::MutedOnly)]
        autoplay: HeadlessAutoplay,

        /// Play HLS without the segment engine
        #[arg(long)]
        native_hls: bool,

        /// Manual retries to issue after a terminal failure
        #[arg(long, default_value = "0")]
        manual_retries: u32,

        /// Give up after this many seconds
        #[arg(long, default_value = "120")]
        timeout_secs: u64,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },
}
