//! Command-line interface parsing for Helix Channels
//!
//! This module handles parsing of CLI arguments using clap: global options
//! that override the config file, and the `get` and `modify` subcommands.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::channels::ModifyChannel;
use crate::config::ClientOptions;

/// Helix Channels - look up and update channel information
#[derive(Parser, Debug)]
#[command(name = "helix-channels")]
#[command(about = "Cached channel lookups and updates for the Helix API")]
#[command(version)]
pub struct Cli {
    /// Path to a JSON config file
    #[arg(long, global = true, env = "HELIX_CHANNELS_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// OAuth access token
    #[arg(long, global = true, env = "HELIX_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Application client ID (overrides the config file)
    #[arg(long, global = true, env = "HELIX_CLIENT_ID")]
    pub client_id: Option<String>,

    /// API root (overrides the config file)
    #[arg(long, global = true, env = "HELIX_BASE_URL", value_name = "URL")]
    pub base_url: Option<String>,

    /// Return nothing instead of failing when a request fails
    #[arg(long, global = true)]
    pub suppress_rejections: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch one or more channels by broadcaster ID
    Get {
        /// Broadcaster IDs
        #[arg(required = true, value_name = "ID")]
        ids: Vec<String>,

        /// Bypass the cache
        #[arg(long)]
        force: bool,
    },
    /// Update a channel's settings
    Modify(ModifyArgs),
}

/// Fields accepted by the `modify` subcommand
#[derive(Args, Debug, Clone)]
pub struct ModifyArgs {
    /// Broadcaster ID
    #[arg(value_name = "ID")]
    pub id: String,

    /// Game or category ID
    #[arg(long)]
    pub game: Option<String>,

    /// Broadcast language (ISO 639-1)
    #[arg(long)]
    pub language: Option<String>,

    /// Stream title
    #[arg(long)]
    pub title: Option<String>,

    /// Stream delay in seconds
    #[arg(long)]
    pub delay: Option<u32>,

    /// Fetch the channel again after a successful update and print it
    #[arg(long)]
    pub refetch: bool,
}

impl ModifyArgs {
    /// The update described by the flags
    pub fn to_options(&self) -> ModifyChannel {
        ModifyChannel {
            game: self.game.clone(),
            language: self.language.clone(),
            title: self.title.clone(),
            delay: self.delay,
        }
    }
}

impl Cli {
    /// Applies command-line overrides on top of loaded options
    pub fn apply_overrides(&self, mut options: ClientOptions) -> ClientOptions {
        if let Some(client_id) = &self.client_id {
            options.client_id = client_id.clone();
        }
        if let Some(base_url) = &self.base_url {
            options.base_url = base_url.clone();
        }
        if self.suppress_rejections {
            options.suppress_rejections = true;
        }
        options
    }
}
