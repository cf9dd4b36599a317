//! Channel information as returned by the `/channels` endpoint

use serde::{Deserialize, Serialize};

use crate::cache::Entity;

/// A broadcaster's channel settings
///
/// Built only by decoding an API record. Once cached it is shared behind an
/// `Arc` and never mutated; a refetch replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Broadcaster user ID, the cache key
    pub broadcaster_id: String,
    /// Login name
    #[serde(default)]
    pub broadcaster_login: String,
    /// Display name
    #[serde(default)]
    pub broadcaster_name: String,
    /// ISO 639-1 language code, or "other"
    #[serde(default)]
    pub broadcaster_language: String,
    /// ID of the game or category being played
    #[serde(default)]
    pub game_id: String,
    /// Name of the game or category being played
    #[serde(default)]
    pub game_name: String,
    /// Stream title
    #[serde(default)]
    pub title: String,
    /// Stream delay in seconds
    #[serde(default)]
    pub delay: u32,
    /// Tags applied to the channel
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Entity for Channel {
    fn id(&self) -> &str {
        &self.broadcaster_id
    }
}
