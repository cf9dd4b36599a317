//! Partial updates to a channel
//!
//! Callers name fields by their local names (`game`, `language`, ...); the
//! payload sent to the API uses the wire names (`game_id`,
//! `broadcaster_language`, ...) and carries only the fields that were set.

use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

/// Fields to change on a channel; unset fields are left alone
///
/// Deserializes from JSON, ignoring keys it does not recognise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ModifyChannel {
    /// Game or category ID
    pub game: Option<String>,
    /// ISO 639-1 language code
    pub language: Option<String>,
    /// Stream title
    pub title: Option<String>,
    /// Stream delay in seconds
    pub delay: Option<u32>,
}

/// Wire form of [`ModifyChannel`]
#[derive(Debug, Serialize)]
struct ModifyPayload<'a> {
    #[serde(rename = "game_id", skip_serializing_if = "Option::is_none")]
    game: Option<&'a str>,
    #[serde(rename = "broadcaster_language", skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    delay: Option<u32>,
}

impl ModifyChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn game(mut self, game_id: impl Into<String>) -> Self {
        self.game = Some(game_id.into());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn delay(mut self, seconds: u32) -> Self {
        self.delay = Some(seconds);
        self
    }

    /// Whether no field is set
    pub fn is_empty(&self) -> bool {
        self.game.is_none() && self.language.is_none() && self.title.is_none() && self.delay.is_none()
    }

    /// Serializes the set fields under their wire names
    ///
    /// # Returns
    /// * `Ok(String)` - JSON object containing only the supplied fields
    /// * `Err(ChannelError::InvalidArguments)` - If no field is set
    pub fn to_payload(&self) -> Result<String, ChannelError> {
        if self.is_empty() {
            return Err(ChannelError::InvalidArguments(
                "no options were provided".to_string(),
            ));
        }

        let payload = ModifyPayload {
            game: self.game.as_deref(),
            language: self.language.as_deref(),
            title: self.title.as_deref(),
            delay: self.delay,
        };
        serde_json::to_string(&payload).map_err(|e| ChannelError::InvalidArguments(e.to_string()))
    }
}
