//! Error types surfaced by channel lookups and updates

use thiserror::Error;

/// Errors that can occur when fetching or modifying a channel
///
/// A lookup that finds no matching channel is not an error; it yields `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The caller supplied nothing to send; never suppressed
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The request deadline elapsed before a response arrived
    #[error("{0}")]
    Aborted(String),

    /// The response was unusable or the transport failed
    #[error("{0}")]
    RequestFailed(String),
}

impl ChannelError {
    /// Whether the suppress-rejections option may turn this error into `None`
    pub fn is_suppressible(&self) -> bool {
        !matches!(self, ChannelError::InvalidArguments(_))
    }
}
