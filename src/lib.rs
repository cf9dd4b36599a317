//! Helix Channels Library
//!
//! Cached, deadline-bounded access to channel information on the Helix API.
//! The [`Client`] owns one [`ChannelManager`], which serves lookups from an
//! in-memory [`cache::CacheManager`] and falls back to the network through a
//! [`transport::Transport`].

pub mod auth;
pub mod cache;
pub mod channels;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod transport;

#[cfg(test)]
mod testing;

pub use channels::{Channel, ChannelManager, ModifyChannel};
pub use client::Client;
pub use config::ClientOptions;
pub use error::ChannelError;
