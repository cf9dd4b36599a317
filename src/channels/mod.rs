//! Channels: the cached entity type, partial updates, and the manager that
//! fetches and modifies them.

mod channel;
mod manager;
mod modify;

pub use channel::Channel;
pub use manager::ChannelManager;
pub use modify::ModifyChannel;
